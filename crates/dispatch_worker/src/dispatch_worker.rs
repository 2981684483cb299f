use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use spanfan_domain::{
    DispatchSummary, DomainResult, ListPeriodsInput, Outcome, PeriodQueryExecutor,
    PeriodRepository, WorkUnit,
};

use crate::dispatcher::dispatch_bounded;

/// Strategy and resource limits for one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchWorkerConfig {
    /// Units per disjunctive batch query when batching is enabled.
    pub batch_size: usize,
    /// Selects the batched-disjunctive strategy over per-unit queries.
    pub use_batching: bool,
    /// Concurrency ceiling; sized to the connection pool capacity.
    pub max_in_flight: usize,
    /// Optional sensor filter applied when loading periods.
    pub sensor_id: Option<i64>,
    /// Optional cap on the number of periods loaded.
    pub period_limit: Option<i64>,
}

/// Outcomes and summary of one completed dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchRun {
    pub outcomes: Vec<Outcome>,
    pub summary: DispatchSummary,
}

/// Fans a list of closed periods out into time-bounded sub-queries and
/// executes them under the concurrency ceiling.
pub struct DispatchWorker {
    period_repository: Arc<dyn PeriodRepository>,
    executor: Arc<dyn PeriodQueryExecutor>,
    config: DispatchWorkerConfig,
}

impl DispatchWorker {
    pub fn new(
        period_repository: Arc<dyn PeriodRepository>,
        executor: Arc<dyn PeriodQueryExecutor>,
        config: DispatchWorkerConfig,
    ) -> Self {
        Self {
            period_repository,
            executor,
            config,
        }
    }

    /// Loads closed periods, dispatches them with the configured strategy,
    /// and summarizes the outcomes.
    ///
    /// Only the period load can fail; everything downstream absorbs its
    /// failures into the outcome list.
    pub async fn run(&self, cancel: CancellationToken) -> DomainResult<DispatchRun> {
        let units = self
            .period_repository
            .list_closed_periods(ListPeriodsInput {
                sensor_id: self.config.sensor_id,
                limit: self.config.period_limit,
            })
            .await?;

        if units.is_empty() {
            warn!("no closed periods found; nothing to dispatch");
        }

        let outcomes = self.dispatch_units(units, cancel).await;
        let summary = DispatchSummary::from_outcomes(&outcomes);

        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            total_rows = summary.total_rows,
            "dispatch run complete"
        );

        Ok(DispatchRun { outcomes, summary })
    }

    /// Dispatches the given units and returns outcomes in input order:
    /// one per unit, or one per batch when batching is enabled.
    pub async fn dispatch_units(
        &self,
        units: Vec<WorkUnit>,
        cancel: CancellationToken,
    ) -> Vec<Outcome> {
        if self.config.use_batching {
            let batch_size = self.config.batch_size.max(1);
            let batches: Vec<Vec<WorkUnit>> =
                units.chunks(batch_size).map(<[WorkUnit]>::to_vec).collect();
            info!(
                unit_count = units.len(),
                batch_count = batches.len(),
                batch_size,
                max_in_flight = self.config.max_in_flight,
                "dispatching batched disjunctive queries"
            );

            let tasks: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    let executor = Arc::clone(&self.executor);
                    async move { executor.run_batch_query(&batch).await }
                })
                .collect();
            dispatch_bounded(tasks, self.config.max_in_flight, cancel).await
        } else {
            info!(
                unit_count = units.len(),
                max_in_flight = self.config.max_in_flight,
                "dispatching per-unit queries"
            );

            let tasks: Vec<_> = units
                .into_iter()
                .map(|unit| {
                    let executor = Arc::clone(&self.executor);
                    async move { executor.run_period_query(&unit).await }
                })
                .collect();
            dispatch_bounded(tasks, self.config.max_in_flight, cancel).await
        }
    }

    pub fn summarize(outcomes: &[Outcome]) -> DispatchSummary {
        DispatchSummary::from_outcomes(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spanfan_domain::InMemoryPeriodSource;

    fn unit(sensor_id: i64, start_secs: i64, end_secs: i64) -> WorkUnit {
        use chrono::{TimeZone, Utc};
        WorkUnit::new(
            sensor_id,
            Utc.timestamp_opt(start_secs, 0).unwrap(),
            Utc.timestamp_opt(end_secs, 0).unwrap(),
            None,
        )
        .unwrap()
    }

    /// Pretends every interval second holds one row, so per-unit and batched
    /// row counts are comparable without a backend.
    struct SyntheticExecutor;

    fn synthetic_rows(unit: &WorkUnit) -> u64 {
        (unit.end_time - unit.start_time).num_seconds() as u64
    }

    #[async_trait]
    impl PeriodQueryExecutor for SyntheticExecutor {
        async fn run_period_query(&self, unit: &WorkUnit) -> Outcome {
            Outcome::success(Some(unit.clone()), synthetic_rows(unit), 1.0)
        }

        async fn run_batch_query(&self, units: &[WorkUnit]) -> Outcome {
            Outcome::success(None, units.iter().map(synthetic_rows).sum(), 1.0)
        }
    }

    /// Fails every query for one sensor, succeeds for the rest.
    struct FlakyExecutor {
        failing_sensor: i64,
    }

    #[async_trait]
    impl PeriodQueryExecutor for FlakyExecutor {
        async fn run_period_query(&self, unit: &WorkUnit) -> Outcome {
            if unit.sensor_id == self.failing_sensor {
                Outcome::failure(Some(unit.clone()), 1.0, "simulated backend error")
            } else {
                Outcome::success(Some(unit.clone()), synthetic_rows(unit), 1.0)
            }
        }

        async fn run_batch_query(&self, units: &[WorkUnit]) -> Outcome {
            Outcome::success(None, units.iter().map(synthetic_rows).sum(), 1.0)
        }
    }

    fn worker(
        units: Vec<WorkUnit>,
        executor: Arc<dyn PeriodQueryExecutor>,
        config: DispatchWorkerConfig,
    ) -> DispatchWorker {
        DispatchWorker::new(Arc::new(InMemoryPeriodSource::new(units)), executor, config)
    }

    fn config(use_batching: bool, batch_size: usize) -> DispatchWorkerConfig {
        DispatchWorkerConfig {
            batch_size,
            use_batching,
            max_in_flight: 2,
            sensor_id: None,
            period_limit: None,
        }
    }

    fn five_units() -> Vec<WorkUnit> {
        (0..5).map(|i| unit(42, i * 60, (i + 1) * 60)).collect()
    }

    #[tokio::test]
    async fn test_per_unit_dispatch_yields_one_outcome_per_unit() {
        let w = worker(five_units(), Arc::new(SyntheticExecutor), config(false, 1000));
        let run = w.run(CancellationToken::new()).await.unwrap();

        assert_eq!(run.outcomes.len(), 5);
        assert_eq!(run.summary.successful, 5);
        // Outcomes are positional: each carries its originating unit.
        for (i, outcome) in run.outcomes.iter().enumerate() {
            let unit = outcome.unit().unwrap();
            assert_eq!(unit.start_time.timestamp(), i as i64 * 60);
        }
    }

    #[tokio::test]
    async fn test_batched_dispatch_yields_one_outcome_per_batch() {
        let w = worker(five_units(), Arc::new(SyntheticExecutor), config(true, 2));
        let run = w.run(CancellationToken::new()).await.unwrap();

        // ceil(5 / 2) batches
        assert_eq!(run.outcomes.len(), 3);
        assert!(run.outcomes.iter().all(|o| o.is_success()));
        assert!(run.outcomes.iter().all(|o| o.unit().is_none()));
    }

    #[tokio::test]
    async fn test_strategies_agree_on_total_rows() {
        let units = five_units();
        let per_unit = worker(
            units.clone(),
            Arc::new(SyntheticExecutor),
            config(false, 1000),
        );
        let batched = worker(units, Arc::new(SyntheticExecutor), config(true, 2));

        let a = per_unit.run(CancellationToken::new()).await.unwrap();
        let b = batched.run(CancellationToken::new()).await.unwrap();

        assert_eq!(a.summary.total_rows, b.summary.total_rows);
        assert_eq!(a.summary.total_rows, 5 * 60);
    }

    #[tokio::test]
    async fn test_one_failing_unit_does_not_affect_siblings() {
        let units = vec![
            unit(42, 0, 60),
            unit(7, 60, 120),
            unit(42, 120, 180),
        ];
        let w = worker(
            units,
            Arc::new(FlakyExecutor { failing_sensor: 7 }),
            config(false, 1000),
        );
        let run = w.run(CancellationToken::new()).await.unwrap();

        assert_eq!(run.outcomes.len(), 3);
        assert_eq!(run.summary.successful, 2);
        assert_eq!(run.summary.failed, 1);
        assert!(!run.outcomes[1].is_success());
        assert_eq!(run.outcomes[1].unit().unwrap().sensor_id, 7);
    }

    #[tokio::test]
    async fn test_empty_period_source_yields_empty_run() {
        let w = worker(vec![], Arc::new(SyntheticExecutor), config(false, 1000));
        let run = w.run(CancellationToken::new()).await.unwrap();

        assert!(run.outcomes.is_empty());
        assert_eq!(run.summary.total, 0);
    }

    #[tokio::test]
    async fn test_sensor_filter_restricts_dispatch() {
        let units = vec![unit(1, 0, 60), unit(2, 60, 120), unit(1, 120, 180)];
        let mut cfg = config(false, 1000);
        cfg.sensor_id = Some(1);
        let w = worker(units, Arc::new(SyntheticExecutor), cfg);
        let run = w.run(CancellationToken::new()).await.unwrap();

        assert_eq!(run.outcomes.len(), 2);
    }
}
