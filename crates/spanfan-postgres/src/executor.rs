use std::time::{Duration, Instant};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tracing::{error, info};

use spanfan_domain::{Outcome, PeriodQueryExecutor, WorkUnit};

use crate::client::PostgresClient;
use crate::query::{self, CLOSED_STATUS, SINGLE_PERIOD_SQL};

/// Executes bounded period queries against the pooled backend.
///
/// Pool acquisition errors, backend errors, and timeouts all become
/// `Outcome::Failure` here, never a propagated error, so one failing query
/// cannot abort a dispatch run. Timing covers pool wait and query execution
/// but not the wait for a concurrency slot.
pub struct PostgresQueryExecutor {
    client: PostgresClient,
    command_timeout: Duration,
}

impl PostgresQueryExecutor {
    pub fn new(client: PostgresClient, command_timeout: Duration) -> Self {
        Self {
            client,
            command_timeout,
        }
    }

    /// Runs one bounded query and counts the returned rows. The uniform
    /// command timeout applies to the query itself, not to pool acquisition,
    /// which blocks until a connection frees up.
    async fn fetch_row_count(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> anyhow::Result<u64> {
        let conn = self.client.get_connection().await?;
        let rows = tokio::time::timeout(self.command_timeout, conn.query(sql, params))
            .await
            .map_err(|_| anyhow!("query timed out after {:?}", self.command_timeout))??;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl PeriodQueryExecutor for PostgresQueryExecutor {
    async fn run_period_query(&self, unit: &WorkUnit) -> Outcome {
        let started = Instant::now();
        let params: [&(dyn ToSql + Sync); 4] = [
            &unit.sensor_id,
            &unit.start_time,
            &unit.end_time,
            &CLOSED_STATUS,
        ];

        match self.fetch_row_count(SINGLE_PERIOD_SQL, &params).await {
            Ok(row_count) => Outcome::success(Some(unit.clone()), row_count, elapsed_ms(started)),
            Err(e) => {
                error!(
                    sensor_id = unit.sensor_id,
                    period_id = ?unit.period_id,
                    "period query failed: {e:#}"
                );
                Outcome::failure(Some(unit.clone()), elapsed_ms(started), format!("{e:#}"))
            }
        }
    }

    async fn run_batch_query(&self, units: &[WorkUnit]) -> Outcome {
        let Some((min_start, max_end)) = query::group_time_bounds(units) else {
            return Outcome::success(None, 0, 0.0);
        };

        let started = Instant::now();
        let sql = query::batch_period_sql(units.len());

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(units.len() * 3 + 3);
        for unit in units {
            params.push(&unit.sensor_id);
            params.push(&unit.start_time);
            params.push(&unit.end_time);
        }
        params.push(&min_start);
        params.push(&max_end);
        params.push(&CLOSED_STATUS);

        match self.fetch_row_count(&sql, &params).await {
            Ok(row_count) => {
                info!(
                    batch_len = units.len(),
                    row_count,
                    "batch query completed"
                );
                Outcome::success(None, row_count, elapsed_ms(started))
            }
            Err(e) => {
                error!(batch_len = units.len(), "batch query failed: {e:#}");
                Outcome::failure(None, elapsed_ms(started), format!("{e:#}"))
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
