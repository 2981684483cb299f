use async_trait::async_trait;

use crate::error::DomainResult;
use crate::outcome::Outcome;
use crate::work_unit::WorkUnit;

/// Filters for reading closed periods from the dimension table.
#[derive(Debug, Clone, Default)]
pub struct ListPeriodsInput {
    pub sensor_id: Option<i64>,
    pub limit: Option<i64>,
}

/// Period source trait
/// Infrastructure layer (e.g., spanfan-postgres) implements this trait
#[async_trait]
pub trait PeriodRepository: Send + Sync {
    /// List closed periods as dispatchable work units
    async fn list_closed_periods(&self, input: ListPeriodsInput) -> DomainResult<Vec<WorkUnit>>;
}

/// Executes bounded period queries against the backend.
///
/// Implementations convert every execution failure (backend error, timeout,
/// pool acquisition error) into `Outcome::Failure` at this boundary, so one
/// failing query can never abort the dispatch run.
#[async_trait]
pub trait PeriodQueryExecutor: Send + Sync {
    /// Run the per-unit query for a single work unit
    async fn run_period_query(&self, unit: &WorkUnit) -> Outcome;

    /// Run one disjunctive query covering a whole batch of work units
    async fn run_batch_query(&self, units: &[WorkUnit]) -> Outcome;
}
