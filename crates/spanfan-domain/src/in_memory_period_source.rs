use async_trait::async_trait;

use crate::error::DomainResult;
use crate::repository::{ListPeriodsInput, PeriodRepository};
use crate::work_unit::WorkUnit;

/// In-memory implementation of PeriodRepository holding a fixed unit list.
/// Useful for tests and dry runs against synthetic periods.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPeriodSource {
    units: Vec<WorkUnit>,
}

impl InMemoryPeriodSource {
    pub fn new(units: Vec<WorkUnit>) -> Self {
        Self { units }
    }
}

#[async_trait]
impl PeriodRepository for InMemoryPeriodSource {
    async fn list_closed_periods(&self, input: ListPeriodsInput) -> DomainResult<Vec<WorkUnit>> {
        let filtered = self
            .units
            .iter()
            .filter(|unit| input.sensor_id.is_none_or(|id| unit.sensor_id == id))
            .cloned();

        Ok(match input.limit {
            Some(limit) => filtered.take(limit.max(0) as usize).collect(),
            None => filtered.collect(),
        })
    }
}
