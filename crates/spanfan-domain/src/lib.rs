pub mod error;
pub mod in_memory_period_source;
pub mod outcome;
pub mod repository;
pub mod summary;
pub mod work_unit;

pub use error::{DomainError, DomainResult};
pub use in_memory_period_source::InMemoryPeriodSource;
pub use outcome::Outcome;
pub use repository::{ListPeriodsInput, PeriodQueryExecutor, PeriodRepository};
pub use summary::DispatchSummary;
pub use work_unit::WorkUnit;
