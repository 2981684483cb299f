use serde::{Deserialize, Serialize};

use crate::work_unit::WorkUnit;

/// Result of one dispatched query execution.
///
/// Success and failure are distinct variants, so a failure always carries an
/// error message and a success never does. `unit` is absent for outcomes
/// aggregating a whole batch and for faults caught at the dispatcher
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success {
        unit: Option<WorkUnit>,
        row_count: u64,
        duration_ms: f64,
    },
    Failure {
        unit: Option<WorkUnit>,
        duration_ms: f64,
        error: String,
    },
}

impl Outcome {
    pub fn success(unit: Option<WorkUnit>, row_count: u64, duration_ms: f64) -> Self {
        Self::Success {
            unit,
            row_count,
            duration_ms,
        }
    }

    pub fn failure(unit: Option<WorkUnit>, duration_ms: f64, error: impl Into<String>) -> Self {
        Self::Failure {
            unit,
            duration_ms,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn unit(&self) -> Option<&WorkUnit> {
        match self {
            Self::Success { unit, .. } | Self::Failure { unit, .. } => unit.as_ref(),
        }
    }

    /// Rows returned by the query; zero for failures.
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Success { row_count, .. } => *row_count,
            Self::Failure { .. } => 0,
        }
    }

    /// Wall-clock execution time, measured from task start to completion.
    pub fn duration_ms(&self) -> f64 {
        match self {
            Self::Success { duration_ms, .. } | Self::Failure { duration_ms, .. } => *duration_ms,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}
