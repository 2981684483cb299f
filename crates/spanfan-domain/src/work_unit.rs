use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// One explicitly time-bounded sub-query against the sensor hypertable.
///
/// The interval is half-open `[start_time, end_time)`. Equal bounds denote a
/// deliberately empty interval, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub sensor_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Row id of the originating period, absent for synthetic units.
    pub period_id: Option<i64>,
}

impl WorkUnit {
    pub fn new(
        sensor_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        period_id: Option<i64>,
    ) -> DomainResult<Self> {
        if start_time > end_time {
            return Err(DomainError::InvalidInterval {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            sensor_id,
            start_time,
            end_time,
            period_id,
        })
    }

    /// An interval with equal bounds matches no rows.
    pub fn is_empty(&self) -> bool {
        self.start_time == self.end_time
    }
}
