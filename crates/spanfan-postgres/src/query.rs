//! Query builders for the sensor-data / active-periods join.
//!
//! Every generated query carries explicit time bounds on the fact table so
//! the planner can exclude chunks outside the requested interval. Only
//! placeholder numbers are ever interpolated into query text; all values are
//! bound parameters.

use chrono::{DateTime, Utc};
use spanfan_domain::WorkUnit;

/// Status value marking fully materialized periods; only these are eligible
/// for dispatch.
pub const CLOSED_STATUS: &str = "DONE";

/// Join restricted to one sensor and one half-open interval.
///
/// Parameters: `$1` sensor id, `$2` interval start, `$3` interval end,
/// `$4` period status.
pub const SINGLE_PERIOD_SQL: &str = "\
SELECT
    s.sensor_id,
    s.measurement_time,
    s.measurement_value,
    p.start_time,
    p.end_time
FROM bench.sensor_data s
JOIN bench.active_periods p
  ON s.sensor_id = p.sensor_id
 AND s.measurement_time >= p.start_time
 AND s.measurement_time < p.end_time
WHERE s.sensor_id = $1
  AND s.measurement_time >= $2
  AND s.measurement_time < $3
  AND p.status = $4";

/// Builds the batched-disjunctive query for `unit_count` work units.
///
/// The WHERE clause is one parenthesized disjunct per unit (sensor id plus
/// that unit's own interval, parameters `$1..$3N`), followed by a redundant
/// group-wide time bound (`$3N+1`, `$3N+2`) and the status filter
/// (`$3N+3`). The group bound never changes the result set; it exists so
/// the planner can exclude chunks outside the batch's overall span.
pub fn batch_period_sql(unit_count: usize) -> String {
    debug_assert!(unit_count > 0, "batched query needs at least one unit");
    let mut clauses = Vec::with_capacity(unit_count);
    let mut n = 0;
    for _ in 0..unit_count {
        clauses.push(format!(
            "(s.sensor_id = ${} AND s.measurement_time >= ${} AND s.measurement_time < ${})",
            n + 1,
            n + 2,
            n + 3
        ));
        n += 3;
    }

    format!(
        "\
SELECT
    s.sensor_id,
    s.measurement_time,
    s.measurement_value,
    p.start_time,
    p.end_time
FROM bench.sensor_data s
JOIN bench.active_periods p
  ON s.sensor_id = p.sensor_id
 AND s.measurement_time >= p.start_time
 AND s.measurement_time < p.end_time
WHERE ({disjunction})
  AND s.measurement_time >= ${lower}
  AND s.measurement_time < ${upper}
  AND p.status = ${status}",
        disjunction = clauses.join(" OR "),
        lower = n + 1,
        upper = n + 2,
        status = n + 3,
    )
}

/// Group-wide `[min(starts), max(ends))` bound across a batch.
///
/// Returns `None` for an empty batch. The bound is weaker than or equal to
/// the union of the per-unit intervals, so adding it to the batched query
/// cannot drop rows.
pub fn group_time_bounds(units: &[WorkUnit]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = units.first()?;
    let mut min_start = first.start_time;
    let mut max_end = first.end_time;
    for unit in units {
        min_start = min_start.min(unit.start_time);
        max_end = max_end.max(unit.end_time);
    }
    Some((min_start, max_end))
}
