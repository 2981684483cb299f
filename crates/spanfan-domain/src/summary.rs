use std::fmt;

use serde::Serialize;

use crate::outcome::Outcome;

/// Summary statistics over one dispatch run.
///
/// Row and duration totals cover successful outcomes only; all duration
/// statistics are zero when no outcome succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_rows: u64,
    pub total_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
}

impl DispatchSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let total = outcomes.len();
        let successes: Vec<&Outcome> = outcomes.iter().filter(|o| o.is_success()).collect();

        let total_rows = successes.iter().map(|o| o.row_count()).sum();
        let total_duration_ms: f64 = successes.iter().map(|o| o.duration_ms()).sum();

        let (avg, min, max) = if successes.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let durations = successes.iter().map(|o| o.duration_ms());
            (
                total_duration_ms / successes.len() as f64,
                durations.clone().fold(f64::INFINITY, f64::min),
                durations.fold(f64::NEG_INFINITY, f64::max),
            )
        };

        Self {
            total,
            successful: successes.len(),
            failed: total - successes.len(),
            total_rows,
            total_duration_ms,
            avg_duration_ms: avg,
            min_duration_ms: min,
            max_duration_ms: max,
        }
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ruler = "=".repeat(70);
        writeln!(f, "{ruler}")?;
        writeln!(f, "QUERY EXECUTION SUMMARY")?;
        writeln!(f, "{ruler}")?;
        writeln!(f, "Total queries:        {}", self.total)?;
        writeln!(f, "Successful:           {}", self.successful)?;
        writeln!(f, "Failed:               {}", self.failed)?;
        writeln!(f, "Total rows retrieved: {}", self.total_rows)?;
        writeln!(f, "Total duration:       {:.2}s", self.total_duration_ms / 1000.0)?;
        writeln!(f, "Average per query:    {:.2}ms", self.avg_duration_ms)?;
        if self.successful > 0 {
            writeln!(f, "Min query time:       {:.2}ms", self.min_duration_ms)?;
            writeln!(f, "Max query time:       {:.2}ms", self.max_duration_ms)?;
        }
        write!(f, "{ruler}")
    }
}
