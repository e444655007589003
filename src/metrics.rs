//! Per-request timing (SPEC_FULL.md component 11 / spec §6 `metrics`).
//!
//! Adapted from the teacher's `crawl_events::metrics` atomic-snapshot idiom,
//! simplified from a global event-bus counter down to one request's
//! start/end wall-clock stamps — there is no cross-request aggregation here.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// `metrics {readableDuration, durationMs, startTimeMs, endTimeMs}` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub duration_ms: i64,
    pub readable_duration: String,
}

/// Started at the top of `process_links_request`, finished once the
/// response is assembled.
pub struct MetricsTimer {
    start_instant: Instant,
    start_time_ms: i64,
}

impl MetricsTimer {
    #[must_use]
    pub fn start() -> Self {
        Self { start_instant: Instant::now(), start_time_ms: Utc::now().timestamp_millis() }
    }

    #[must_use]
    pub fn finish(&self) -> Metrics {
        let elapsed = self.start_instant.elapsed();
        let duration_ms = elapsed.as_millis() as i64;
        Metrics {
            start_time_ms: self.start_time_ms,
            end_time_ms: self.start_time_ms + duration_ms,
            duration_ms,
            readable_duration: readable_duration(elapsed),
        }
    }
}

fn readable_duration(elapsed: std::time::Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn readable_duration_switches_units_at_one_second() {
        assert_eq!(readable_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(readable_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn finish_reports_non_negative_duration() {
        let timer = MetricsTimer::start();
        let metrics = timer.finish();
        assert!(metrics.duration_ms >= 0);
        assert!(metrics.end_time_ms >= metrics.start_time_ms);
    }
}
