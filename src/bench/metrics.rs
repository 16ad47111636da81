//! Run-level metrics tracking

use serde::Serialize;
use std::time::Instant;

use crate::bench::report::{SessionOutcome, SessionRecord};

/// Counters accumulated over one run of the runner.
#[derive(Debug)]
pub struct RunMetrics {
    start_time: Instant,
    measured: usize,
    no_data: usize,
    skipped: usize,
    abandoned: usize,
    total_samples: usize,
    kept_samples: usize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            measured: 0,
            no_data: 0,
            skipped: 0,
            abandoned: 0,
            total_samples: 0,
            kept_samples: 0,
        }
    }

    pub fn record_session(&mut self, record: &SessionRecord) {
        self.total_samples += record.raw_count;
        match &record.outcome {
            SessionOutcome::Measured { stats } => {
                self.measured += 1;
                self.kept_samples += stats.iterations;
            }
            SessionOutcome::NoData { .. } => self.no_data += 1,
        }
    }

    /// A (target, case) pair declined by the case.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// A session given up after a non-fatal error.
    pub fn record_abandoned(&mut self) {
        self.abandoned += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            sessions_measured: self.measured,
            sessions_no_data: self.no_data,
            pairs_skipped: self.skipped,
            sessions_abandoned: self.abandoned,
            total_samples: self.total_samples,
            kept_samples: self.kept_samples,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub sessions_measured: usize,
    pub sessions_no_data: usize,
    pub pairs_skipped: usize,
    pub sessions_abandoned: usize,
    pub total_samples: usize,
    pub kept_samples: usize,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Content;
    use crate::bench::stats::StatsResult;

    fn record(outcome: SessionOutcome, raw_count: usize) -> SessionRecord {
        SessionRecord {
            target: "image.argb".into(),
            content: Content::ColorAlpha,
            case: "paint".into(),
            size: 32,
            raw_count,
            outcome,
            samples: None,
        }
    }

    #[test]
    fn test_counts_by_outcome() {
        let mut metrics = RunMetrics::new();
        metrics.record_session(&record(
            SessionOutcome::Measured {
                stats: StatsResult {
                    iterations: 9,
                    min: 1.0,
                    median: 1.0,
                    std_dev: 0.0,
                },
            },
            10,
        ));
        metrics.record_session(&record(
            SessionOutcome::NoData {
                reason: "zero mean".into(),
            },
            4,
        ));
        metrics.record_skip();

        let summary = metrics.summary();
        assert_eq!(summary.sessions_measured, 1);
        assert_eq!(summary.sessions_no_data, 1);
        assert_eq!(summary.pairs_skipped, 1);
        assert_eq!(summary.total_samples, 14);
        assert_eq!(summary.kept_samples, 9);
        assert!(summary.elapsed_secs >= 0.0);
    }
}
