//! Measurement core: timing, deadlines, statistics and the session runner

pub mod deadline;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stats;
pub mod timer;

pub use deadline::{ArmedDeadline, Deadline};
pub use metrics::{MetricsSummary, RunMetrics};
pub use report::{JsonReporter, Reporter, SessionOutcome, SessionRecord, TextReporter};
pub use runner::{BenchmarkRunner, SizeSequence};
pub use stats::{summarize, StatsResult};
pub use timer::Timer;
