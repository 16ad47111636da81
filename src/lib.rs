//! surface-bench
//!
//! A micro-benchmark harness for drawing back-ends. Every registered case is
//! run against every registered target over a doubling range of problem
//! sizes, and each session is reduced to a robust minimum, median and
//! relative spread.
//!
//! ## Measurement
//!
//! - **Timer**: monotonic tick source with backward-jump clamping
//! - **Deadline**: per-session time budget set by an out-of-band alarm
//! - **Statistics**: Tukey outlier rejection over the sorted samples
//! - **Runner**: untimed setup and warm-up, timed run loop, bounded by an
//!   iteration cap and the deadline
//!
//! ## Output
//!
//! Sessions stream to a [`Reporter`] as aligned text or newline-delimited
//! JSON, preceded by a host description and followed by run totals.

pub mod backend;
pub mod bench;
pub mod cases;
pub mod core;
pub mod platform;

// Re-exports
pub use backend::{Content, Surface, Target};
pub use bench::{
    summarize, BenchmarkRunner, Deadline, JsonReporter, Reporter, SessionOutcome, SessionRecord,
    StatsResult, TextReporter, Timer,
};
pub use cases::Case;
pub use self::core::{HarnessConfig, HarnessError, HarnessResult, OutputFormat};
pub use platform::{detect_host, AlarmKind, Alarm, ClockSource, HostInfo, PlatformClock};
