//! Platform Abstraction Traits for Timing
//!
//! Every platform provides two capabilities to the harness: a monotonic tick
//! source and a one-shot alarm. Call sites only ever see these traits; the
//! concrete backend is picked through the type aliases and [`AlarmKind`]
//! in the parent module.
//!
//! ```text
//! +---------------------------+
//! | ClockSource    Alarm      |  <- This module (defines interfaces)
//! +---------------------------+
//!          |           |
//!    +-----+-----+     +------+------+
//!    |           |     |             |
//! +--v--+     +--v--+ +v-------+ +---v---+
//! |POSIX|     | Win | |Interval| | Sleep |
//! +-----+     +-----+ +--------+ +-------+
//! ```
//!
//! [`AlarmKind`]: super::AlarmKind

use std::time::Duration;

use crate::core::error::HarnessResult;

/// A monotonic, high-resolution tick source.
pub trait ClockSource {
    /// Current tick count. Only differences between two readings are meaningful.
    fn now(&self) -> u64;

    /// Ticks per second.
    fn frequency(&self) -> u64;

    /// Short human-readable backend name.
    fn name(&self) -> &'static str;
}

/// A one-shot expiry flag driven by an out-of-band timing mechanism.
///
/// The flag must be set without the measured code ever calling back into the
/// alarm, and setting it must be a single atomic store or compare-and-swap.
pub trait Alarm: Send {
    /// Cancel any pending expiry, clear the flag, and schedule a new expiry.
    ///
    /// A zero duration expires immediately.
    fn arm(&mut self, after: Duration) -> HarnessResult<()>;

    /// Cancel a pending expiry. The flag keeps its current value.
    fn cancel(&mut self);

    /// Non-blocking read of the expiry flag.
    fn expired(&self) -> bool;

    /// Short human-readable backend name.
    fn name(&self) -> &'static str;
}
