//! POSIX timing backends
//!
//! - [`MonotonicClock`]: `clock_gettime(CLOCK_MONOTONIC)` in nanoseconds
//! - [`IntervalAlarm`]: one-shot `setitimer(ITIMER_REAL)` delivering `SIGALRM`
//!
//! `ITIMER_REAL` is a process-wide resource, so at most one `IntervalAlarm`
//! may exist at a time.
//!
//! `SIGALRM` is process-directed and may be handled on any thread, possibly
//! after the arming that raised it has been cancelled or replaced. The handler
//! therefore only fires the alarm when the current arming's deadline has
//! passed on the monotonic clock, and fires it with a compare-and-swap keyed
//! by the arming generation.

#![cfg(unix)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::time::{clock_gettime, ClockId};
use signal_hook::consts::SIGALRM;
use signal_hook::SigId;

use super::traits::{Alarm, ClockSource};
use crate::core::error::{HarnessError, HarnessResult};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Low bit of the alarm state; the remaining bits are the arming generation
const FIRED: u64 = 1;

/// Deadline value meaning "no arming pending"
const DISARMED: u64 = u64::MAX;

/// Upper bound on how early a genuine expiry may read on the monotonic clock
const EARLY_SLACK: Duration = Duration::from_millis(1);

/// Set while an `IntervalAlarm` owns the process interval timer
static INTERVAL_TIMER_IN_USE: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Clock
// ============================================================================

/// Monotonic nanosecond clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl ClockSource for MonotonicClock {
    #[inline]
    fn now(&self) -> u64 {
        // Cannot fail for CLOCK_MONOTONIC.
        clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map(|ts| ts.tv_sec() as u64 * NANOS_PER_SEC + ts.tv_nsec() as u64)
            .unwrap_or(0)
    }

    fn frequency(&self) -> u64 {
        NANOS_PER_SEC
    }

    fn name(&self) -> &'static str {
        "clock_gettime(CLOCK_MONOTONIC)"
    }
}

// ============================================================================
// Alarm
// ============================================================================

/// Deadline alarm backed by the process interval timer and `SIGALRM`.
///
/// The handler reads two atomics and the monotonic clock, then performs one
/// compare-and-swap. It never allocates or locks, so it is safe in
/// async-signal context.
pub struct IntervalAlarm {
    /// Arming generation, with [`FIRED`] in the low bit
    state: Arc<AtomicU64>,
    /// Monotonic nanosecond reading at which the current arming may fire
    deadline: Arc<AtomicU64>,
    generation: u64,
    sig_id: SigId,
}

impl IntervalAlarm {
    /// Claim the process interval timer and route `SIGALRM` to this alarm.
    pub fn new() -> HarnessResult<Self> {
        if INTERVAL_TIMER_IN_USE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(HarnessError::Platform(
                "the process interval timer is already owned by another deadline".into(),
            ));
        }

        let state = Arc::new(AtomicU64::new(0));
        let deadline = Arc::new(AtomicU64::new(DISARMED));

        let handler_state = Arc::clone(&state);
        let handler_deadline = Arc::clone(&deadline);
        // SAFETY: the handler only touches atomics and clock_gettime, both
        // async-signal-safe.
        let registered = unsafe {
            signal_hook::low_level::register(SIGALRM, move || {
                on_alarm(&handler_state, &handler_deadline)
            })
        };
        let sig_id = match registered {
            Ok(id) => id,
            Err(e) => {
                INTERVAL_TIMER_IN_USE.store(false, Ordering::SeqCst);
                return Err(HarnessError::Platform(format!(
                    "Failed to register SIGALRM: {}",
                    e
                )));
            }
        };

        Ok(Self {
            state,
            deadline,
            generation: 0,
            sig_id,
        })
    }
}

/// `SIGALRM` handler body.
fn on_alarm(state: &AtomicU64, deadline: &AtomicU64) {
    // State is read before the deadline; `arm` publishes them in the
    // opposite order.
    let armed = state.load(Ordering::SeqCst);
    if armed & FIRED != 0 {
        return;
    }
    if MonotonicClock.now() < deadline.load(Ordering::SeqCst) {
        return;
    }
    let _ = state.compare_exchange(armed, armed | FIRED, Ordering::SeqCst, Ordering::SeqCst);
}

impl Alarm for IntervalAlarm {
    fn arm(&mut self, after: Duration) -> HarnessResult<()> {
        let value = timer_value(after.max(Duration::from_micros(1)))?;

        self.deadline.store(DISARMED, Ordering::SeqCst);
        self.generation += 2;
        let generation = self.generation;
        self.state.store(generation, Ordering::SeqCst);
        set_interval_timer(&timer_value(Duration::ZERO)?)?;

        if after.is_zero() {
            self.state.store(generation | FIRED, Ordering::SeqCst);
            return Ok(());
        }

        // Taken before the timer starts, so a genuine expiry reads later.
        let lead = after.saturating_sub(EARLY_SLACK.min(after / 16));
        let at = u64::try_from(lead.as_nanos())
            .map(|nanos| MonotonicClock.now().saturating_add(nanos))
            .unwrap_or(DISARMED - 1);
        self.deadline.store(at, Ordering::SeqCst);

        // A zero it_value would disarm instead of firing.
        set_interval_timer(&value)
    }

    fn cancel(&mut self) {
        self.deadline.store(DISARMED, Ordering::SeqCst);
        if let Err(e) = timer_value(Duration::ZERO).and_then(|zero| set_interval_timer(&zero)) {
            tracing::warn!("Failed to cancel interval timer: {}", e);
        }
    }

    #[inline]
    fn expired(&self) -> bool {
        self.state.load(Ordering::SeqCst) & FIRED != 0
    }

    fn name(&self) -> &'static str {
        "setitimer(ITIMER_REAL)"
    }
}

impl Drop for IntervalAlarm {
    fn drop(&mut self) {
        self.cancel();
        signal_hook::low_level::unregister(self.sig_id);
        INTERVAL_TIMER_IN_USE.store(false, Ordering::SeqCst);
    }
}

/// One-shot `itimerval` for `after`; a zero duration disarms.
fn timer_value(after: Duration) -> HarnessResult<libc::itimerval> {
    let tv_sec = libc::time_t::try_from(after.as_secs()).map_err(|_| {
        HarnessError::InvalidInput(format!(
            "interval timer cannot represent {} seconds",
            after.as_secs()
        ))
    })?;

    Ok(libc::itimerval {
        it_interval: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        it_value: libc::timeval {
            tv_sec,
            tv_usec: after.subsec_micros() as libc::suseconds_t,
        },
    })
}

fn set_interval_timer(value: &libc::itimerval) -> HarnessResult<()> {
    let rc = unsafe { libc::setitimer(libc::ITIMER_REAL, value, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(HarnessError::Platform(format!(
            "setitimer failed: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

/// Give up the rest of the time slice.
#[inline]
pub fn yield_now() {
    let _ = nix::sched::sched_yield();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock;
        let mut last = clock.now();
        for _ in 0..1000 {
            let now = clock.now();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(clock.frequency(), NANOS_PER_SEC);
    }

    #[test]
    fn test_handler_ignores_signal_before_deadline() {
        let state = AtomicU64::new(4);
        let deadline = AtomicU64::new(MonotonicClock.now() + 30 * NANOS_PER_SEC);
        on_alarm(&state, &deadline);
        assert_eq!(state.load(Ordering::SeqCst), 4);

        deadline.store(DISARMED, Ordering::SeqCst);
        on_alarm(&state, &deadline);
        assert_eq!(state.load(Ordering::SeqCst), 4);

        deadline.store(0, Ordering::SeqCst);
        on_alarm(&state, &deadline);
        assert_eq!(state.load(Ordering::SeqCst), 4 | FIRED);
    }

    #[test]
    fn test_timer_value_rejects_unrepresentable_durations() {
        let value = timer_value(Duration::new(2, 500_000_000)).unwrap();
        assert_eq!(value.it_value.tv_sec, 2);
        assert_eq!(value.it_value.tv_usec, 500_000);
        assert_eq!(value.it_interval.tv_sec, 0);

        assert!(matches!(
            timer_value(Duration::from_secs(u64::MAX)),
            Err(HarnessError::InvalidInput(_))
        ));
    }
}
