//! Session deadline
//!
//! A [`Deadline`] bounds how long a measurement loop may keep collecting
//! samples. Expiry is delivered out of band by an [`Alarm`] backend, so it
//! fires even when the measured operation is CPU-bound and never returns to
//! the harness mid-call. The loop polls [`ArmedDeadline::expired`]; nothing
//! ever blocks on it.

use std::time::Duration;

use crate::core::error::{HarnessError, HarnessResult};
use crate::platform::{self, Alarm, AlarmKind};

/// Reusable one-shot deadline.
pub struct Deadline {
    alarm: Box<dyn Alarm>,
}

impl Deadline {
    /// Deadline over the requested alarm backend.
    pub fn new(kind: AlarmKind) -> HarnessResult<Self> {
        Ok(Self::with_alarm(kind.create()?))
    }

    /// Deadline over an explicit alarm backend.
    pub fn with_alarm(alarm: Box<dyn Alarm>) -> Self {
        Self { alarm }
    }

    /// Schedule expiry `seconds` from now, clearing any previous expiry.
    ///
    /// The returned guard cancels the pending alarm when dropped, so a
    /// session that ends early cannot leave an alarm running into the next.
    pub fn arm(&mut self, seconds: f64) -> HarnessResult<ArmedDeadline<'_>> {
        let after = Duration::try_from_secs_f64(seconds).map_err(|_| {
            HarnessError::InvalidInput(format!(
                "deadline must be a non-negative number of seconds, got {}",
                seconds
            ))
        })?;

        self.alarm.arm(after)?;
        Ok(ArmedDeadline { deadline: self })
    }

    /// Whether the most recent arming has expired. Stays true until re-armed.
    #[inline]
    pub fn expired(&self) -> bool {
        self.alarm.expired()
    }

    /// Cooperative hint that this thread has nothing useful to do until the
    /// next scheduler tick.
    #[inline]
    pub fn yield_now(&self) {
        platform::yield_now();
    }

    /// Alarm backend name.
    pub fn backend(&self) -> &'static str {
        self.alarm.name()
    }
}

/// An armed deadline; disarms on drop.
pub struct ArmedDeadline<'a> {
    deadline: &'a mut Deadline,
}

impl ArmedDeadline<'_> {
    #[inline]
    pub fn expired(&self) -> bool {
        self.deadline.expired()
    }

    #[inline]
    pub fn yield_now(&self) {
        self.deadline.yield_now();
    }
}

impl Drop for ArmedDeadline<'_> {
    fn drop(&mut self) {
        self.deadline.alarm.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    /// The POSIX interval timer is process-wide; interval tests take turns.
    static INTERVAL_LOCK: Mutex<()> = Mutex::new(());

    fn spin_until_expired(armed: &ArmedDeadline<'_>, limit: Duration) -> Option<Duration> {
        let start = Instant::now();
        while !armed.expired() {
            if start.elapsed() > limit {
                return None;
            }
        }
        Some(start.elapsed())
    }

    fn check_expiry_window(kind: AlarmKind) {
        let mut deadline = Deadline::new(kind).unwrap();

        {
            let armed = deadline.arm(0.1).unwrap();
            assert!(!armed.expired());
            let waited = spin_until_expired(&armed, Duration::from_secs(5))
                .expect("deadline never expired");
            assert!(waited >= Duration::from_millis(90));
        }

        // Still expired after the guard disarmed, until the next arm.
        std::thread::sleep(Duration::from_millis(20));
        assert!(deadline.expired());

        let armed = deadline.arm(30.0).unwrap();
        assert!(!armed.expired());
    }

    #[test]
    fn test_sleep_deadline_expiry_window() {
        check_expiry_window(AlarmKind::Sleep);
    }

    #[cfg(unix)]
    #[test]
    fn test_interval_deadline_expiry_window() {
        let _guard = INTERVAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        check_expiry_window(AlarmKind::Interval);
    }

    #[cfg(unix)]
    #[test]
    fn test_interval_deadline_fires_during_cpu_bound_work() {
        let _guard = INTERVAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut deadline = Deadline::new(AlarmKind::Interval).unwrap();
        let armed = deadline.arm(0.05).unwrap();

        // Never calls back into the harness; only the signal can end the wait.
        let mut acc = 0u64;
        let start = Instant::now();
        while !armed.expired() && start.elapsed() < Duration::from_secs(5) {
            acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(7));
        }
        assert!(armed.expired());
    }

    #[cfg(unix)]
    #[test]
    fn test_only_one_interval_deadline_at_a_time() {
        let _guard = INTERVAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let first = Deadline::new(AlarmKind::Interval).unwrap();
        assert!(matches!(
            Deadline::new(AlarmKind::Interval),
            Err(HarnessError::Platform(_))
        ));
        drop(first);
        assert!(Deadline::new(AlarmKind::Interval).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_interval_rearm_never_inherits_previous_expiry() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        fn busy_wait(d: Duration) {
            let until = Instant::now() + d;
            while Instant::now() < until {
                std::hint::spin_loop();
            }
        }

        let _guard = INTERVAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        // Busy threads give the kernel somewhere else to deliver SIGALRM.
        let stop = Arc::new(AtomicBool::new(false));
        let spinners: Vec<_> = (0..4)
            .map(|_| {
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        std::hint::spin_loop();
                    }
                })
            })
            .collect();

        let mut deadline = Deadline::new(AlarmKind::Interval).unwrap();
        let mut stale = 0;
        for _ in 0..10_000 {
            {
                let _short = deadline.arm(1e-6).unwrap();
                busy_wait(Duration::from_micros(3));
            }
            let armed = deadline.arm(30.0).unwrap();
            busy_wait(Duration::from_micros(50));
            if armed.expired() {
                stale += 1;
            }
        }

        stop.store(true, Ordering::Relaxed);
        for spinner in spinners {
            spinner.join().unwrap();
        }
        assert_eq!(stale, 0, "fresh 30s deadlines read as expired");
    }

    #[cfg(unix)]
    #[test]
    fn test_interval_rejects_unrepresentable_budget() {
        let _guard = INTERVAL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut deadline = Deadline::new(AlarmKind::Interval).unwrap();
        assert!(matches!(deadline.arm(1e19), Err(HarnessError::InvalidInput(_))));
        assert!(!deadline.expired());
    }

    #[test]
    fn test_dropping_guard_cancels_pending_alarm() {
        let mut deadline = Deadline::new(AlarmKind::Sleep).unwrap();
        drop(deadline.arm(0.01).unwrap());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!deadline.expired());
    }

    #[test]
    fn test_zero_budget_expires_immediately() {
        let mut deadline = Deadline::new(AlarmKind::Sleep).unwrap();
        let armed = deadline.arm(0.0).unwrap();
        assert!(armed.expired());
    }

    #[test]
    fn test_rejects_invalid_budget() {
        let mut deadline = Deadline::new(AlarmKind::Sleep).unwrap();
        assert!(matches!(deadline.arm(-1.0), Err(HarnessError::InvalidInput(_))));
        assert!(deadline.arm(f64::INFINITY).is_err());
    }
}
