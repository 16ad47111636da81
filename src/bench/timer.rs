//! High-resolution interval timer

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::core::error::HarnessError;
use crate::platform::{ClockSource, PlatformClock};

/// Process-wide latch so a misbehaving clock is reported once, not per sample
static CLOCK_ANOMALY_REPORTED: AtomicBool = AtomicBool::new(false);

/// Start/stop timer over a [`ClockSource`].
///
/// One timer serves a whole measurement session: each `start`/`stop` pair is
/// independent and overwrites the previous readings.
#[derive(Debug)]
pub struct Timer<C: ClockSource = PlatformClock> {
    clock: C,
    start: u64,
    stop: u64,
    anomalies: u64,
}

impl Timer<PlatformClock> {
    /// Timer over the platform's highest-resolution clock.
    pub fn new() -> Self {
        Self::with_clock(PlatformClock::default())
    }
}

impl Default for Timer<PlatformClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ClockSource> Timer<C> {
    /// Timer over an explicit clock source.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            start: 0,
            stop: 0,
            anomalies: 0,
        }
    }

    #[inline]
    pub fn start(&mut self) {
        self.start = self.clock.now();
    }

    #[inline]
    pub fn stop(&mut self) {
        self.stop = self.clock.now();
    }

    /// Ticks between the last `start` and `stop`, clamped to zero if the clock
    /// went backwards.
    pub fn elapsed_ticks(&mut self) -> u64 {
        match self.stop.checked_sub(self.start) {
            Some(ticks) => ticks,
            None => {
                self.anomalies += 1;
                if !CLOCK_ANOMALY_REPORTED.swap(true, Ordering::Relaxed) {
                    warn!(
                        "{}",
                        HarnessError::ClockAnomaly {
                            start: self.start,
                            stop: self.stop,
                        }
                    );
                }
                0
            }
        }
    }

    /// Seconds between the last `start` and `stop`; never negative.
    pub fn elapsed(&mut self) -> f64 {
        self.elapsed_ticks() as f64 / self.clock.frequency() as f64
    }

    /// Number of backward clock jumps this timer has clamped.
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of readings at 1 kHz.
    struct ScriptedClock {
        readings: RefCell<VecDeque<u64>>,
    }

    impl ScriptedClock {
        fn new(readings: &[u64]) -> Self {
            Self {
                readings: RefCell::new(readings.iter().copied().collect()),
            }
        }
    }

    impl ClockSource for ScriptedClock {
        fn now(&self) -> u64 {
            self.readings.borrow_mut().pop_front().unwrap_or(0)
        }

        fn frequency(&self) -> u64 {
            1_000
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[test]
    fn test_elapsed_converts_ticks_to_seconds() {
        let mut timer = Timer::with_clock(ScriptedClock::new(&[1_000, 1_250]));
        timer.start();
        timer.stop();
        assert_eq!(timer.elapsed_ticks(), 250);
        assert!((timer.elapsed() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_backward_jump_clamps_to_zero() {
        let mut timer = Timer::with_clock(ScriptedClock::new(&[5_000, 4_000, 10, 30]));
        timer.start();
        timer.stop();
        assert_eq!(timer.elapsed(), 0.0);
        assert_eq!(timer.anomalies(), 1);

        // Next pair is independent of the anomaly.
        timer.start();
        timer.stop();
        assert!((timer.elapsed() - 0.02).abs() < 1e-12);
        assert_eq!(timer.anomalies(), 1);
    }

    #[test]
    fn test_platform_timer_is_non_negative() {
        let mut timer = Timer::new();
        for _ in 0..100 {
            timer.start();
            std::hint::black_box((0..100).sum::<u32>());
            timer.stop();
            assert!(timer.elapsed() >= 0.0);
        }
    }
}
