//! Windows timing backend
//!
//! [`PerformanceCounterClock`] reads `QueryPerformanceCounter`. The counter
//! frequency is fixed at boot, so it is queried once and cached for the
//! process lifetime rather than re-read on every measurement. Deadlines use
//! the portable [`SleepAlarm`](super::sleep::SleepAlarm).

#![cfg(target_os = "windows")]

use std::sync::OnceLock;

use windows::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};
use windows::Win32::System::Threading::SwitchToThread;

use super::traits::ClockSource;

/// Typical QPC frequency on modern Windows, used only if the query fails
const FALLBACK_FREQUENCY: u64 = 10_000_000;

/// High-resolution performance counter clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceCounterClock;

impl ClockSource for PerformanceCounterClock {
    #[inline]
    fn now(&self) -> u64 {
        let mut ticks = 0i64;
        // Cannot fail on Windows XP and later.
        let _ = unsafe { QueryPerformanceCounter(&mut ticks) };
        ticks.max(0) as u64
    }

    fn frequency(&self) -> u64 {
        cached_frequency()
    }

    fn name(&self) -> &'static str {
        "QueryPerformanceCounter"
    }
}

fn cached_frequency() -> u64 {
    static FREQUENCY: OnceLock<u64> = OnceLock::new();

    *FREQUENCY.get_or_init(|| {
        let mut frequency = 0i64;
        match unsafe { QueryPerformanceFrequency(&mut frequency) } {
            Ok(()) if frequency > 0 => frequency as u64,
            _ => {
                tracing::warn!(
                    "QueryPerformanceFrequency failed; assuming {} Hz",
                    FALLBACK_FREQUENCY
                );
                FALLBACK_FREQUENCY
            }
        }
    })
}

/// Give up the rest of the time slice.
#[inline]
pub fn yield_now() {
    let _ = unsafe { SwitchToThread() };
}
