//! Platform Abstraction Layer for timing
//!
//! This module selects the clock and alarm backends for the target platform
//! so that the timer, deadline, and runner never carry `cfg` attributes.
//!
//! # Architecture
//!
//! ```text
//! src/platform/
//! +-- mod.rs           <- This file (aliases, alarm selection, host info)
//! +-- traits.rs        <- ClockSource and Alarm interfaces
//! +-- posix.rs         <- clock_gettime + setitimer/SIGALRM (cfg(unix))
//! +-- windows.rs       <- QueryPerformanceCounter (cfg(windows))
//! +-- sleep.rs         <- Portable sleep-thread alarm
//! ```
//!
//! # Platform Support
//!
//! | Capability | POSIX | Windows |
//! |------------|-------|---------|
//! | Clock | CLOCK_MONOTONIC | QueryPerformanceCounter |
//! | Interval alarm | setitimer/SIGALRM | - |
//! | Sleep alarm | thread | thread |
//! | Yield | sched_yield | SwitchToThread |

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod sleep;
pub mod traits;

pub use sleep::SleepAlarm;
pub use traits::{Alarm, ClockSource};

use crate::core::error::HarnessResult;

// ============================================================================
// POSIX Platform Implementation
// ============================================================================

#[cfg(unix)]
pub mod posix;

/// Platform clock for POSIX systems.
#[cfg(unix)]
pub type PlatformClock = posix::MonotonicClock;

#[cfg(unix)]
pub use posix::IntervalAlarm;

// ============================================================================
// Windows Platform Implementation
// ============================================================================

#[cfg(target_os = "windows")]
pub mod windows;

/// Platform clock for Windows.
#[cfg(target_os = "windows")]
pub type PlatformClock = windows::PerformanceCounterClock;

// Compile-time error for unsupported platforms
#[cfg(not(any(unix, target_os = "windows")))]
compile_error!("surface-bench supports POSIX systems and Windows only.");

// ============================================================================
// Alarm Selection
// ============================================================================

/// Mechanism used to deliver deadline expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmKind {
    /// Process interval timer and SIGALRM (POSIX only)
    Interval,
    /// Dedicated sleeping thread (all platforms)
    Sleep,
}

impl Default for AlarmKind {
    fn default() -> Self {
        if cfg!(unix) {
            AlarmKind::Interval
        } else {
            AlarmKind::Sleep
        }
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmKind::Interval => write!(f, "interval"),
            AlarmKind::Sleep => write!(f, "sleep"),
        }
    }
}

impl AlarmKind {
    /// Whether this backend exists on the current platform.
    pub fn is_supported(&self) -> bool {
        match self {
            AlarmKind::Interval => cfg!(unix),
            AlarmKind::Sleep => true,
        }
    }

    /// Construct the backend.
    pub fn create(&self) -> HarnessResult<Box<dyn Alarm>> {
        match self {
            #[cfg(unix)]
            AlarmKind::Interval => Ok(Box::new(IntervalAlarm::new()?)),
            #[cfg(not(unix))]
            AlarmKind::Interval => Err(crate::core::error::HarnessError::Platform(
                "interval alarms require a POSIX system".into(),
            )),
            AlarmKind::Sleep => Ok(Box::new(SleepAlarm::new()?)),
        }
    }
}

/// Give up the rest of the current time slice.
#[inline]
pub fn yield_now() {
    #[cfg(unix)]
    posix::yield_now();

    #[cfg(target_os = "windows")]
    windows::yield_now();
}

// ============================================================================
// Platform Detection Utilities
// ============================================================================

/// Returns the current platform name
pub fn platform_name() -> &'static str {
    std::env::consts::OS
}

/// Description of the machine a run was taken on.
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    /// Operating system name
    pub os_name: String,
    /// Operating system version (if available)
    pub os_version: Option<String>,
    /// CPU architecture
    pub arch: &'static str,
    /// CPU brand string
    pub cpu_brand: String,
    /// Logical CPU count
    pub cpu_count: usize,
    /// Clock backend name
    pub clock: &'static str,
    /// Clock ticks per second
    pub clock_frequency: u64,
    /// Run start time (RFC 3339)
    pub started_at: String,
}

/// Detect information about the current host.
pub fn detect_host() -> HostInfo {
    use sysinfo::{CpuRefreshKind, RefreshKind, System};

    let sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
    let cpu_brand = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let clock = PlatformClock::default();

    HostInfo {
        os_name: System::name().unwrap_or_else(|| platform_name().to_string()),
        os_version: System::os_version(),
        arch: std::env::consts::ARCH,
        cpu_brand,
        cpu_count: sys.cpus().len(),
        clock: clock.name(),
        clock_frequency: clock.frequency(),
        started_at: chrono::Local::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alarm_is_supported() {
        assert!(AlarmKind::default().is_supported());
        assert!(AlarmKind::Sleep.is_supported());

        #[cfg(unix)]
        assert_eq!(AlarmKind::default(), AlarmKind::Interval);
    }

    #[test]
    fn test_alarm_kind_display() {
        assert_eq!(AlarmKind::Interval.to_string(), "interval");
        assert_eq!(AlarmKind::Sleep.to_string(), "sleep");
    }

    #[test]
    fn test_detect_host() {
        let host = detect_host();
        assert!(!host.os_name.is_empty());
        assert!(!host.arch.is_empty());
        assert!(host.clock_frequency > 0);
        assert!(!host.started_at.is_empty());
    }
}
