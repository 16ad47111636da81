//! Error types shared by every harness component

use std::fmt;

// ============================================================================
// Error Types
// ============================================================================

/// Harness-wide error type.
///
/// Each variant carries its own recovery policy: the runner aborts on
/// `AllocationFailure`, skips the (target, case) pair on `UnsupportedCase`,
/// and reports a "no data" session on `InvalidInput`. `ClockAnomaly` is never
/// returned from a timer; it exists so the clamp warning renders consistently.
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// A surface or sample buffer could not be allocated
    AllocationFailure(String),
    /// The case cannot run against this target's content kind
    UnsupportedCase { case: String, target: String },
    /// Empty, degenerate, or non-finite input
    InvalidInput(String),
    /// The clock moved backwards between start and stop
    ClockAnomaly { start: u64, stop: u64 },
    /// Configuration could not be loaded or failed validation
    Config(String),
    /// Clock or alarm setup failed in the operating system
    Platform(String),
    /// Reporting or configuration I/O failed
    Io(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailure(msg) => write!(f, "Allocation failure: {}", msg),
            Self::UnsupportedCase { case, target } => {
                write!(f, "Case '{}' is not supported on target '{}'", case, target)
            }
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::ClockAnomaly { start, stop } => write!(
                f,
                "Clock anomaly: stop tick {} precedes start tick {}; elapsed clamped to zero",
                stop, start
            ),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Platform(msg) => write!(f, "Platform error: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::OutOfMemory => HarnessError::AllocationFailure(err.to_string()),
            _ => HarnessError::Io(err.to_string()),
        }
    }
}

impl From<std::collections::TryReserveError> for HarnessError {
    fn from(err: std::collections::TryReserveError) -> Self {
        HarnessError::AllocationFailure(err.to_string())
    }
}

impl HarnessError {
    /// Whether the whole run must stop rather than skip one session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AllocationFailure(_))
    }
}

/// Result type alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HarnessError::UnsupportedCase {
            case: "blend".into(),
            target: "image.a8".into(),
        };
        assert_eq!(err.to_string(), "Case 'blend' is not supported on target 'image.a8'");

        let err = HarnessError::ClockAnomaly { start: 10, stop: 4 };
        assert!(err.to_string().contains("clamped to zero"));
    }

    #[test]
    fn test_only_allocation_failure_is_fatal() {
        assert!(HarnessError::AllocationFailure("surface".into()).is_fatal());
        assert!(!HarnessError::InvalidInput("empty".into()).is_fatal());
        assert!(!HarnessError::Config("bad".into()).is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let err: HarnessError =
            std::io::Error::new(std::io::ErrorKind::OutOfMemory, "oom").into();
        assert!(err.is_fatal());

        let err: HarnessError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
