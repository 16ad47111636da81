//! Benchmark runner
//!
//! Drives every selected (target, case, size) session in registration order:
//!
//! ```text
//! for target:
//!   for case:
//!     for size in min, 2*min, ... <= max:
//!       create surface -> setup -> warm up -> arm deadline
//!       loop { start; run; stop; push } until expired or cap
//!       summarize -> report -> destroy surface
//! ```
//!
//! Sessions run one at a time on the calling thread.

use tracing::{debug, info, warn};

use crate::backend::{Surface, Target};
use crate::bench::deadline::Deadline;
use crate::bench::metrics::RunMetrics;
use crate::bench::report::{Reporter, SessionOutcome, SessionRecord};
use crate::bench::stats;
use crate::bench::timer::Timer;
use crate::cases::Case;
use crate::core::config::HarnessConfig;
use crate::core::error::{HarnessError, HarnessResult};
use crate::platform::{ClockSource, PlatformClock};

/// Problem sizes from `min` to `max`, doubling each step.
#[derive(Debug, Clone)]
pub struct SizeSequence {
    next: Option<u32>,
    max: u32,
}

impl SizeSequence {
    pub fn new(min: u32, max: u32) -> HarnessResult<Self> {
        if min == 0 || min > max {
            return Err(HarnessError::InvalidInput(format!(
                "size range {}..={} must start at 1 or more and not be empty",
                min, max
            )));
        }
        Ok(Self {
            next: Some(min),
            max,
        })
    }
}

impl Iterator for SizeSequence {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let size = self.next?;
        self.next = size.checked_mul(2).filter(|&next| next <= self.max);
        Some(size)
    }
}

/// Destroys the surface through its target on every exit path.
struct SurfaceGuard<'a> {
    target: &'a dyn Target,
    surface: Box<dyn Surface>,
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        self.target.destroy_surface(self.surface.as_mut());
    }
}

/// Runs registered cases against registered targets.
pub struct BenchmarkRunner<C: ClockSource = PlatformClock> {
    config: HarnessConfig,
    targets: Vec<Box<dyn Target>>,
    cases: Vec<Box<dyn Case>>,
    deadline: Deadline,
    timer: Timer<C>,
    samples: Vec<f64>,
}

impl BenchmarkRunner<PlatformClock> {
    pub fn new(
        config: HarnessConfig,
        targets: Vec<Box<dyn Target>>,
        cases: Vec<Box<dyn Case>>,
    ) -> HarnessResult<Self> {
        Self::with_clock(config, targets, cases, PlatformClock::default())
    }
}

impl<C: ClockSource> BenchmarkRunner<C> {
    /// Runner timing with an explicit clock source.
    pub fn with_clock(
        config: HarnessConfig,
        targets: Vec<Box<dyn Target>>,
        cases: Vec<Box<dyn Case>>,
        clock: C,
    ) -> HarnessResult<Self> {
        config.validate()?;
        let deadline = Deadline::new(config.alarm)?;

        // Sized once so the timed loop never reallocates.
        let mut samples = Vec::new();
        samples.try_reserve_exact(config.iterations)?;

        Ok(Self {
            config,
            targets,
            cases,
            deadline,
            timer: Timer::with_clock(clock),
            samples,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every selected session, reporting each as it completes.
    ///
    /// Returns early only on a fatal error (`AllocationFailure`) or when the
    /// reporter fails.
    pub fn run(&mut self, reporter: &mut dyn Reporter) -> HarnessResult<RunMetrics> {
        let Self {
            config,
            targets,
            cases,
            deadline,
            timer,
            samples,
        } = self;
        let config = &*config;

        let mut metrics = RunMetrics::new();
        info!(
            "Running {} case(s) on {} target(s): cap {} iterations, {}s budget, {} alarm",
            cases.iter().filter(|c| config.selects_case(c.name())).count(),
            targets.iter().filter(|t| config.selects_target(t.name())).count(),
            config.iterations,
            config.time_budget_secs,
            deadline.backend()
        );

        for target in targets.iter().filter(|t| config.selects_target(t.name())) {
            let target = target.as_ref();

            for case in cases.iter_mut().filter(|c| config.selects_case(c.name())) {
                let case = case.as_mut();

                if !case.supports(target.content()) {
                    debug!("Skipping {} on {}: unsupported content", case.name(), target.name());
                    metrics.record_skip();
                    continue;
                }

                let sizes = match SizeSequence::new(case.min_size(), case.max_size()) {
                    Ok(sizes) => sizes,
                    Err(e) => {
                        warn!("Skipping {}: {}", case.name(), e);
                        metrics.record_skip();
                        continue;
                    }
                };

                for size in sizes {
                    let session = Session {
                        config,
                        target,
                        deadline: &mut *deadline,
                        timer: &mut *timer,
                        samples: &mut *samples,
                    };

                    match session.measure(case, size) {
                        Ok(record) => {
                            metrics.record_session(&record);
                            reporter.record(&record)?;
                        }
                        Err(HarnessError::UnsupportedCase { case, target }) => {
                            debug!("Skipping {} on {}: declined", case, target);
                            metrics.record_skip();
                            break;
                        }
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            warn!(
                                "Abandoning {} on {} at size {}: {}",
                                case.name(),
                                target.name(),
                                size,
                                e
                            );
                            metrics.record_abandoned();
                        }
                    }
                }
            }
        }

        let summary = metrics.summary();
        info!(
            "Run complete: {} measured, {} no data, {} skipped in {:.1}s",
            summary.sessions_measured,
            summary.sessions_no_data,
            summary.pairs_skipped,
            summary.elapsed_secs
        );
        Ok(metrics)
    }
}

/// Borrowed state for a single (target, case, size) measurement.
struct Session<'a, C: ClockSource> {
    config: &'a HarnessConfig,
    target: &'a dyn Target,
    deadline: &'a mut Deadline,
    timer: &'a mut Timer<C>,
    samples: &'a mut Vec<f64>,
}

impl<C: ClockSource> Session<'_, C> {
    fn measure(self, case: &mut dyn Case, size: u32) -> HarnessResult<SessionRecord> {
        let Session {
            config,
            target,
            deadline,
            timer,
            samples,
        } = self;

        let mut guard = SurfaceGuard {
            target,
            surface: target
                .create_surface(size, size)
                .map_err(|e| attribute_decline(e, &*case, target))?,
        };
        let surface = guard.surface.as_mut();

        case.setup(surface, size).map_err(|e| attribute_decline(e, &*case, target))?;

        for _ in 0..config.warmup_iterations {
            case.run(surface);
        }

        let budget = case.time_budget().unwrap_or(config.time_budget_secs);
        samples.clear();
        {
            let armed = deadline.arm(budget)?;
            while samples.len() < config.iterations {
                if config.yield_between_iterations {
                    armed.yield_now();
                }
                timer.start();
                case.run(surface);
                timer.stop();
                samples.push(timer.elapsed());

                if armed.expired() {
                    break;
                }
            }
        }

        let raw_count = samples.len();
        let outcome = match stats::summarize(samples) {
            Ok(stats) => SessionOutcome::Measured { stats },
            Err(HarnessError::InvalidInput(reason)) => {
                warn!(
                    "No data for {} on {} at size {}: {}",
                    case.name(),
                    target.name(),
                    size,
                    reason
                );
                SessionOutcome::NoData { reason }
            }
            Err(e) => return Err(e),
        };

        debug!(
            "{} {} {}: {} samples, outcome {:?}",
            target.name(),
            case.name(),
            size,
            raw_count,
            outcome
        );

        Ok(SessionRecord {
            target: target.name().to_string(),
            content: target.content(),
            case: case.name().to_string(),
            size,
            raw_count,
            outcome,
            samples: config.raw_samples.then(|| samples.clone()),
        })
    }
}

/// Name both sides of an `UnsupportedCase`, whichever side declined.
fn attribute_decline(err: HarnessError, case: &dyn Case, target: &dyn Target) -> HarnessError {
    match err {
        HarnessError::UnsupportedCase { .. } => HarnessError::UnsupportedCase {
            case: case.name().to_string(),
            target: target.name().to_string(),
        },
        other => other,
    }
}
