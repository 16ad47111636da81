//! Benchmark cases
//!
//! A case is one graphics operation measured over a range of problem sizes.
//! The runner calls `setup` once per session (untimed) and `run` once per
//! timed iteration.

use crate::backend::{Content, Surface};
use crate::core::error::HarnessResult;

pub mod blend;
pub mod paint;
pub mod tessellate;

pub use blend::BlendCase;
pub use paint::PaintCase;
pub use tessellate::TessellateCase;

/// A measured graphics operation.
pub trait Case {
    /// Unique name used in reports and filters.
    fn name(&self) -> &str;

    /// Smallest problem size; sizes double from here.
    fn min_size(&self) -> u32;

    /// Largest problem size visited.
    fn max_size(&self) -> u32;

    /// Per-session time budget overriding the configured one.
    fn time_budget(&self) -> Option<f64> {
        None
    }

    /// Whether the operation means anything on surfaces of this content.
    fn supports(&self, _content: Content) -> bool {
        true
    }

    /// Prepare state for a session. Not timed.
    ///
    /// May return `UnsupportedCase` to decline the target.
    fn setup(&mut self, surface: &mut dyn Surface, size: u32) -> HarnessResult<()>;

    /// The measured operation.
    fn run(&mut self, surface: &mut dyn Surface);
}

/// Built-in cases in registration order.
pub fn registry() -> Vec<Box<dyn Case>> {
    vec![
        Box::new(PaintCase::new()),
        Box::new(BlendCase::new()),
        Box::new(TessellateCase::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_sizes_are_well_formed() {
        let cases = registry();
        assert_eq!(cases.len(), 3);
        for case in &cases {
            assert!(case.min_size() >= 1, "{}", case.name());
            assert!(case.min_size() <= case.max_size(), "{}", case.name());
        }
        assert_eq!(cases[0].name(), "paint");
    }
}
