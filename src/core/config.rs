//! Configuration for the benchmark harness

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{HarnessError, HarnessResult};
use crate::platform::AlarmKind;

/// Largest accepted iteration cap; the sample buffer is reserved up front
pub const MAX_ITERATIONS: usize = 10_000_000;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One aligned line per session
    #[default]
    Text,
    /// Newline-delimited JSON records
    Json,
}

/// Process-wide harness configuration.
///
/// Owned by the caller and handed to the runner at construction; nothing in
/// the crate reads tunables from anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Hard cap on timed iterations per session
    pub iterations: usize,

    /// Time budget per session in seconds, unless a case overrides it
    pub time_budget_secs: f64,

    /// Untimed iterations run after setup, before the deadline is armed
    pub warmup_iterations: usize,

    /// Yield the time slice before each timed iteration
    pub yield_between_iterations: bool,

    /// Alarm backend used to deliver deadline expiry
    pub alarm: AlarmKind,

    /// Target name filters (substring match, empty = all)
    pub targets: Vec<String>,

    /// Case name filters (substring match, empty = all)
    pub cases: Vec<String>,

    /// Attach the sorted raw samples to every report record
    pub raw_samples: bool,

    /// Report output format
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            time_budget_secs: 2.0,
            warmup_iterations: 1,
            yield_between_iterations: true,
            alarm: AlarmKind::default(),
            targets: Vec::new(),
            cases: Vec::new(),
            raw_samples: false,
            format: OutputFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse config from a TOML string, filling unspecified fields with defaults
    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> HarnessResult<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Default config location: `<config dir>/surface-bench/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("surface-bench").join("config.toml"))
    }

    /// Reject values the runner cannot honour.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.iterations == 0 {
            return Err(HarnessError::Config("iterations must be at least 1".into()));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(HarnessError::Config(format!(
                "iterations must be at most {}, got {}",
                MAX_ITERATIONS, self.iterations
            )));
        }
        if !self.time_budget_secs.is_finite() || self.time_budget_secs <= 0.0 {
            return Err(HarnessError::Config(format!(
                "time_budget_secs must be a positive number, got {}",
                self.time_budget_secs
            )));
        }
        if !self.alarm.is_supported() {
            return Err(HarnessError::Config(format!(
                "alarm '{}' is not available on {}",
                self.alarm,
                crate::platform::platform_name()
            )));
        }
        Ok(())
    }

    /// Whether a target name passes the target filters
    pub fn selects_target(&self, name: &str) -> bool {
        matches_filters(&self.targets, name)
    }

    /// Whether a case name passes the case filters
    pub fn selects_case(&self, name: &str) -> bool {
        matches_filters(&self.cases, name)
    }
}

fn matches_filters(filters: &[String], name: &str) -> bool {
    filters.is_empty() || filters.iter().any(|f| name.contains(f.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarnessConfig::default();
        assert_eq!(config.iterations, 100);
        assert_eq!(config.time_budget_secs, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = HarnessConfig::from_toml("iterations = 25\nformat = \"json\"\n").unwrap();
        assert_eq!(config.iterations, 25);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.warmup_iterations, 1);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = HarnessConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::Config(_))));

        let config = HarnessConfig {
            iterations: 10_000_000_000_000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::Config(_))));

        let config = HarnessConfig {
            iterations: MAX_ITERATIONS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = HarnessConfig {
            time_budget_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(HarnessConfig::from_toml("time_budget_secs = -1.0").is_err());
    }

    #[test]
    fn test_name_filters() {
        let config = HarnessConfig {
            cases: vec!["paint".into(), "tess".into()],
            ..Default::default()
        };
        assert!(config.selects_case("paint"));
        assert!(config.selects_case("tessellate"));
        assert!(!config.selects_case("blend"));
        assert!(config.selects_target("image.a8"));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("surface-bench-{}", std::process::id()))
            .join("config.toml");
        let config = HarnessConfig {
            iterations: 7,
            raw_samples: true,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
