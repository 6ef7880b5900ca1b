//! Session configuration with documented defaults
//!
//! A `SessionConfig` is built once (defaults, TOML file, CLI overrides) and
//! handed by value to grid generation and the stepper. Nothing reads
//! configuration from process-wide state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{ConfigError, Result};

/// Smallest map side the engine accepts. One wall ring plus at least a 3x3 interior.
pub const MIN_MAP_SIDE: usize = 5;

/// How ticks are paced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// One tick per external trigger
    Manual,
    /// Timed ticks at the normal interval
    #[serde(alias = "auto-normal")]
    Auto,
    /// Timed ticks at the fast interval
    AutoFast,
}

impl PacingMode {
    pub fn is_automatic(self) -> bool {
        !matches!(self, PacingMode::Manual)
    }

    pub fn label(self) -> &'static str {
        match self {
            PacingMode::Manual => "manual",
            PacingMode::Auto => "auto",
            PacingMode::AutoFast => "auto-fast",
        }
    }
}

/// Inter-tick intervals for the two automatic tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoIntervals {
    /// Milliseconds between ticks in `Auto` mode
    pub normal_ms: u64,
    /// Milliseconds between ticks in `AutoFast` mode
    pub fast_ms: u64,
}

impl Default for AutoIntervals {
    fn default() -> Self {
        Self {
            normal_ms: 200,
            fast_ms: 50,
        }
    }
}

/// Everything the engine needs to start a session, apart from the rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    // === MAP ===
    /// Number of rows, wall border included
    pub rows: usize,

    /// Number of columns, wall border included
    pub cols: usize,

    /// Probability that an interior cell is an obstacle
    ///
    /// Obstacles never block motion; they only show up in the `floor`
    /// and forward-arc percept fields.
    pub density: f64,

    // === PACING ===
    /// Initial pacing mode; the stepper can switch modes at runtime
    pub pacing: PacingMode,

    pub auto_interval: AutoIntervals,

    // === RANDOMNESS ===
    /// Seed for map generation and agent spawning, random when absent
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows: 11,
            cols: 11,
            density: 0.3,
            pacing: PacingMode::Manual,
            auto_interval: AutoIntervals::default(),
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, ConfigError> {
        let config: SessionConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Validate configuration bounds
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.rows < MIN_MAP_SIDE || self.cols < MIN_MAP_SIDE {
            return Err(ConfigError::InvalidDimension {
                rows: self.rows,
                cols: self.cols,
                min: MIN_MAP_SIDE,
            });
        }

        if !(0.0..=1.0).contains(&self.density) {
            return Err(ConfigError::InvalidDensity(self.density));
        }

        if self.auto_interval.normal_ms == 0 {
            return Err(ConfigError::InvalidInterval { tier: "auto" });
        }
        if self.auto_interval.fast_ms == 0 {
            return Err(ConfigError::InvalidInterval { tier: "auto-fast" });
        }

        Ok(())
    }

    /// Inter-tick interval for a pacing mode, `None` for manual pacing
    pub fn interval_for(&self, mode: PacingMode) -> Option<Duration> {
        match mode {
            PacingMode::Manual => None,
            PacingMode::Auto => Some(Duration::from_millis(self.auto_interval.normal_ms)),
            PacingMode::AutoFast => Some(Duration::from_millis(self.auto_interval.fast_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rows, 11);
        assert_eq!(config.pacing, PacingMode::Manual);
    }

    #[test]
    fn test_rejects_small_map() {
        let config = SessionConfig {
            rows: 4,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimension { rows: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_density_out_of_range() {
        let config = SessionConfig {
            density: 1.5,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDensity(_))));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = SessionConfig::default();
        config.auto_interval.fast_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidInterval { tier: "auto-fast" })
        );
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
rows = 15
cols = 20
pacing = "auto-fast"
seed = 42

[auto_interval]
fast_ms = 25
"#;
        let config = SessionConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.rows, 15);
        assert_eq!(config.cols, 20);
        assert!((config.density - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.pacing, PacingMode::AutoFast);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.auto_interval.normal_ms, 200);
        assert_eq!(config.auto_interval.fast_ms, 25);
    }

    #[test]
    fn test_auto_normal_alias() {
        let config = SessionConfig::from_toml_str("pacing = \"auto-normal\"").unwrap();
        assert_eq!(config.pacing, PacingMode::Auto);
    }

    #[test]
    fn test_interval_for_modes() {
        let config = SessionConfig::default();
        assert_eq!(config.interval_for(PacingMode::Manual), None);
        assert_eq!(
            config.interval_for(PacingMode::Auto),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            config.interval_for(PacingMode::AutoFast),
            Some(Duration::from_millis(50))
        );
    }
}
