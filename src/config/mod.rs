//! Controller tuning and configuration file loading.
//!
//! Every constant the controllers use lives here so a deployment can
//! retune smoothing, sensitivity and reset timing without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables shared by the zoom, focus and lens controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Exponential smoothing factor for zoom, in `(0, 1]`.
    pub smoothing_factor: f64,
    /// Exponent applied to the pinch scale (lower is less sensitive).
    pub pinch_sensitivity: f64,
    /// User-facing zoom below which the back camera uses the ultra-wide lens.
    pub ultra_wide_threshold: f64,
    /// User-facing zoom per unit of ultra-wide native zoom.
    pub ultra_wide_scale: f64,
    /// Upper bound on user-facing zoom for any lens.
    pub max_user_zoom: f64,
    /// Auto-reset delay after a tap, in milliseconds.
    pub focus_reset_ms: u64,
    /// Auto-reset delay after a tap that locked white balance.
    pub locked_white_balance_reset_ms: u64,
    /// Auto-reset delay after a subject-area change.
    pub subject_area_reset_ms: u64,
    /// How long the focus indicator stays visible.
    pub focus_indicator_ms: u64,
    /// Delay before carried-over auto white balance resumes after a lens switch.
    pub white_balance_restore_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.3,
            pinch_sensitivity: 0.5,
            ultra_wide_threshold: 0.9,
            ultra_wide_scale: 0.5,
            max_user_zoom: 10.0,
            focus_reset_ms: 3000,
            locked_white_balance_reset_ms: 8000,
            subject_area_reset_ms: 2000,
            focus_indicator_ms: 1500,
            white_balance_restore_ms: 500,
        }
    }
}

impl ControllerConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing_factor));
        }
        if !(self.pinch_sensitivity > 0.0) || !self.pinch_sensitivity.is_finite() {
            return Err(ConfigError::InvalidSensitivity(self.pinch_sensitivity));
        }
        if !(self.ultra_wide_scale > 0.0 && self.ultra_wide_scale <= 1.0) {
            return Err(ConfigError::InvalidScale(self.ultra_wide_scale));
        }
        if !(self.max_user_zoom >= 1.0) {
            return Err(ConfigError::InvalidMaxZoom(self.max_user_zoom));
        }
        let delays = [
            self.focus_reset_ms,
            self.locked_white_balance_reset_ms,
            self.subject_area_reset_ms,
            self.focus_indicator_ms,
            self.white_balance_restore_ms,
        ];
        if delays.contains(&0) {
            return Err(ConfigError::ZeroDelay);
        }
        Ok(())
    }

    /// Reset delay after a tap.
    pub fn focus_reset_delay(&self, white_balance_locked: bool) -> Duration {
        if white_balance_locked {
            Duration::from_millis(self.locked_white_balance_reset_ms)
        } else {
            Duration::from_millis(self.focus_reset_ms)
        }
    }

    /// Reset delay after a subject-area change.
    pub fn subject_area_reset_delay(&self) -> Duration {
        Duration::from_millis(self.subject_area_reset_ms)
    }

    /// Focus indicator lifetime.
    pub fn focus_indicator_duration(&self) -> Duration {
        Duration::from_millis(self.focus_indicator_ms)
    }

    /// Auto white-balance resume delay after a lens switch.
    pub fn white_balance_restore_delay(&self) -> Duration {
        Duration::from_millis(self.white_balance_restore_ms)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("smoothing factor must be in (0, 1], got {0}")]
    InvalidSmoothing(f64),
    #[error("pinch sensitivity must be positive, got {0}")]
    InvalidSensitivity(f64),
    #[error("ultra-wide scale must be in (0, 1], got {0}")]
    InvalidScale(f64),
    #[error("max user zoom must be at least 1.0, got {0}")]
    InvalidMaxZoom(f64),
    #[error("timer delays must be non-zero")]
    ZeroDelay,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.controller.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_smoothing_out_of_range() {
        let config = ControllerConfig {
            smoothing_factor: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSmoothing(_))
        ));
    }

    #[test]
    fn test_zero_delay_rejected() {
        let config = ControllerConfig {
            focus_indicator_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDelay)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FileConfig::from_toml("[controller]\nsmoothing_factor = 0.5\n").unwrap();
        assert_eq!(config.controller.smoothing_factor, 0.5);
        assert_eq!(config.controller.focus_reset_ms, 3000);
    }

    #[test]
    fn test_reset_delays() {
        let config = ControllerConfig::default();
        assert_eq!(config.focus_reset_delay(false), Duration::from_secs(3));
        assert_eq!(config.focus_reset_delay(true), Duration::from_secs(8));
        assert_eq!(config.subject_area_reset_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            FileConfig::from_toml("controller = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
