//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command-line overrides. Every key in the file is optional.
//!
//! ```toml
//! threshold_km = 5.0
//! concurrency = 3
//! batch_delay_ms = 2000
//! dispatch_pacing_ms = 1000
//! task_timeout_secs = 30
//!
//! [window]
//! min_lat = 0.0
//! max_lat = 10.0
//! min_lng = 99.0
//! max_lng = 120.0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spot_coords_models::BoundingWindow;

use crate::dispatcher::DispatchOptions;

/// Settings for one correction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Records further than this from their lookup result are corrected.
    pub threshold_km: f64,
    /// Lookups in flight at once; also the pipeline batch size.
    pub concurrency: usize,
    /// Sleep between pipeline batches, in milliseconds.
    pub batch_delay_ms: u64,
    /// Sleep after each dispatcher group settles, in milliseconds.
    pub dispatch_pacing_ms: u64,
    /// Hard limit for a single lookup, in seconds.
    pub task_timeout_secs: u64,
    /// Coordinates outside this window are never accepted.
    pub window: BoundingWindow,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            threshold_km: 5.0,
            concurrency: 3,
            batch_delay_ms: 2000,
            dispatch_pacing_ms: 1000,
            task_timeout_secs: 30,
            window: BoundingWindow::default(),
        }
    }
}

/// Command-line values that replace file/default values when present.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// See [`CorrectionConfig::threshold_km`].
    pub threshold_km: Option<f64>,
    /// See [`CorrectionConfig::concurrency`].
    pub concurrency: Option<usize>,
    /// See [`CorrectionConfig::batch_delay_ms`].
    pub batch_delay_ms: Option<u64>,
    /// See [`CorrectionConfig::dispatch_pacing_ms`].
    pub dispatch_pacing_ms: Option<u64>,
    /// See [`CorrectionConfig::task_timeout_secs`].
    pub task_timeout_secs: Option<u64>,
    /// See [`CorrectionConfig::window`].
    pub window: Option<BoundingWindow>,
}

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("I/O error reading config {path}: {source}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`CorrectionConfig`].
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File that was being parsed.
        path: String,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl CorrectionConfig {
    /// Reads a config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        toml::de::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Replaces every value that is set in `overrides`.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.threshold_km {
            self.threshold_km = v;
        }
        if let Some(v) = overrides.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = overrides.batch_delay_ms {
            self.batch_delay_ms = v;
        }
        if let Some(v) = overrides.dispatch_pacing_ms {
            self.dispatch_pacing_ms = v;
        }
        if let Some(v) = overrides.task_timeout_secs {
            self.task_timeout_secs = v;
        }
        if let Some(v) = overrides.window {
            self.window = v;
        }
    }

    /// Checks that the values make sense together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero concurrency or timeout, a
    /// negative or non-finite threshold, or a malformed window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1".to_string());
        }
        if self.task_timeout_secs == 0 {
            return invalid("task_timeout_secs must be at least 1".to_string());
        }
        if !self.threshold_km.is_finite() || self.threshold_km < 0.0 {
            return invalid(format!(
                "threshold_km must be a non-negative number, got {}",
                self.threshold_km
            ));
        }
        if !self.window.is_well_formed() {
            return invalid(format!("bounding window {:?} is malformed", self.window));
        }
        Ok(())
    }

    /// Delay between pipeline batches.
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Dispatcher settings derived from this config.
    #[must_use]
    pub const fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            concurrency: self.concurrency,
            pacing: Duration::from_millis(self.dispatch_pacing_ms),
            task_timeout: Duration::from_secs(self.task_timeout_secs),
        }
    }
}

/// Parses `MIN_LAT,MAX_LAT,MIN_LNG,MAX_LNG` into a [`BoundingWindow`].
///
/// # Errors
///
/// Returns a message suitable for a CLI parse error.
pub fn parse_window(s: &str) -> Result<BoundingWindow, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}' is not a number: {e}", p.trim()))
        })
        .collect::<Result<_, _>>()?;

    let [min_lat, max_lat, min_lng, max_lng] = parts[..] else {
        return Err(format!(
            "expected MIN_LAT,MAX_LAT,MIN_LNG,MAX_LNG, got {} values",
            parts.len()
        ));
    };

    Ok(BoundingWindow {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = CorrectionConfig::default();
        assert!((config.threshold_km - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.window, BoundingWindow::MALAYSIA);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: CorrectionConfig = toml::de::from_str(
            r"
            threshold_km = 1.5
            [window]
            min_lat = 1.0
            max_lat = 2.0
            min_lng = 103.0
            max_lng = 104.0
            ",
        )
        .unwrap();
        assert!((config.threshold_km - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.batch_delay_ms, 2000);
        assert_eq!(config.window.max_lng, 104.0);
    }

    #[test]
    fn overrides_replace_only_set_values() {
        let mut config = CorrectionConfig::default();
        config.apply_overrides(&ConfigOverrides {
            concurrency: Some(5),
            task_timeout_secs: Some(10),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.task_timeout_secs, 10);
        assert_eq!(config.batch_delay_ms, 2000);

        let options = config.dispatch_options();
        assert_eq!(options.concurrency, 5);
        assert_eq!(options.task_timeout, Duration::from_secs(10));
        assert_eq!(options.pacing, Duration::from_millis(1000));
    }

    #[test]
    fn rejects_zero_concurrency_and_bad_threshold() {
        let zero = CorrectionConfig {
            concurrency: 0,
            ..CorrectionConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid { .. })));

        let negative = CorrectionConfig {
            threshold_km: -1.0,
            ..CorrectionConfig::default()
        };
        assert!(matches!(negative.validate(), Err(ConfigError::Invalid { .. })));

        let nan = CorrectionConfig {
            threshold_km: f64::NAN,
            ..CorrectionConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn rejects_inverted_window() {
        let config = CorrectionConfig {
            window: BoundingWindow {
                min_lat: 5.0,
                max_lat: 1.0,
                min_lng: 99.0,
                max_lng: 120.0,
            },
            ..CorrectionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = std::env::temp_dir().join("spot_coords_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "concurrency = \"three\"\n").unwrap();

        let err = CorrectionConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn parses_window_argument() {
        let window = parse_window("0.8, 7.4, 99.6, 119.3").unwrap();
        assert_eq!(
            window,
            BoundingWindow {
                min_lat: 0.8,
                max_lat: 7.4,
                min_lng: 99.6,
                max_lng: 119.3,
            }
        );
        assert!(parse_window("1,2,3").is_err());
        assert!(parse_window("1,2,x,4").is_err());
    }
}
