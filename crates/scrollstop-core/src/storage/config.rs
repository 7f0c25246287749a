//! TOML-based application configuration.
//!
//! Stores the tunable thresholds:
//! - Scroll/swipe detection limits
//! - News time budget and block length
//! - Grayscale penalty threshold and filter duration
//! - Tracker pointer-intent thresholds
//! - Reminder cadence
//!
//! Block durations per site category are fixed by `Category` and are
//! deliberately not configurable here.
//!
//! Configuration is stored at `~/.config/scrollstop/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

use super::data_dir;

/// Doomscroll detector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Cumulative downward scroll (px) before detection fires.
    #[serde(default = "default_scroll_limit_px")]
    pub scroll_limit_px: f64,
    /// Swipe/navigation count before detection fires.
    #[serde(default = "default_swipe_limit")]
    pub swipe_limit: u32,
}

/// News time accumulator thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Daily news budget (minutes) before all news sites get blocked.
    #[serde(default = "default_news_limit_min")]
    pub daily_limit_min: u64,
    /// Length of the news block once the budget is spent (minutes).
    #[serde(default = "default_news_block_min")]
    pub block_duration_min: u64,
}

/// Grayscale penalty thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrayscaleConfig {
    /// Daily tracked time (minutes) before the filter activates.
    #[serde(default = "default_grayscale_threshold_min")]
    pub threshold_min: u64,
    /// How long the filter stays on once activated (minutes).
    #[serde(default = "default_grayscale_duration_min")]
    pub filter_duration_min: u64,
}

/// Elapsed-time tracker pointer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Pointer movement beyond this is a drag, not a tap (px).
    #[serde(default = "default_drag_threshold_px")]
    pub drag_threshold_px: f64,
    /// A press-and-release within this window counts as a tap (ms).
    #[serde(default = "default_tap_max_ms")]
    pub tap_max_ms: u64,
}

/// Periodic reminder cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minutes between nudges while a tracked page stays open.
    #[serde(default = "default_reminder_interval_min")]
    pub interval_min: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/scrollstop/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub grayscale: GrayscaleConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
}

// Default functions
fn default_scroll_limit_px() -> f64 {
    4000.0
}
fn default_swipe_limit() -> u32 {
    15
}
fn default_news_limit_min() -> u64 {
    20
}
fn default_news_block_min() -> u64 {
    60
}
fn default_grayscale_threshold_min() -> u64 {
    5
}
fn default_grayscale_duration_min() -> u64 {
    60
}
fn default_drag_threshold_px() -> f64 {
    5.0
}
fn default_tap_max_ms() -> u64 {
    300
}
fn default_reminder_interval_min() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scroll_limit_px: default_scroll_limit_px(),
            swipe_limit: default_swipe_limit(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            daily_limit_min: default_news_limit_min(),
            block_duration_min: default_news_block_min(),
        }
    }
}

impl Default for GrayscaleConfig {
    fn default() -> Self {
        Self {
            threshold_min: default_grayscale_threshold_min(),
            filter_duration_min: default_grayscale_duration_min(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: default_drag_threshold_px(),
            tap_max_ms: default_tap_max_ms(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_min: default_reminder_interval_min(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            news: NewsConfig::default(),
            grayscale: GrayscaleConfig::default(),
            tracker: TrackerConfig::default(),
            reminder: ReminderConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(String::new()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/scrollstop"),
                message: e.to_string(),
            })?
            .join("config.toml"))
    }

    /// Load from disk, writing the default config on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Returns error if the key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
