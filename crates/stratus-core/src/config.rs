use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the config file lives in
    pub config_dir: PathBuf,

    /// OpenWeather API key; the STRATUS_API_KEY environment variable
    /// takes precedence when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// City used when the CLI is invoked without one
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Cache behavior
    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_city() -> String {
    "London".to_string()
}

/// Cache tuning as stored in the config file.
///
/// Mirrors `stratus_weather::CacheConfig`; the CLI maps one onto the
/// other so this crate stays independent of the SDK crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Seconds an observation stays fresh (default: 600)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Locations kept before FIFO eviction (default: 10)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Refresh stale entries in the background (default: false)
    #[serde(default)]
    pub polling_enabled: bool,

    /// Seconds between background refresh cycles (default: 30)
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

fn default_ttl_seconds() -> u64 {
    600
}

fn default_history_capacity() -> usize {
    10
}

fn default_poll_interval_seconds() -> u64 {
    30
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            history_capacity: default_history_capacity(),
            polling_enabled: false,
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            api_key: None,
            default_city: default_city(),
            cache: CacheSettings::default(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratus")
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_dir())
    }

    /// Load configuration from a specific directory
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        if !config_path.exists() {
            let config = Self {
                config_dir: config_dir.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_dir = config_dir.to_path_buf();

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.resolved_api_key().is_none() {
            result.add_warning(
                "api_key",
                "No API credential configured (set api_key or STRATUS_API_KEY)",
            );
        }

        if self.default_city.trim().is_empty() {
            result.add_error("default_city", "Default city must not be empty");
        }

        if self.cache.history_capacity == 0 {
            result.add_error(
                "cache.history_capacity",
                "History capacity must be greater than 0",
            );
        }

        if self.cache.ttl_seconds == 0 {
            result.add_warning(
                "cache.ttl_seconds",
                "TTL of 0 makes every lookup refresh from the network",
            );
        } else if self.cache.ttl_seconds > 86_400 {
            result.add_warning(
                "cache.ttl_seconds",
                "TTL is more than 24 hours; entries will serve very old data",
            );
        }

        if self.cache.polling_enabled {
            if self.cache.poll_interval_seconds == 0 {
                result.add_error(
                    "cache.poll_interval_seconds",
                    "Poll interval must be greater than 0 when polling is enabled",
                );
            } else if self.cache.poll_interval_seconds < 5 {
                result.add_warning(
                    "cache.poll_interval_seconds",
                    "Poll interval under 5 seconds will hammer the upstream API",
                );
            }
        }

        result
    }

    /// The credential to use: the environment variable when set, the
    /// config file entry otherwise.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("STRATUS_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.api_key.clone())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_dir.join("config.toml");

        std::fs::create_dir_all(&self.config_dir).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(
            result.is_valid(),
            "Default config should be valid: {:?}",
            result.errors
        );
    }

    #[test]
    fn test_zero_capacity_is_an_error() {
        let mut config = Config::default();
        config.cache.history_capacity = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "cache.history_capacity"));
    }

    #[test]
    fn test_zero_poll_interval_is_an_error_only_when_polling() {
        let mut config = Config::default();
        config.cache.poll_interval_seconds = 0;
        assert!(config.validate().is_valid());

        config.cache.polling_enabled = true;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "cache.poll_interval_seconds"));
    }

    #[test]
    fn test_zero_ttl_is_a_warning() {
        let mut config = Config::default();
        config.cache.ttl_seconds = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "cache.ttl_seconds"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();

        assert!(dir.path().join("config.toml").exists());
        assert_eq!(config.default_city, "London");
        assert_eq!(config.cache.ttl_seconds, 600);
        assert_eq!(config.cache.history_capacity, 10);
    }

    #[test]
    fn test_load_from_round_trips_saved_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.default_city = "Tokyo".to_string();
        config.cache.ttl_seconds = 120;
        config.cache.polling_enabled = true;
        config.save().unwrap();

        let reloaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.default_city, "Tokyo");
        assert_eq!(reloaded.cache.ttl_seconds, 120);
        assert!(reloaded.cache.polling_enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "config_dir = \"/tmp/stratus\"\n\n[cache]\nttl_seconds = 60\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.cache.history_capacity, 10);
        assert!(!config.cache.polling_enabled);
        assert_eq!(config.default_city, "London");
        // The directory we loaded from wins over the stored path.
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
