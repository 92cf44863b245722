use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

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
    /// Application data directory (storage database lives here)
    pub data_dir: PathBuf,

    /// Upstream API endpoints
    #[serde(default)]
    pub api: ApiConfig,

    /// Search behavior
    #[serde(default)]
    pub search: SearchConfig,

    /// Cache and history retention
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Geocoding endpoint (city name -> coordinates)
    pub geocoding_url: String,

    /// Forecast endpoint (coordinates -> current conditions + daily forecast)
    pub forecast_url: String,

    /// Language hint sent with geocoding requests
    pub language: String,

    /// ISO country code whose matches float to the top of suggestions
    pub home_country: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            language: "pt".to_string(),
            home_country: "BR".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before an autocomplete keystroke triggers a request
    pub debounce_ms: u64,

    /// Minimum trimmed query length for autocomplete
    pub suggest_min_chars: usize,

    /// Maximum autocomplete suggestions requested
    pub suggest_max_results: u8,

    /// Forecast days requested per search (1-16)
    pub forecast_days: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            suggest_min_chars: 2,
            suggest_max_results: 5,
            forecast_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Weather/geocode cache TTL in minutes
    pub cache_ttl_minutes: u64,

    /// Last-search expiry in hours
    pub last_search_expiry_hours: u64,

    /// Recent-city list cap
    pub recent_max_items: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: 10,
            last_search_expiry_hours: 24,
            recent_max_items: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brisa");

        Self {
            data_dir,
            api: ApiConfig::default(),
            search: SearchConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors;
    /// warnings are logged and returned alongside the config.
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
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.geocoding_url, "api.geocoding_url", &mut result);
        self.validate_url(&self.api.forecast_url, "api.forecast_url", &mut result);

        if self.api.language.is_empty() {
            result.add_error("api.language", "Language hint must not be empty");
        }

        if self.api.request_timeout_secs == 0 {
            result.add_error("api.request_timeout_secs", "Timeout must be greater than 0");
        } else if self.api.request_timeout_secs > 120 {
            result.add_warning(
                "api.request_timeout_secs",
                "Timeout is unusually long (>120s)",
            );
        }

        if self.search.forecast_days == 0 || self.search.forecast_days > 16 {
            result.add_error(
                "search.forecast_days",
                "Forecast days must be between 1 and 16",
            );
        }

        if self.search.suggest_max_results == 0 {
            result.add_error(
                "search.suggest_max_results",
                "Suggestion count must be greater than 0",
            );
        }

        if self.retention.cache_ttl_minutes == 0 {
            result.add_warning(
                "retention.cache_ttl_minutes",
                "Caching disabled (0 minutes) - every search hits the network",
            );
        }

        if self.retention.recent_max_items == 0 {
            result.add_warning(
                "retention.recent_max_items",
                "Recent-city history disabled (cap of 0)",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("brisa");

        Ok(config_dir.join("config.toml"))
    }
}
