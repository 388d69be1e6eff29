//! Configuration management for the `BarrierFree` planning service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings. Provider
//! credentials are mandatory: a missing key fails at load time, not on
//! the first request.

use crate::BarrierFreeError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when `generation.api_key` is not configured
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable consulted when `geodata.api_key` is not configured
pub const GOOGLE_MAPS_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Root configuration structure for the `BarrierFree` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierFreeConfig {
    /// Generative planning provider
    pub generation: GenerationConfig,
    /// Geodata (place search) provider
    pub geodata: GeodataConfig,
    /// Place resolution cache
    pub cache: CacheConfig,
    /// Refinement loop policy
    pub validation: ValidationConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Generative planning provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API key for the chat completion endpoint
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Geodata provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeodataConfig {
    /// Google Maps Platform API key
    pub api_key: Option<String>,
    /// Base URL of the Places API
    pub base_url: String,
    /// Per-attempt timeout in seconds
    pub timeout_seconds: u32,
    /// Transport-level retries for transient failures
    pub max_retries: u32,
    /// Radius of the location bias circle in meters
    pub search_radius_m: f64,
    /// Number of concurrent place lookups within one validation round
    pub max_concurrency: usize,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a resolved (or not-found) place in minutes
    pub ttl_minutes: u32,
}

/// Refinement loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Number of regeneration rounds after the initial validation
    pub max_retries: u32,
    /// Minimum self-reported accessibility score a place must carry
    pub min_place_score: u8,
    /// Treat a missing entrance flag as a failure, not only an explicit `false`
    pub require_confirmed_entrance: bool,
    /// Return the last validated plan when a refine call fails instead of erroring
    pub fallback_on_refine_error: bool,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port
    pub port: u16,
    /// Origin allowed by CORS
    pub frontend_origin: String,
    /// Upper bound for one whole itinerary build in seconds
    pub request_timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
    /// OTLP/HTTP collector endpoint, traces are exported when set
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o".to_string()
}

fn default_generation_temperature() -> f32 {
    0.5
}

fn default_generation_timeout() -> u32 {
    60
}

fn default_geodata_base_url() -> String {
    "https://places.googleapis.com/v1".to_string()
}

fn default_geodata_timeout() -> u32 {
    15
}

fn default_geodata_max_retries() -> u32 {
    2
}

fn default_search_radius() -> f64 {
    5000.0
}

fn default_max_concurrency() -> usize {
    4
}

fn default_cache_ttl() -> u32 {
    30
}

fn default_validation_max_retries() -> u32 {
    2
}

fn default_min_place_score() -> u8 {
    4
}

fn default_port() -> u16 {
    3000
}

fn default_frontend_origin() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout() -> u32 {
    180
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            temperature: default_generation_temperature(),
            timeout_seconds: default_generation_timeout(),
        }
    }
}

impl Default for GeodataConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geodata_base_url(),
            timeout_seconds: default_geodata_timeout(),
            max_retries: default_geodata_max_retries(),
            search_radius_m: default_search_radius(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_validation_max_retries(),
            min_place_score: default_min_place_score(),
            require_confirmed_entrance: false,
            fallback_on_refine_error: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            frontend_origin: default_frontend_origin(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_minutes) * 60)
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl GeodataConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.into())
    }
}

impl BarrierFreeConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. BARRIERFREE_GEODATA__MAX_CONCURRENCY=8
        builder = builder.add_source(
            Environment::with_prefix("BARRIERFREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: BarrierFreeConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_provider_env_keys();
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("barrierfree").join("config.toml"))
    }

    /// Pick up the conventional provider key variables when no key is configured
    pub fn apply_provider_env_keys(&mut self) {
        if self.generation.api_key.is_none() {
            self.generation.api_key = std::env::var(OPENAI_KEY_ENV).ok();
        }
        if self.geodata.api_key.is_none() {
            self.geodata.api_key = std::env::var(GOOGLE_MAPS_KEY_ENV).ok();
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.generation.base_url.is_empty() {
            self.generation.base_url = default_generation_base_url();
        }
        if self.generation.model.is_empty() {
            self.generation.model = default_generation_model();
        }
        if self.generation.timeout_seconds == 0 {
            self.generation.timeout_seconds = default_generation_timeout();
        }
        if self.geodata.base_url.is_empty() {
            self.geodata.base_url = default_geodata_base_url();
        }
        if self.geodata.timeout_seconds == 0 {
            self.geodata.timeout_seconds = default_geodata_timeout();
        }
        if self.geodata.max_concurrency == 0 {
            self.geodata.max_concurrency = default_max_concurrency();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate provider credentials; both are required
    pub fn validate_api_keys(&self) -> Result<()> {
        check_api_key(
            "Generation",
            self.generation.api_key.as_deref(),
            "generation.api_key",
            OPENAI_KEY_ENV,
        )?;
        check_api_key(
            "Geodata",
            self.geodata.api_key.as_deref(),
            "geodata.api_key",
            GOOGLE_MAPS_KEY_ENV,
        )?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(
                BarrierFreeError::config("Generation temperature must be between 0.0 and 2.0")
                    .into(),
            );
        }

        if self.generation.timeout_seconds > 300 || self.geodata.timeout_seconds > 300 {
            return Err(
                BarrierFreeError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.geodata.max_retries > 10 {
            return Err(BarrierFreeError::config("Geodata max retries cannot exceed 10").into());
        }

        if self.geodata.max_concurrency > 32 {
            return Err(
                BarrierFreeError::config("Geodata max concurrency cannot exceed 32").into(),
            );
        }

        if !(self.geodata.search_radius_m > 0.0 && self.geodata.search_radius_m <= 50_000.0) {
            return Err(BarrierFreeError::config(
                "Search radius must be greater than 0 and at most 50000 meters",
            )
            .into());
        }

        if self.cache.ttl_minutes > 24 * 60 {
            return Err(BarrierFreeError::config("Cache TTL cannot exceed 1440 minutes").into());
        }

        if self.validation.max_retries > 5 {
            return Err(
                BarrierFreeError::config("Validation max retries cannot exceed 5").into(),
            );
        }

        if !(1..=5).contains(&self.validation.min_place_score) {
            return Err(
                BarrierFreeError::config("Minimum place score must be between 1 and 5").into(),
            );
        }

        if self.server.request_timeout_seconds > 900 {
            return Err(
                BarrierFreeError::config("Request timeout cannot exceed 900 seconds").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(BarrierFreeError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(BarrierFreeError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Generation", &self.generation.base_url),
            ("Geodata", &self.geodata.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(BarrierFreeError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn check_api_key(provider: &str, key: Option<&str>, setting: &str, env_var: &str) -> Result<()> {
    let Some(key) = key else {
        return Err(BarrierFreeError::config(format!(
            "{provider} API key is missing. Set {setting} or the {env_var} environment variable."
        ))
        .into());
    };

    if key.trim().is_empty() {
        return Err(BarrierFreeError::config(format!(
            "{provider} API key cannot be empty. Set {setting} or {env_var}."
        ))
        .into());
    }

    if key.len() < 8 {
        return Err(BarrierFreeError::config(format!(
            "{provider} API key appears to be invalid (too short). Please check your API key."
        ))
        .into());
    }

    Ok(())
}
