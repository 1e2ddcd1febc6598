use serde::Deserialize;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::services::push::ReconnectPolicy;

#[cfg(test)]
mod tests;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Runtime settings for the session synchronizer
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Backend endpoints
    pub api_base_url: String,
    pub profile_path: String,
    pub push_url: String,

    // Polling
    pub poll_interval_seconds: f64,
    pub http_timeout_seconds: f64,

    // Push channel reconnection
    pub reconnect_initial_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub reconnect_max_attempts: u32,

    // Forced logout
    pub deactivation_grace_seconds: f64,
    pub login_path: String,

    // Logging
    pub log_level: String,
    pub log_format: String,
}

impl Settings {
    /// Create new settings instance from environment variables and .env file
    pub fn new() -> Result<Self, ConfigError> {
        Self::new_with_env_file(true)
    }

    /// Create new settings instance with optional .env file loading
    pub fn new_with_env_file(load_env_file: bool) -> Result<Self, ConfigError> {
        // Tests mutate process env; serialize reads
        static SETTINGS_BUILD_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        let build_mutex = SETTINGS_BUILD_MUTEX.get_or_init(|| Mutex::new(()));
        let _guard = build_mutex
            .lock()
            .map_err(|_| ConfigError::Parse("settings build mutex poisoned".to_string()))?;

        if load_env_file {
            dotenvy::dotenv().ok();
        }

        let mut builder = config::Config::builder()
            // Endpoint defaults
            .set_default("api_base_url", "http://localhost:4000/api")?
            .set_default("profile_path", "/auth/profile")?
            .set_default("push_url", "ws://localhost:4000/ws")?
            // Polling defaults
            .set_default("poll_interval_seconds", 30.0)?
            .set_default("http_timeout_seconds", 10.0)?
            // Reconnection defaults
            .set_default("reconnect_initial_delay_ms", 1000u64)?
            .set_default("reconnect_max_delay_ms", 5000u64)?
            .set_default("reconnect_max_attempts", 5u32)?
            // Forced logout defaults
            .set_default("deactivation_grace_seconds", 3.0)?
            .set_default("login_path", "/login")?
            // Logging defaults
            .set_default("log_level", "INFO")?
            .set_default("log_format", "json")?;

        if let Ok(path) = std::env::var("GYM_SYNC_CONFIG") {
            builder = builder.add_source(
                config::File::new(&path, config::FileFormat::Toml).required(true),
            );
        }

        fn read_env(key: &str) -> Option<String> {
            std::env::var(key).ok()
        }

        // String overrides (UPPERCASE only)
        if let Some(v) = read_env("API_BASE_URL") { builder = builder.set_override("api_base_url", v)?; }
        if let Some(v) = read_env("PROFILE_PATH") { builder = builder.set_override("profile_path", v)?; }
        if let Some(v) = read_env("PUSH_URL") { builder = builder.set_override("push_url", v)?; }
        if let Some(v) = read_env("LOGIN_PATH") { builder = builder.set_override("login_path", v)?; }
        if let Some(v) = read_env("LOG_LEVEL") { builder = builder.set_override("log_level", v)?; }
        if let Some(v) = read_env("LOG_FORMAT") { builder = builder.set_override("log_format", v)?; }

        // Numeric overrides
        if let Some(v) = read_env("POLL_INTERVAL_SECONDS").and_then(|s| s.parse::<f64>().ok()) { builder = builder.set_override("poll_interval_seconds", v)?; }
        if let Some(v) = read_env("HTTP_TIMEOUT_SECONDS").and_then(|s| s.parse::<f64>().ok()) { builder = builder.set_override("http_timeout_seconds", v)?; }
        if let Some(v) = read_env("RECONNECT_INITIAL_DELAY_MS").and_then(|s| s.parse::<u64>().ok()) { builder = builder.set_override("reconnect_initial_delay_ms", v)?; }
        if let Some(v) = read_env("RECONNECT_MAX_DELAY_MS").and_then(|s| s.parse::<u64>().ok()) { builder = builder.set_override("reconnect_max_delay_ms", v)?; }
        if let Some(v) = read_env("RECONNECT_MAX_ATTEMPTS").and_then(|s| s.parse::<u32>().ok()) { builder = builder.set_override("reconnect_max_attempts", v)?; }
        if let Some(v) = read_env("DEACTIVATION_GRACE_SECONDS").and_then(|s| s.parse::<f64>().ok()) { builder = builder.set_override("deactivation_grace_seconds", v)?; }

        let settings = builder.build()?;
        let config: Settings = settings.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "plain") {
            return Err(ConfigError::Validation(
                "log_format must be 'json' or 'plain'".to_string(),
            ));
        }

        Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::Validation(format!("api_base_url is not a valid URL: {}", e)))?;

        let push = Url::parse(&self.push_url)
            .map_err(|e| ConfigError::Validation(format!("push_url is not a valid URL: {}", e)))?;
        if !matches!(push.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation(
                "push_url must use the ws or wss scheme".to_string(),
            ));
        }

        if !self.profile_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "profile_path must start with '/'".to_string(),
            ));
        }

        if !self.login_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "login_path must start with '/'".to_string(),
            ));
        }

        let durations = [
            ("poll_interval_seconds", self.poll_interval_seconds),
            ("http_timeout_seconds", self.http_timeout_seconds),
            ("deactivation_grace_seconds", self.deactivation_grace_seconds),
        ];
        for (name, seconds) in durations {
            Duration::try_from_secs_f64(seconds).map_err(|_| {
                ConfigError::Validation(format!(
                    "{} must be a finite, non-negative number of seconds within range",
                    name
                ))
            })?;
        }

        if self.poll_interval_seconds <= 0.0 {
            return Err(ConfigError::Validation(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.http_timeout_seconds <= 0.0 {
            return Err(ConfigError::Validation(
                "http_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.reconnect_initial_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "reconnect_initial_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.reconnect_max_delay_ms < self.reconnect_initial_delay_ms {
            return Err(ConfigError::Validation(
                "reconnect_max_delay_ms must be at least reconnect_initial_delay_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Full URL of the current-user profile endpoint
    pub fn profile_url(&self) -> Result<Url, ConfigError> {
        let joined = format!(
            "{}{}",
            self.api_base_url.trim_end_matches('/'),
            self.profile_path
        );
        Url::parse(&joined).map_err(|e| ConfigError::Parse(format!("profile url: {}", e)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.http_timeout_seconds)
    }

    pub fn deactivation_grace(&self) -> Duration {
        Duration::from_secs_f64(self.deactivation_grace_seconds)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect_initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
            max_attempts: self.reconnect_max_attempts,
        }
    }
}
