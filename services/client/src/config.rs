//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use nutri_chat_core::ThemeMode;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const STORAGE_DIRECTORY_NAME: &str = "nutri-chat";
const STORAGE_FILE_NAME: &str = "storage.json";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: reqwest::Url,
    pub storage_path: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub fallback_reply_delay: Duration,
    pub fallback_auth_delay: Duration,
    pub ambient_theme: Option<ThemeMode>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Remote Service ---
        let api_base_url_str =
            lookup("API_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let api_base_url = reqwest::Url::parse(&api_base_url_str).map_err(|e| {
            ConfigError::InvalidValue("API_BASE_URL".to_string(), e.to_string())
        })?;

        let request_timeout = Duration::from_secs(parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 30)?);

        // --- Durable Storage ---
        let storage_path = lookup("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_path);

        // --- Logging ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Fallback Behaviour ---
        let fallback_reply_delay =
            Duration::from_millis(parse_number(&lookup, "FALLBACK_REPLY_DELAY_MS", 1500)?);
        let fallback_auth_delay =
            Duration::from_millis(parse_number(&lookup, "FALLBACK_AUTH_DELAY_MS", 1000)?);

        let ambient_theme = lookup("PREFERS_COLOR_SCHEME")
            .map(|value| {
                value.parse::<ThemeMode>().map_err(|e| {
                    ConfigError::InvalidValue("PREFERS_COLOR_SCHEME".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            api_base_url,
            storage_path,
            log_level,
            request_timeout,
            fallback_reply_delay,
            fallback_auth_delay,
            ambient_theme,
        })
    }
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn default_storage_path() -> PathBuf {
    dirs::config_dir()
        .map(|path| path.join(STORAGE_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".nutri-chat"))
        .join(STORAGE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.api_base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.fallback_reply_delay, Duration::from_millis(1500));
        assert_eq!(config.fallback_auth_delay, Duration::from_millis(1000));
        assert_eq!(config.ambient_theme, None);
        assert!(config.storage_path.ends_with("storage.json"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_BASE_URL", "https://nutri.example.com"),
            ("STORAGE_PATH", "/tmp/nutri.json"),
            ("RUST_LOG", "debug"),
            ("FALLBACK_REPLY_DELAY_MS", "0"),
            ("PREFERS_COLOR_SCHEME", "dark"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url.host_str(), Some("nutri.example.com"));
        assert_eq!(config.storage_path, PathBuf::from("/tmp/nutri.json"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.fallback_reply_delay, Duration::ZERO);
        assert_eq!(config.ambient_theme, Some(ThemeMode::Dark));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "REQUEST_TIMEOUT_SECS"));

        let err = Config::from_lookup(lookup_from(&[("API_BASE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "API_BASE_URL"));

        let err = Config::from_lookup(lookup_from(&[("PREFERS_COLOR_SCHEME", "sepia")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "PREFERS_COLOR_SCHEME"));
    }
}
