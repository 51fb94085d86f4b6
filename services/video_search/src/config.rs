//! services/video_search/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use video_search_core::TOKEN_REFRESH_INTERVAL;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const DATA_DIR_NAME: &str = "video-search";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub log_level: Level,
    pub firebase_api_key: Option<String>,
    pub identity_toolkit_url: String,
    pub secure_token_url: String,
    pub credential_path: PathBuf,
    pub account_path: PathBuf,
    pub token_refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Remote API ---
        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Identity Provider ---
        let firebase_api_key = std::env::var("FIREBASE_API_KEY").ok().filter(|k| !k.is_empty());
        let identity_toolkit_url = std::env::var("IDENTITY_TOOLKIT_URL")
            .unwrap_or_else(|_| DEFAULT_IDENTITY_TOOLKIT_URL.to_string());
        let secure_token_url = std::env::var("SECURE_TOKEN_URL")
            .unwrap_or_else(|_| DEFAULT_SECURE_TOKEN_URL.to_string());

        // --- Local Persistence ---
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME);
        let credential_path = std::env::var("CREDENTIAL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("credential"));
        let account_path = std::env::var("ACCOUNT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("account.json"));

        // --- Timers ---
        let token_refresh_interval =
            duration_secs_var("TOKEN_REFRESH_INTERVAL_SECS", TOKEN_REFRESH_INTERVAL)?;
        let request_timeout = duration_secs_var("REQUEST_TIMEOUT_SECS", Duration::from_secs(30))?;

        Ok(Self {
            api_base_url,
            log_level,
            firebase_api_key,
            identity_toolkit_url,
            secure_token_url,
            credential_path,
            account_path,
            token_refresh_interval,
            request_timeout,
        })
    }

    /// The identity provider key, required only by commands that talk to it.
    pub fn require_firebase_api_key(&self) -> Result<&str, ConfigError> {
        self.firebase_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("FIREBASE_API_KEY".to_string()))
    }
}

fn duration_secs_var(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a positive number of seconds", raw),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "API_BASE_URL",
        "RUST_LOG",
        "FIREBASE_API_KEY",
        "IDENTITY_TOOLKIT_URL",
        "SECURE_TOKEN_URL",
        "CREDENTIAL_PATH",
        "ACCOUNT_PATH",
        "TOKEN_REFRESH_INTERVAL_SECS",
        "REQUEST_TIMEOUT_SECS",
    ];

    fn with_env<F: FnOnce()>(overrides: &[(&str, &str)], f: F) {
        let vars: Vec<(&str, Option<&str>)> = VARS
            .iter()
            .map(|name| {
                let value = overrides.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(vars, f);
    }

    #[test]
    #[serial]
    fn defaults_apply_when_unset() {
        with_env(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.api_base_url, "http://localhost:8000");
            assert_eq!(config.log_level, Level::INFO);
            assert!(config.firebase_api_key.is_none());
            assert_eq!(config.token_refresh_interval, Duration::from_secs(3000));
            assert_eq!(config.request_timeout, Duration::from_secs(30));
            assert!(config.credential_path.ends_with("video-search/credential"));
            assert!(config.require_firebase_api_key().is_err());
        });
    }

    #[test]
    #[serial]
    fn overrides_are_read() {
        with_env(
            &[
                ("API_BASE_URL", "https://api.example.com/"),
                ("RUST_LOG", "debug"),
                ("FIREBASE_API_KEY", "key-123"),
                ("CREDENTIAL_PATH", "/tmp/cred"),
                ("TOKEN_REFRESH_INTERVAL_SECS", "60"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.api_base_url, "https://api.example.com");
                assert_eq!(config.log_level, Level::DEBUG);
                assert_eq!(config.require_firebase_api_key().unwrap(), "key-123");
                assert_eq!(config.credential_path, PathBuf::from("/tmp/cred"));
                assert_eq!(config.token_refresh_interval, Duration::from_secs(60));
            },
        );
    }

    #[test]
    #[serial]
    fn invalid_values_are_rejected() {
        with_env(&[("TOKEN_REFRESH_INTERVAL_SECS", "soon")], || {
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::InvalidValue(name, _)) if name == "TOKEN_REFRESH_INTERVAL_SECS"
            ));
        });
        with_env(&[("API_BASE_URL", "localhost:8000")], || {
            assert!(matches!(Config::from_env(), Err(ConfigError::InvalidValue(name, _)) if name == "API_BASE_URL"));
        });
        with_env(&[("RUST_LOG", "chatty")], || {
            assert!(matches!(Config::from_env(), Err(ConfigError::InvalidValue(name, _)) if name == "RUST_LOG"));
        });
    }
}
