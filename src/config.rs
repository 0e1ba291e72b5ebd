use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CarePath";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Gemini model used for all generation calls.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Wall-clock deadline for a single provider call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Legacy per-key variables, read when `CAREPATH_API_KEYS` is unset.
const LEGACY_KEY_VARS: &[&str] = &[
    "GEMINI_API_KEY1",
    "GEMINI_API_KEY2",
    "GEMINI_API_KEY3",
    "GEMINI_API_KEY4",
    "GEMINI_API_KEY5",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No provider credentials configured (set CAREPATH_API_KEYS)")]
    NoCredentials,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Get the application data directory
/// ~/CarePath/ on all platforms, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the SQLite database path (`CAREPATH_DB` overrides the default).
pub fn database_path() -> PathBuf {
    match std::env::var("CAREPATH_DB") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("carepath.db"),
    }
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "carepath_lib=info,carepath=info,warn"
}

/// Text-generation provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Read provider settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_keys: Vec<String> = match lookup("CAREPATH_API_KEYS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            None => LEGACY_KEY_VARS
                .iter()
                .filter_map(|var| lookup(var))
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        };
        if api_keys.is_empty() {
            return Err(ConfigError::NoCredentials);
        }

        let timeout_secs = match lookup("CAREPATH_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "CAREPATH_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_keys,
            model: lookup("CAREPATH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("CAREPATH_PROVIDER_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            timeout_secs,
        })
    }
}
