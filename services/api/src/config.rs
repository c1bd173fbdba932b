//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use directories::ProjectDirs;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use study_assistant_core::catalog::Provider;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub allowed_origin: String,
    /// Keys seeded into the settings store at startup. Never written to disk.
    pub api_keys: HashMap<Provider, String>,
    pub quiz_question_count: usize,
    pub flashcard_count: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut configured: Vec<&str> = self.api_keys.keys().map(|p| p.id()).collect();
        configured.sort_unstable();
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("data_dir", &self.data_dir)
            .field("log_level", &self.log_level)
            .field("allowed_origin", &self.allowed_origin)
            .field("api_keys", &configured)
            .field("quiz_question_count", &self.quiz_question_count)
            .field("flashcard_count", &self.flashcard_count)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: default_data_dir(),
            log_level: Level::INFO,
            allowed_origin: "http://localhost:1420".to_string(),
            api_keys: HashMap::new(),
            quiz_question_count: 5,
            flashcard_count: 10,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        // --- Load Server and Storage Settings ---
        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(value) => value.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            Err(_) => defaults.bind_address,
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            std::env::var("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin);

        // --- Load API Keys (as optional) ---
        let api_keys = Provider::ALL
            .into_iter()
            .filter_map(|provider| {
                std::env::var(api_key_var(provider))
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .map(|key| (provider, key))
            })
            .collect();

        // --- Load Generation Settings ---
        let quiz_question_count =
            parse_count("QUIZ_QUESTION_COUNT", defaults.quiz_question_count)?;
        let flashcard_count = parse_count("FLASHCARD_COUNT", defaults.flashcard_count)?;

        Ok(Self {
            bind_address,
            data_dir,
            log_level,
            allowed_origin,
            api_keys,
            quiz_question_count,
            flashcard_count,
        })
    }
}

/// The environment variable that seeds the key for `provider`.
pub fn api_key_var(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI_API_KEY",
        Provider::Anthropic => "ANTHROPIC_API_KEY",
        Provider::Google => "GEMINI_API_KEY",
        Provider::DeepSeek => "DEEPSEEK_API_KEY",
    }
}

fn parse_count(var: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(var) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(ConfigError::InvalidValue(
                var.to_string(),
                format!("'{}' is not a positive integer", value),
            )),
        },
        Err(_) => Ok(default),
    }
}

/// Platform data directory for the app, or `./data` when none can be determined.
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "synapse", "synapse")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_has_a_distinct_key_variable() {
        let mut vars: Vec<&str> = Provider::ALL.into_iter().map(api_key_var).collect();
        vars.sort_unstable();
        vars.dedup();
        assert_eq!(vars.len(), Provider::ALL.len());
    }

    #[test]
    fn defaults_match_local_desktop_use() {
        let config = Config::default();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:3000");
        assert_eq!(config.quiz_question_count, 5);
        assert_eq!(config.flashcard_count, 10);
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn debug_output_hides_key_values() {
        let mut config = Config::default();
        config.api_keys.insert(Provider::OpenAi, "sk-very-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("openai"));
        assert!(!rendered.contains("sk-very-secret"));
    }
}
