//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which backend produces the lesson text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationProvider {
    Gemini,
    OpenAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: String,
    pub splash_delay: Duration,
    pub generation_provider: GenerationProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: String,
    pub storage_backend: StorageBackend,
    pub storage_path: PathBuf,
    pub storage_quota_bytes: usize,
}

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        let splash_delay = match var("SPLASH_DELAY_MS") {
            Some(ms) => Duration::from_millis(ms.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("SPLASH_DELAY_MS".to_string(), e.to_string())
            })?),
            None => Duration::from_millis(2500),
        };

        // --- Generation Settings ---
        let generation_provider = match var("GENERATION_PROVIDER")
            .unwrap_or_else(|| "gemini".to_string())
            .to_lowercase()
            .as_str()
        {
            "gemini" => GenerationProvider::Gemini,
            "openai" => GenerationProvider::OpenAi,
            other => {
                return Err(ConfigError::InvalidValue(
                    "GENERATION_PROVIDER".to_string(),
                    format!("'{}' is not one of gemini, openai", other),
                ))
            }
        };

        // --- Load API Keys (as optional) ---
        let gemini_api_key = var("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let openai_api_key = var("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        // Images always come from Gemini, so its key is needed either way.
        if gemini_api_key.is_none() {
            return Err(ConfigError::MissingVar("GEMINI_API_KEY".to_string()));
        }
        if generation_provider == GenerationProvider::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        let gemini_base_url = var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
        let text_model = var("TEXT_MODEL").unwrap_or_else(|| "gemini-3-pro-preview".to_string());
        let image_model = var("IMAGE_MODEL").unwrap_or_else(|| "gemini-2.5-flash-image".to_string());
        let openai_base_url = var("OPENAI_BASE_URL");
        let openai_model = var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string());

        // --- Storage Settings ---
        let storage_backend = match var("STORAGE_BACKEND")
            .unwrap_or_else(|| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "file" => StorageBackend::File,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORAGE_BACKEND".to_string(),
                    format!("'{}' is not one of file, memory", other),
                ))
            }
        };
        let storage_path = var("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/storage.json"));
        let storage_quota_bytes = match var("STORAGE_QUOTA_BYTES") {
            Some(bytes) => bytes.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("STORAGE_QUOTA_BYTES".to_string(), e.to_string())
            })?,
            None => DEFAULT_STORAGE_QUOTA_BYTES,
        };

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            splash_delay,
            generation_provider,
            gemini_api_key,
            gemini_base_url,
            text_model,
            image_model,
            openai_api_key,
            openai_base_url,
            openai_model,
            storage_backend,
            storage_path,
            storage_quota_bytes,
        })
    }
}
