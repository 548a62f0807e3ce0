use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which language-model gateway answers the sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
    /// The offline scripted gateway; needs no API key.
    Mock,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAI | Provider::Mock => "gpt-4o",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub chat_model: String,
    pub default_container_id: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    /// Delay the `mock` provider waits before answering.
    pub mock_latency: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str =
            std::env::var("GATEWAY_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "gemini" => Provider::Gemini,
            "mock" => Provider::Mock,
            other => {
                return Err(ConfigError::InvalidValue(
                    "GATEWAY_PROVIDER".to_string(),
                    format!("'{}' is not one of openai, gemini, mock", other),
                ));
            }
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        let gemini_api_base = std::env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| kai_core::gateway::gemini::DEFAULT_BASE_URL.to_string());

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| provider.default_model().to_string());

        let default_container_id = std::env::var("DEFAULT_CONTAINER_ID")
            .unwrap_or_else(|_| kai_core::command::DEFAULT_CONTAINER_ID.to_string());
        if default_container_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_CONTAINER_ID".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let mock_latency = match std::env::var("MOCK_LATENCY_MS") {
            Ok(value) => value.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                ConfigError::InvalidValue(
                    "MOCK_LATENCY_MS".to_string(),
                    format!("'{}' is not a number of milliseconds", value),
                )
            })?,
            Err(_) => Duration::ZERO,
        };

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
            Provider::Mock => {}
        }

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            openai_api_base,
            gemini_api_key,
            gemini_api_base,
            chat_model,
            default_container_id,
            log_level,
            prompts_path,
            mock_latency,
        })
    }
}
