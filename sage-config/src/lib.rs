#![deny(missing_docs)]
//! Environment configuration for every saga binary (§6.6).
//!
//! Every worker, the API gateway, and the registry load their
//! configuration the same way: optionally pull in a `.env` file via
//! [`dotenvy`], then read named environment variables with documented
//! defaults. Nothing here ever holds a plaintext secret — API keys and
//! database passwords travel as [`sage_protocol::secret::SecretSource`]
//! pointers, resolved only at the point a tool binding or provider
//! client needs them.

use sage_protocol::secret::SecretSource;
use serde::Deserialize;
use thiserror::Error;

/// Errors loading configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was missing.
    #[error("missing required env var: {0}")]
    MissingVar(String),

    /// An environment variable could not be parsed to its expected type.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        /// Name of the offending variable.
        var: String,
        /// Why it could not be parsed.
        reason: String,
    },

    /// `MCP_SERVICES` was not valid JSON, or not an array of `{name, url}`.
    #[error("invalid MCP_SERVICES: {0}")]
    InvalidMcpServices(String),
}

/// Broker connection parameters (§6.6: host/user/password triplet).
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker host (e.g. `localhost`, `rabbitmq`).
    pub host: String,
    /// Broker username.
    pub user: String,
    /// Where to resolve the broker password from.
    pub password_source: SecretSource,
}

/// One statically-configured tool provider, seeded from `MCP_SERVICES`
/// and never garbage-collected by the registry's health monitor (§4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct McpServiceConfig {
    /// Provider name.
    pub name: String,
    /// Provider base URL (its `/sse` endpoint).
    pub url: String,
}

/// Full configuration for a saga binary, loaded once at process start.
#[derive(Debug, Clone)]
pub struct SageConfig {
    /// Message broker connection.
    pub broker: BrokerConfig,
    /// State store (Redis) connection URL.
    pub redis_url: String,
    /// Capability registry base URL, for tool discovery.
    pub registry_url: String,
    /// URL this process should register itself under with the registry,
    /// if it is itself a tool provider (`None` for workers/API/registry
    /// itself).
    pub registry_self_url: Option<String>,
    /// Where to resolve the Anthropic API key from, if configured.
    pub anthropic_api_key: Option<SecretSource>,
    /// Where to resolve the OpenAI API key from, if configured.
    pub openai_api_key: Option<SecretSource>,
    /// When true, workers use a deterministic mock LLM instead of a
    /// real provider (local dev / CI).
    pub mock_llm: bool,
    /// Generate-query worker's prefetch/pool width.
    pub generate_prefetch: u16,
    /// Execute-query worker's prefetch/pool width.
    pub execute_prefetch: u16,
    /// Format-result worker's prefetch/pool width.
    pub format_prefetch: u16,
    /// Per-provider tool-call concurrency bound (§4.7, §9).
    pub tool_provider_semaphore_width: usize,
    /// Statically-configured tool providers (§4.6, §6.5).
    pub mcp_services: Vec<McpServiceConfig>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_var_or(name: &str, default: &str) -> String {
    env_var(name).unwrap_or_else(|| default.to_string())
}

fn env_parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            var: name.to_string(),
            reason: format!("could not parse '{raw}'"),
        }),
    }
}

impl SageConfig {
    /// Load configuration from the process environment, first merging
    /// in a `.env` file from the current directory if one is present
    /// (existing environment variables always take priority — `.env`
    /// only fills gaps).
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// Load configuration from the process environment only, skipping
    /// `.env` discovery. Used by tests that set up their own env.
    pub fn from_env() -> Result<Self, ConfigError> {
        let broker = BrokerConfig {
            host: env_var_or("RABBITMQ_HOST", "localhost"),
            user: env_var_or("RABBITMQ_USER", "guest"),
            password_source: SecretSource::EnvVar {
                var_name: "RABBITMQ_PASSWORD".to_string(),
            },
        };

        let anthropic_api_key = env_var("ANTHROPIC_API_KEY").map(|_| SecretSource::EnvVar {
            var_name: "ANTHROPIC_API_KEY".to_string(),
        });
        let openai_api_key = env_var("OPENAI_API_KEY").map(|_| SecretSource::EnvVar {
            var_name: "OPENAI_API_KEY".to_string(),
        });

        let mock_llm = match env_var("MOCK_LLM") {
            None => false,
            Some(raw) => matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        };

        let mcp_services = match env_var("MCP_SERVICES") {
            None => Vec::new(),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidMcpServices(e.to_string()))?,
        };

        Ok(Self {
            broker,
            redis_url: env_var_or("REDIS_URL", "redis://127.0.0.1:6379"),
            registry_url: env_var_or("REGISTRY_URL", "http://localhost:8070"),
            registry_self_url: env_var("REGISTRY_SELF_URL"),
            anthropic_api_key,
            openai_api_key,
            mock_llm,
            generate_prefetch: env_parsed_or("GENERATE_PREFETCH", 20)?,
            execute_prefetch: env_parsed_or("EXECUTE_PREFETCH", 20)?,
            format_prefetch: env_parsed_or("FORMAT_PREFETCH", 20)?,
            tool_provider_semaphore_width: env_parsed_or("TOOL_PROVIDER_SEMAPHORE_WIDTH", 100)?,
            mcp_services,
        })
    }
}
