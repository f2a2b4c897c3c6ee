//! Configuration management for Remedy services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Azure OpenAI variables (AZURE_OPENAI_*)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Knowledge base location
    pub knowledge_base: KnowledgeBaseConfig,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Consultation session configuration
    pub session: SessionConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// Path to the JSON knowledge base
    pub path: PathBuf,
}

/// Which chat-completions flavour to talk to
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Azure OpenAI deployment
    Azure,
    /// OpenAI or any OpenAI-compatible endpoint
    OpenAi,
    /// Canned responses, no network
    Mock,
    /// No language model; enhanced features are unavailable
    Disabled,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    /// API key
    pub api_key: Option<String>,

    /// Azure resource endpoint, or base URL for OpenAI-compatible providers
    pub endpoint: Option<String>,

    /// Azure deployment name
    pub deployment: Option<String>,

    /// Azure API version
    pub api_version: String,

    /// Model name (OpenAI-compatible providers)
    pub model: String,

    /// Maximum tokens in a response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for transient failures
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time before a session expires, in minutes
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    pub log_level: String,

    /// Enable JSON logging
    pub json_logging: bool,

    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    pub requests_per_second: u32,

    /// Burst capacity
    pub burst: u32,

    /// Enable rate limiting
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/kb.json"),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Azure,
            api_key: None,
            endpoint: None,
            deployment: None,
            api_version: "2023-05-15".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_minutes: 30 }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: true,
            metrics_enabled: true,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 50,
            burst: 100,
            enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // AZURE_OPENAI_* take precedence when present
            .set_override_option("llm.api_key", env_var("AZURE_OPENAI_API_KEY"))?
            .set_override_option("llm.endpoint", env_var("AZURE_OPENAI_ENDPOINT"))?
            .set_override_option("llm.deployment", env_var("AZURE_OPENAI_DEPLOYMENT"))?
            .set_override_option("llm.api_version", env_var("AZURE_OPENAI_API_VERSION"))?

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl LlmConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether enough settings are present to build a client for the provider
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        match self.provider {
            LlmProvider::Azure => {
                present(&self.api_key) && present(&self.endpoint) && present(&self.deployment)
            }
            LlmProvider::OpenAi => present(&self.api_key),
            LlmProvider::Mock => true,
            LlmProvider::Disabled => false,
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.knowledge_base.path, PathBuf::from("data/kb.json"));
        assert_eq!(config.llm.api_version, "2023-05-15");
        assert_eq!(config.session.ttl_minutes, 30);
    }

    #[test]
    fn test_llm_configured_per_provider() {
        let mut llm = LlmConfig::default();
        assert!(!llm.is_configured());

        llm.api_key = Some("key".into());
        llm.endpoint = Some("https://example.openai.azure.com".into());
        assert!(!llm.is_configured(), "azure needs a deployment too");

        llm.deployment = Some("gpt-35".into());
        assert!(llm.is_configured());

        llm.provider = LlmProvider::Disabled;
        assert!(!llm.is_configured());

        let mock = LlmConfig { provider: LlmProvider::Mock, ..LlmConfig::default() };
        assert!(mock.is_configured());
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let llm = LlmConfig {
            provider: LlmProvider::OpenAi,
            api_key: Some("   ".into()),
            ..LlmConfig::default()
        };
        assert!(!llm.is_configured());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\n\n[llm]\nprovider = \"mock\"\n\n[knowledge_base]\npath = \"/srv/kb.json\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.provider, LlmProvider::Mock);
        assert_eq!(config.knowledge_base.path, PathBuf::from("/srv/kb.json"));
        assert!(config.rate_limit.enabled);
    }
}
