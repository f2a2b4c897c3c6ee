//! Language model abstraction
//!
//! Provides a single text-in/text-out interface over:
//! - Azure OpenAI deployments
//! - OpenAI-compatible chat completion endpoints
//! - A scripted mock for tests and offline development

mod client;
mod mock;

pub use client::ChatCompletionsClient;
pub use mock::MockLanguageModel;

use crate::config::{LlmConfig, LlmProvider};
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// System message sent ahead of every prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful medical assistant.";

/// Trait for text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a language model based on configuration
///
/// Returns `None` when the provider is disabled or its settings are
/// incomplete; callers treat that as "language model features unavailable".
pub fn create_language_model(config: &LlmConfig) -> Option<Arc<dyn LanguageModel>> {
    if !config.is_configured() {
        if config.provider != LlmProvider::Disabled {
            tracing::warn!(
                provider = ?config.provider,
                "Language model settings incomplete, enhanced features disabled"
            );
        }
        return None;
    }

    match config.provider {
        LlmProvider::Azure | LlmProvider::OpenAi => match ChatCompletionsClient::from_config(config) {
            Ok(client) => {
                tracing::info!(
                    provider = ?config.provider,
                    model = client.model_name(),
                    "Language model client ready"
                );
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create language model client");
                None
            }
        },
        LlmProvider::Mock => {
            tracing::info!("Using mock language model");
            Some(Arc::new(MockLanguageModel::new()))
        }
        LlmProvider::Disabled => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider_has_no_model() {
        let config = LlmConfig {
            provider: LlmProvider::Disabled,
            ..LlmConfig::default()
        };
        assert!(create_language_model(&config).is_none());
    }

    #[test]
    fn test_azure_without_credentials_has_no_model() {
        let config = LlmConfig {
            provider: LlmProvider::Azure,
            api_key: None,
            endpoint: Some("https://example.openai.azure.com".into()),
            deployment: Some("gpt".into()),
            ..LlmConfig::default()
        };
        assert!(create_language_model(&config).is_none());
    }

    #[test]
    fn test_azure_with_credentials_builds_client() {
        let config = LlmConfig {
            provider: LlmProvider::Azure,
            api_key: Some("key".into()),
            endpoint: Some("https://example.openai.azure.com".into()),
            deployment: Some("remedy-gpt".into()),
            ..LlmConfig::default()
        };
        let model = create_language_model(&config).unwrap();
        assert_eq!(model.model_name(), "remedy-gpt");
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let config = LlmConfig {
            provider: LlmProvider::Mock,
            ..LlmConfig::default()
        };
        let model = create_language_model(&config).unwrap();
        assert_eq!(model.model_name(), "mock-language-model");
        assert!(model.generate("hello").await.is_ok());
    }
}
