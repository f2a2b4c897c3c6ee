//! Chat completions over HTTP

use super::{LanguageModel, SYSTEM_PROMPT};
use crate::config::{LlmConfig, LlmProvider};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// How requests authenticate
#[derive(Debug, Clone)]
enum Auth {
    /// Azure `api-key` header
    ApiKey(String),
    /// `Authorization: Bearer` header
    Bearer(String),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Client for Azure OpenAI and OpenAI-compatible chat completion APIs
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    url: String,
    auth: Auth,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    max_retries: u32,
}

impl ChatCompletionsClient {
    /// Create a client from language model settings
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| -> Result<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::Configuration {
                    message: format!("llm.{} is required for provider {:?}", name, config.provider),
                })
        };

        let (url, auth, model) = match config.provider {
            LlmProvider::Azure => {
                let endpoint = required(&config.endpoint, "endpoint")?;
                let deployment = required(&config.deployment, "deployment")?;
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    deployment,
                    config.api_version
                );
                (url, Auth::ApiKey(required(&config.api_key, "api_key")?), deployment)
            }
            LlmProvider::OpenAi => {
                let base_url = config
                    .endpoint
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(OPENAI_BASE_URL);
                let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
                (url, Auth::Bearer(required(&config.api_key, "api_key")?), config.model.clone())
            }
            LlmProvider::Mock | LlmProvider::Disabled => {
                return Err(AppError::Configuration {
                    message: format!("provider {:?} does not use an HTTP client", config.provider),
                });
            }
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url,
            auth,
            model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
            max_retries: config.max_retries,
        })
    }

    /// Request URL, including any query string
    pub fn url(&self) -> &str {
        &self.url
    }

    /// One HTTP round trip, classified for the retry policy
    async fn send_once(
        &self,
        request: &ChatRequest<'_>,
        attempt: u32,
    ) -> std::result::Result<String, backoff::Error<AppError>> {
        let builder = self.client.post(&self.url).json(request);
        let builder = match &self.auth {
            Auth::ApiKey(key) => builder.header("api-key", key),
            Auth::Bearer(key) => builder.bearer_auth(key),
        };

        let retries_left = attempt <= self.max_retries;

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                let err = AppError::LanguageModelTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                return Err(self.transient_or_permanent(err, retries_left, attempt));
            }
            Err(e) if e.is_connect() => {
                let err = AppError::LanguageModel {
                    message: format!("Connection to language model failed: {}", e),
                };
                return Err(self.transient_or_permanent(err, retries_left, attempt));
            }
            Err(e) => {
                return Err(backoff::Error::permanent(AppError::LanguageModel {
                    message: format!("Language model request failed: {}", e),
                }));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::LanguageModel {
                message: format!("Language model API error {}: {}", status, body),
            };
            return Err(if is_retryable_status(status) {
                self.transient_or_permanent(err, retries_left, attempt)
            } else {
                backoff::Error::permanent(err)
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::LanguageModel {
                message: format!("Failed to parse language model response: {}", e),
            })
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
            .ok_or_else(|| {
                backoff::Error::permanent(AppError::LanguageModel {
                    message: "Empty response from language model".to_string(),
                })
            })
    }

    fn transient_or_permanent(
        &self,
        err: AppError,
        retries_left: bool,
        attempt: u32,
    ) -> backoff::Error<AppError> {
        if retries_left {
            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                error = %err,
                "Language model request failed, retrying"
            );
            backoff::Error::transient(err)
        } else {
            backoff::Error::permanent(err)
        }
    }
}

/// 429 and 5xx are worth retrying; other failures are not
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(None)
            .build();

        let request = &request;
        let mut attempt = 0u32;
        retry(policy, || {
            attempt += 1;
            let attempt = attempt;
            async move { self.send_once(request, attempt).await }
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as HttpStatus, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn azure_config() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::Azure,
            api_key: Some("secret".into()),
            endpoint: Some("https://remedy.openai.azure.com/".into()),
            deployment: Some("gpt-35".into()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_azure_url() {
        let client = ChatCompletionsClient::from_config(&azure_config()).unwrap();
        assert_eq!(
            client.url(),
            "https://remedy.openai.azure.com/openai/deployments/gpt-35/chat/completions?api-version=2023-05-15"
        );
        assert_eq!(client.model_name(), "gpt-35");
    }

    #[test]
    fn test_openai_url_defaults() {
        let config = LlmConfig {
            provider: LlmProvider::OpenAi,
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        assert_eq!(client.url(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_openai_compatible_base_url() {
        let config = LlmConfig {
            provider: LlmProvider::OpenAi,
            api_key: Some("sk-test".into()),
            endpoint: Some("http://localhost:11434/v1/".into()),
            model: "llama3".into(),
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        assert_eq!(client.url(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_missing_deployment_is_configuration_error() {
        let config = LlmConfig {
            deployment: None,
            ..azure_config()
        };
        assert!(matches!(
            ChatCompletionsClient::from_config(&config),
            Err(AppError::Configuration { .. })
        ));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-35",
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: "hi" },
            ],
            max_tokens: 1000,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 1000);
    }

    #[test]
    fn test_null_content_parses() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(chat.choices[0].message.content.is_none());
    }

    /// Serve `/chat/completions` answering with `statuses` in order, repeating the last one
    async fn scripted_server(statuses: Vec<u16>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                let statuses = statuses.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let code = statuses.get(n).or(statuses.last()).copied().unwrap_or(200);
                    let status = HttpStatus::from_u16(code).unwrap();
                    let body = serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": " ok "}}]
                    });
                    (status, Json(body))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn local_client(base_url: String, max_retries: u32) -> ChatCompletionsClient {
        let config = LlmConfig {
            provider: LlmProvider::OpenAi,
            api_key: Some("sk-test".into()),
            endpoint: Some(base_url),
            max_retries,
            ..LlmConfig::default()
        };
        ChatCompletionsClient::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_then_success_is_retried() {
        let (url, hits) = scripted_server(vec![503, 503, 200]).await;
        let client = local_client(url, 3);

        let reply = client.generate("hello").await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let (url, hits) = scripted_server(vec![500]).await;
        let client = local_client(url, 2);

        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, AppError::LanguageModel { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let (url, hits) = scripted_server(vec![401, 200]).await;
        let client = local_client(url, 3);

        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, AppError::LanguageModel { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
