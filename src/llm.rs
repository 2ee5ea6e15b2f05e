//! The LLM surface C6 calls: a single chat-completions client over
//! whichever OpenRouter-compatible endpoint is configured. Kept
//! behind a small trait so tests can substitute a [`mockall`] double
//! instead of making a real HTTP call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OpenRouterConfig;
use crate::error::{CoreError, Result};

#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug)]
pub struct ChatCompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<String>;
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(CoreError::HttpError)?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat_completion(&self, request: ChatCompletionRequest) -> Result<String> {
        let body = OpenRouterRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.config.model, "calling LLM chat-completions endpoint");

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(CoreError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "LLM endpoint returned a non-success status");
            return Err(CoreError::InternalError(format!(
                "LLM endpoint returned {}: {}",
                status, text
            )));
        }

        let parsed: OpenRouterResponse = response.json().await.map_err(CoreError::HttpError)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CoreError::InternalError("LLM response had no choices".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
}

#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: String,
}

/// Fault families for which the diagnose pipeline asks the model to be
/// decisive (`temperature=0.3`) rather than exploratory (`0.7`)
/// step 6.
pub fn temperature_for(fault_type: crate::models::FaultType) -> f32 {
    use crate::models::FaultType::*;
    match fault_type {
        ImagePullBackOff | OomKilled | CrashLoopBackOff | Pending => 0.3,
        _ => 0.7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FaultType;

    #[test]
    fn decisive_fault_families_get_low_temperature() {
        assert_eq!(temperature_for(FaultType::ImagePullBackOff), 0.3);
        assert_eq!(temperature_for(FaultType::OomKilled), 0.3);
        assert_eq!(temperature_for(FaultType::CrashLoopBackOff), 0.3);
        assert_eq!(temperature_for(FaultType::Pending), 0.3);
    }

    #[test]
    fn other_fault_families_get_exploratory_temperature() {
        assert_eq!(temperature_for(FaultType::NodeNotReady), 0.7);
        assert_eq!(temperature_for(FaultType::JobFailed), 0.7);
    }

    #[tokio::test]
    async fn chat_completion_parses_the_first_choice_from_a_mocked_endpoint() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "content": "### 근본 원인\n테스트" } }
                ]
            })))
            .mount(&server)
            .await;

        let config = OpenRouterConfig {
            api_url: format!("{}/chat/completions", server.uri()),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
            max_tokens: 100,
            temperature: 0.3,
        };
        let client = OpenRouterClient::new(config).expect("client builds");

        let reply = client
            .chat_completion(ChatCompletionRequest {
                system: "system".to_string(),
                user: "user".to_string(),
                max_tokens: 100,
                temperature: 0.3,
            })
            .await
            .expect("mocked call succeeds");

        assert!(reply.contains("근본 원인"));
    }

    #[tokio::test]
    async fn chat_completion_surfaces_a_non_success_status_as_an_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream error"))
            .mount(&server)
            .await;

        let config = OpenRouterConfig {
            api_url: format!("{}/chat/completions", server.uri()),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
            max_tokens: 100,
            temperature: 0.3,
        };
        let client = OpenRouterClient::new(config).expect("client builds");

        let result = client
            .chat_completion(ChatCompletionRequest {
                system: "system".to_string(),
                user: "user".to_string(),
                max_tokens: 100,
                temperature: 0.3,
            })
            .await;

        assert!(result.is_err());
    }
}
