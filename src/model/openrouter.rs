//! OpenRouter-backed `ModelProvider`. The assembled prompt is sent as
//! a single user message; callers that want a system preamble fold it
//! into the prompt themselves (the Prompt Assembler already renders a
//! `[system]\n...` block as part of its output).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::agent::types::{GenerationOptions, Usage};
use crate::error::{Error, Result};

use super::{Completion, ModelProvider};

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub default_model: String,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(String::new()),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            default_model: "anthropic/claude-3.5-sonnet".to_string(),
            site_url: None,
            site_name: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Default)]
struct RateLimitState {
    remaining: Option<u32>,
    reset_at: Option<u64>,
}

/// Thin HTTP client over OpenRouter's chat-completions endpoint.
#[derive(Clone)]
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
    rate_limit: Arc<RwLock<RateLimitState>>,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key is required for the model provider".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|e| Error::Config(format!("Invalid API key format: {e}")))?,
        );
        if let Some(ref site_url) = config.site_url {
            if let Ok(value) = header::HeaderValue::from_str(site_url) {
                headers.insert("HTTP-Referer", value);
            }
        }
        if let Some(ref site_name) = config.site_name {
            if let Ok(value) = header::HeaderValue::from_str(site_name) {
                headers.insert("X-Title", value);
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limit: Arc::new(RwLock::new(RateLimitState::default())),
        })
    }

    async fn update_rate_limit(&self, response: &reqwest::Response) {
        let mut state = self.rate_limit.write().await;
        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
        {
            state.remaining = Some(remaining);
        }
        if let Some(reset) = response
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
        {
            state.reset_at = Some(reset);
        }
    }

    pub async fn should_wait(&self) -> Option<std::time::Duration> {
        let state = self.rate_limit.read().await;
        let (remaining, reset_at) = (state.remaining?, state.reset_at?);
        if remaining > 0 {
            return None;
        }
        let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).ok()?.as_secs();
        (reset_at > now).then(|| std::time::Duration::from_secs(reset_at - now))
    }
}

#[async_trait]
impl ModelProvider for OpenRouterProvider {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<Completion> {
        let model = options.model.clone().unwrap_or_else(|| self.config.default_model.clone());
        let request = ChatCompletionRequest {
            model: model.clone(),
            messages: vec![WireMessage { role: "user".to_string(), content: prompt.to_string() }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %model, "sending completion request");

        let response = self.client.post(&url).json(&request).send().await?;
        self.update_rate_limit(&response).await;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!("rate limit exceeded: {body}");
            }
            return Err(Error::Model(format!("OpenRouter API error ({status}): {body}")));
        }

        let body: ChatCompletionResponse = response.json().await?;
        let choice = body.choices.into_iter().next().ok_or_else(|| Error::Model("empty choices array".to_string()))?;

        Ok(Completion {
            text: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: body.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let config = OpenRouterConfig { api_key: SecretString::from(String::new()), ..Default::default() };
        let result = OpenRouterProvider::new(config);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_nonempty_api_key() {
        let config = OpenRouterConfig { api_key: SecretString::from("test-key"), ..Default::default() };
        assert!(OpenRouterProvider::new(config).is_ok());
    }

    #[tokio::test]
    async fn complete_parses_successful_response() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "TASK_COMPLETED"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
            })))
            .mount(&server)
            .await;

        let config = OpenRouterConfig {
            api_key: SecretString::from("test-key"),
            base_url: server.uri(),
            ..Default::default()
        };
        let provider = OpenRouterProvider::new(config).unwrap();
        let completion = provider.complete("do the thing", &GenerationOptions::default()).await.unwrap();

        assert_eq!(completion.text, "TASK_COMPLETED");
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.unwrap().total_tokens, 14);
    }

    #[tokio::test]
    async fn complete_maps_http_error_to_model_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let config = OpenRouterConfig {
            api_key: SecretString::from("test-key"),
            base_url: server.uri(),
            ..Default::default()
        };
        let provider = OpenRouterProvider::new(config).unwrap();
        let err = provider.complete("hi", &GenerationOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }
}
