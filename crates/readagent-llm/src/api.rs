//! Language-model backend for OpenAI-compatible and Anthropic endpoints.
//!
//! One backend implements all four capabilities over a shared HTTP client.
//! Each request is a single attempt; wrap the backend in
//! [`Retrying`](crate::retry::Retrying) for backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use readagent_types::LlmSettings;

use crate::capability::{Answerer, BoundaryOracle, Completion, PageSelector, Summarizer};
use crate::error::CapabilityError;
use crate::prompts;
use crate::tokens::TokenCounter;

/// Request dialect spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProvider {
    /// `/chat/completions` with bearer auth
    OpenAi,
    /// `/messages` with `x-api-key`
    Anthropic,
}

/// Configuration for the API backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub provider: ApiProvider,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,

    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Completion length cap
    pub max_decode_steps: u32,

    pub temperature: f32,

    /// Sampling seed (OpenAI-compatible endpoints only)
    pub seed: Option<u64>,
}

impl ApiConfig {
    /// Create config for OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ApiProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_decode_steps: 512,
            temperature: 0.0,
            seed: Some(42),
        }
    }

    /// Create config for Claude API.
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ApiProvider::Anthropic,
            base_url: "https://api.anthropic.com/v1".to_string(),
            seed: None,
            ..Self::openai(api_key, model)
        }
    }

    /// Build from application settings.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, CapabilityError> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            CapabilityError::Config(format!("no API key configured for {}", settings.provider))
        })?;

        let mut config = match settings.provider.as_str() {
            "openai" => Self::openai(api_key, &settings.model),
            "anthropic" | "claude" => Self::claude(api_key, &settings.model),
            other => {
                return Err(CapabilityError::Config(format!(
                    "unknown provider: {}",
                    other
                )))
            }
        };

        if let Some(base_url) = &settings.api_base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.timeout = Duration::from_secs(settings.timeout_secs);
        config.max_decode_steps = settings.max_decode_steps;
        Ok(config)
    }
}

/// API-backed implementation of every capability.
pub struct LlmBackend {
    client: Client,
    config: ApiConfig,
    tokens: TokenCounter,
}

impl LlmBackend {
    /// Create a new backend.
    pub fn new(config: ApiConfig) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CapabilityError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config,
            tokens: TokenCounter::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one prompt and return the trimmed response text.
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, CapabilityError> {
        debug!(model = %self.config.model, prompt = %prompt, "Prompting model");

        let response = match self.config.provider {
            ApiProvider::Anthropic => self.make_anthropic_request(prompt, system).await?,
            ApiProvider::OpenAi => self.make_openai_request(prompt, system).await?,
        };
        let response = response.trim().to_string();

        debug!(model = %self.config.model, response = %response, "Model responded");
        Ok(response)
    }

    /// Make OpenAI-compatible API request.
    async fn make_openai_request(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, CapabilityError> {
        #[derive(Serialize)]
        struct OpenAIRequest {
            model: String,
            messages: Vec<OpenAIMessage>,
            max_tokens: u32,
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            seed: Option<u64>,
        }

        #[derive(Serialize)]
        struct OpenAIMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: Option<String>,
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_decode_steps,
            temperature: self.config.temperature,
            seed: self.config.seed,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = check_status(response).await?;

        let response_body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Parse(e.to_string()))?;

        response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CapabilityError::Parse("No choices in response".to_string()))
    }

    /// Make Anthropic API request.
    async fn make_anthropic_request(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, CapabilityError> {
        #[derive(Serialize)]
        struct AnthropicRequest {
            model: String,
            max_tokens: u32,
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            system: Option<String>,
            messages: Vec<AnthropicMessage>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage {
            role: String,
            content: String,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_decode_steps,
            temperature: self.config.temperature,
            system: system.map(str::to_string),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = check_status(response).await?;

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Parse(e.to_string()))?;

        response_body
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| CapabilityError::Parse("No content in response".to_string()))
    }
}

/// Map rate limiting and non-success statuses to errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CapabilityError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(CapabilityError::RateLimitExceeded);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CapabilityError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[async_trait]
impl BoundaryOracle for LlmBackend {
    async fn propose_boundary(
        &self,
        preceding: &str,
        passage: &str,
        end_tag: &str,
    ) -> Result<String, CapabilityError> {
        let prompt = prompts::pagination_prompt(preceding, passage, end_tag);
        self.complete(&prompt, None).await
    }
}

#[async_trait]
impl Summarizer for LlmBackend {
    async fn shorten(&self, page_text: &str) -> Result<String, CapabilityError> {
        if page_text.trim().is_empty() {
            return Err(CapabilityError::EmptyInput);
        }
        let prompt = prompts::gisting_prompt(page_text);
        self.complete(&prompt, None).await
    }
}

#[async_trait]
impl PageSelector for LlmBackend {
    async fn select_pages(
        &self,
        shortened_article: &str,
        question: &str,
        max_lookup_pages: usize,
    ) -> Result<Completion, CapabilityError> {
        let prompt = prompts::lookup_prompt(shortened_article, question, max_lookup_pages);
        let used_tokens = self.tokens.count(&prompt);
        let text = self.complete(&prompt, None).await?;
        Ok(Completion::new(text, used_tokens))
    }
}

#[async_trait]
impl Answerer for LlmBackend {
    async fn answer(
        &self,
        context: &str,
        question: &str,
        options: Option<&[String]>,
    ) -> Result<Completion, CapabilityError> {
        let prompt = match options {
            Some(options) if !options.is_empty() => {
                prompts::multiple_choice_prompt(context, question, options)
            }
            _ => prompts::generation_prompt(context, question),
        };
        let used_tokens = self.tokens.count(&prompt);
        let text = self.complete(&prompt, Some(prompts::ANSWER_SYSTEM)).await?;
        Ok(Completion::new(text, used_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> LlmBackend {
        let mut config = ApiConfig::openai("test-key", "gpt-4o-mini");
        config.base_url = server.uri();
        LlmBackend::new(config).unwrap()
    }

    fn chat_response(content: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "content": content } } ] })
    }

    #[test]
    fn test_openai_config() {
        let config = ApiConfig::openai("test-key", "gpt-4o-mini");
        assert_eq!(config.provider, ApiProvider::OpenAi);
        assert!(config.base_url.contains("openai"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_claude_config() {
        let config = ApiConfig::claude("test-key", "claude-3-haiku-20240307");
        assert_eq!(config.provider, ApiProvider::Anthropic);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_from_settings_rejects_unknown_provider() {
        let settings = LlmSettings {
            provider: "carrier-pigeon".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ApiConfig::from_settings(&settings),
            Err(CapabilityError::Config(_))
        ));
    }

    #[test]
    fn test_from_settings_applies_base_url() {
        let settings = LlmSettings {
            api_key: Some("k".to_string()),
            api_base_url: Some("http://localhost:8080/v1/".to_string()),
            max_decode_steps: 128,
            ..Default::default()
        };
        let config = ApiConfig::from_settings(&settings).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.max_decode_steps, 128);
    }

    #[tokio::test]
    async fn test_boundary_response_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("  Label: <5>\n ")))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let response = backend.propose_boundary("", "a\n<5>", "").await.unwrap();
        assert_eq!(response, "Label: <5>");
    }

    #[tokio::test]
    async fn test_lookup_counts_prompt_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_response("Look up Page [1, 2]")),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let completion = backend
            .select_pages("<Page 0>\nfirst\n<Page 1>\nsecond", "Why?", 6)
            .await
            .unwrap();
        assert_eq!(completion.text, "Look up Page [1, 2]");
        assert!(completion.used_tokens > 0);
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_transient_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.shorten("some page").await.unwrap_err();
        assert!(matches!(err, CapabilityError::RateLimitExceeded));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_error_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.shorten("some page").await.unwrap_err();
        match err {
            CapabilityError::Http { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_anthropic_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gateway/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [ { "type": "text", "text": "Reasoning. [[2]]" } ]
            })))
            .mount(&server)
            .await;

        let settings = LlmSettings {
            provider: "anthropic".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            api_key: Some("test-key".to_string()),
            api_base_url: Some(format!("{}/gateway/v1", server.uri())),
            ..Default::default()
        };
        let backend = LlmBackend::new(ApiConfig::from_settings(&settings).unwrap()).unwrap();

        let options = vec!["a".to_string(), "b".to_string()];
        let completion = backend.answer("ctx", "Which?", Some(&options)).await.unwrap();
        assert_eq!(completion.text, "Reasoning. [[2]]");
        assert!(completion.used_tokens > 0);
    }

    #[tokio::test]
    async fn test_empty_page_is_rejected_without_request() {
        let server = MockServer::start().await;
        let backend = backend_for(&server);
        assert!(matches!(
            backend.shorten("   ").await,
            Err(CapabilityError::EmptyInput)
        ));
    }
}
