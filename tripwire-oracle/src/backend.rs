//! LLM backend abstraction
//!
//! Supports OpenAI-compatible APIs (OpenAI, OpenRouter, local servers)
//! and Anthropic Claude.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Empty response")]
    EmptyResponse,
}

/// Generic LLM backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a completion with system prompt
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Supported oracle providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAI,
    OpenRouter,
    Local,
}

impl Provider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAI),
            "openrouter" => Some(Self::OpenRouter),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// Model used when none is given
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-5-haiku-20241022",
            Self::OpenAI => "gpt-4o-mini",
            Self::OpenRouter => "openai/gpt-4o-mini",
            Self::Local => "llama3.1",
        }
    }
}

/// Everything needed to construct a backend
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    /// Overrides the provider's endpoint (required for `Local`)
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl BackendSettings {
    pub fn new(provider: Provider, api_key: &str) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: api_key.to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: 1000,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone)]
pub struct OpenAIBackendConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for OpenRouter, local servers, etc.)
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Max tokens
    pub max_tokens: u32,
}

impl Default for OpenAIBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 1000,
        }
    }
}

impl OpenAIBackendConfig {
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn openrouter(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: Some("https://openrouter.ai/api/v1".to_string()),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn local(base_url: &str, model: &str) -> Self {
        Self {
            api_key: "sk-local".to_string(),
            base_url: Some(base_url.to_string()),
            model: model.to_string(),
            ..Default::default()
        }
    }
}

/// OpenAI-compatible LLM backend
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    config: OpenAIBackendConfig,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIBackendConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Config("missing API key".to_string()));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let client = Client::with_config(openai_config);

        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| LlmError::Api(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| LlmError::Api(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Anthropic Claude backend configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key
    pub api_key: String,
    /// Model name (e.g., claude-3-5-haiku-20241022)
    pub model: String,
    /// Max tokens
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl AnthropicConfig {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Anthropic Claude backend
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Config("missing API key".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system,
            "messages": [
                {"role": "user", "content": user}
            ]
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("Anthropic API error {}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        json["content"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|block| block["text"].as_str())
            .map(|s| s.to_string())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Thread-safe reference to an LLM backend
pub type SharedBackend = Arc<dyn LlmBackend>;

/// Create a shared OpenAI-compatible backend
pub fn create_backend(config: OpenAIBackendConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(OpenAIBackend::new(config)?))
}

/// Create a shared Anthropic backend
pub fn create_anthropic_backend(config: AnthropicConfig) -> Result<SharedBackend, LlmError> {
    Ok(Arc::new(AnthropicBackend::new(config)?))
}

/// Create the backend selected by `settings`
pub fn backend_from_settings(settings: &BackendSettings) -> Result<SharedBackend, LlmError> {
    match settings.provider {
        Provider::Anthropic => create_anthropic_backend(AnthropicConfig {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            request_timeout: settings.request_timeout,
        }),
        provider => {
            let mut config = match provider {
                Provider::OpenRouter => OpenAIBackendConfig::openrouter(&settings.api_key, &settings.model),
                Provider::Local => {
                    let base_url = settings
                        .base_url
                        .as_deref()
                        .ok_or_else(|| LlmError::Config("local provider needs a base URL".to_string()))?;
                    OpenAIBackendConfig::local(base_url, &settings.model)
                }
                _ => OpenAIBackendConfig::openai(&settings.api_key, &settings.model),
            };
            if let Some(base_url) = &settings.base_url {
                config.base_url = Some(base_url.clone());
            }
            config.temperature = settings.temperature;
            config.max_tokens = settings.max_tokens;
            create_backend(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("Anthropic"), Some(Provider::Anthropic));
        assert_eq!(Provider::parse("openrouter"), Some(Provider::OpenRouter));
        assert_eq!(Provider::parse("none"), None);
    }

    #[test]
    fn test_missing_key_rejected() {
        let settings = BackendSettings::new(Provider::Anthropic, "");
        assert!(matches!(backend_from_settings(&settings), Err(LlmError::Config(_))));

        let settings = BackendSettings::new(Provider::OpenAI, "");
        assert!(matches!(backend_from_settings(&settings), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_local_requires_base_url() {
        let settings = BackendSettings::new(Provider::Local, "");
        assert!(matches!(backend_from_settings(&settings), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_local_with_base_url_needs_no_key() {
        let mut settings = BackendSettings::new(Provider::Local, "");
        settings.base_url = Some("http://localhost:11434/v1".to_string());
        let backend = backend_from_settings(&settings).unwrap();
        assert_eq!(backend.model_name(), "llama3.1");
    }

    #[test]
    fn test_settings_select_model() {
        let settings = BackendSettings::new(Provider::OpenRouter, "sk-or-test").with_model("anthropic/claude-3.5-haiku");
        let backend = backend_from_settings(&settings).unwrap();
        assert_eq!(backend.model_name(), "anthropic/claude-3.5-haiku");
    }
}
