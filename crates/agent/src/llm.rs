use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quoteline_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorMode {
    Live,
    Deterministic,
}

impl GeneratorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Deterministic => "deterministic",
        }
    }
}

/// System role, task instruction and structured context for one completion.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub instruction: String,
    pub context: Value,
    pub format: ResponseFormat,
}

impl GenerationRequest {
    pub fn user_prompt(&self) -> String {
        let context = serde_json::to_string_pretty(&self.context)
            .unwrap_or_else(|_| self.context.to_string());
        format!("{}\n\nContext:\n{context}", self.instruction)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("text generation is not configured")]
    NotConfigured,
    #[error("text generation transport failed: {0}")]
    Transport(String),
    #[error("text generation returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("text generation returned no content")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn mode(&self) -> GeneratorMode;

    /// Exactly one attempt; callers decide how to degrade on error.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Stands in when no assistant is configured. Every call reports
/// `NotConfigured` so callers take their deterministic path.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicTextGenerator;

#[async_trait]
impl TextGenerator for DeterministicTextGenerator {
    fn mode(&self) -> GeneratorMode {
        GeneratorMode::Deterministic
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

/// OpenAI-compatible `chat/completions` client (OpenAI or Ollama's `/v1`).
#[derive(Clone)]
pub struct LiveTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
}

impl LiveTextGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let base_url = config.base_url.as_deref().ok_or(GenerationError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GenerationError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": &request.system},
                {"role": "user", "content": request.user_prompt()}
            ],
            "temperature": self.temperature
        });
        if request.format == ResponseFormat::JsonObject {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[async_trait]
impl TextGenerator for LiveTextGenerator {
    fn mode(&self) -> GeneratorMode {
        GeneratorMode::Live
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut http_request = self.client.post(&self.endpoint).json(&self.request_body(request));
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        let response = http_request
            .send()
            .await
            .map_err(|error| GenerationError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status: status.as_u16(), body });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|error| GenerationError::Transport(error.to_string()))?;
        debug!(
            event_name = "llm.completion.received",
            model = %self.model,
            choices = completion.choices.len(),
            "completion received"
        );

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Picks the generator once, at construction time.
pub fn generator_from_config(config: &LlmConfig) -> Arc<dyn TextGenerator> {
    if !config.is_configured() {
        return Arc::new(DeterministicTextGenerator);
    }

    match LiveTextGenerator::new(config) {
        Ok(generator) => Arc::new(generator),
        Err(error) => {
            warn!(
                event_name = "llm.client.init_failed",
                error = %error,
                "could not build live text generator; using deterministic generator"
            );
            Arc::new(DeterministicTextGenerator)
        }
    }
}

#[cfg(test)]
mod tests {
    use quoteline_core::config::AppConfig;
    use serde_json::json;

    use super::{
        generator_from_config, DeterministicTextGenerator, GenerationError, GenerationRequest,
        GeneratorMode, LiveTextGenerator, ResponseFormat, TextGenerator,
    };

    fn request(format: ResponseFormat) -> GenerationRequest {
        GenerationRequest {
            system: "system role".to_owned(),
            instruction: "do the task".to_owned(),
            context: json!({"items": [{"code": "A"}]}),
            format,
        }
    }

    #[tokio::test]
    async fn deterministic_generator_reports_not_configured() {
        let result = DeterministicTextGenerator.generate(&request(ResponseFormat::Text)).await;
        assert_eq!(result, Err(GenerationError::NotConfigured));
    }

    #[test]
    fn unconfigured_llm_selects_deterministic_generator() {
        let config = AppConfig::default();
        assert_eq!(generator_from_config(&config.llm).mode(), GeneratorMode::Deterministic);
    }

    #[test]
    fn configured_llm_selects_live_generator() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-test".to_owned().into());
        assert_eq!(generator_from_config(&config.llm).mode(), GeneratorMode::Live);
    }

    #[test]
    fn live_request_body_carries_roles_and_json_mode() {
        let mut config = AppConfig::default();
        config.llm.base_url = Some("http://localhost:11434/v1/".to_owned());
        let generator = LiveTextGenerator::new(&config.llm).expect("client builds");

        assert_eq!(generator.endpoint(), "http://localhost:11434/v1/chat/completions");

        let body = generator.request_body(&request(ResponseFormat::JsonObject));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .map(|content| content.contains("do the task") && content.contains("\"code\": \"A\""))
            .unwrap_or(false));
        assert_eq!(body["response_format"]["type"], "json_object");

        let text_body = generator.request_body(&request(ResponseFormat::Text));
        assert!(text_body.get("response_format").is_none());
    }
}
