use std::time::Duration;

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use serde::{Deserialize, Serialize};

use netai_core::{AiSettings, ConfigError};

use crate::AgentError;

/// A chat model that turns a system + user instruction into one completion.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String, AgentError>;

    /// Short "provider (model)" label for logs.
    fn describe(&self) -> String;
}

/// Pick a backend for the configured provider. Missing credentials fail here,
/// before any request is sent.
pub fn backend_from_settings(settings: &AiSettings) -> Result<Box<dyn LlmBackend>, AgentError> {
    let provider = settings.provider_name();
    match provider.as_str() {
        "openai_compatible" | "openai-compatible" => {
            Ok(Box::new(OpenAiCompatibleBackend::new(settings)?))
        }
        "openai" if !settings.api_base.trim().is_empty() => {
            Ok(Box::new(OpenAiCompatibleBackend::new(settings)?))
        }
        _ => Ok(Box::new(ChatBackend::new(settings)?)),
    }
}

fn map_backend(provider: &str) -> Result<LLMBackend, ConfigError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(ConfigError::UnknownProvider(other.to_string())),
    }
}

fn key_variable(provider: &str) -> &'static str {
    match provider {
        "groq" => "GROQ_API_KEY",
        _ => "LLM_API_KEY",
    }
}

/// Trimmed completion text. A missing completion is an empty diagram, not an error.
fn completion_text(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}

// --- llm crate providers ---

/// Hosted providers reached through the `llm` crate.
pub struct ChatBackend {
    provider: String,
    model: String,
    api_key: String,
    base_url: Option<String>,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl ChatBackend {
    pub fn new(settings: &AiSettings) -> Result<Self, ConfigError> {
        let provider = settings.provider_name();
        map_backend(&provider)?;

        if provider != "ollama" && settings.api_key.is_empty() {
            return Err(ConfigError::MissingSetting {
                name: key_variable(&provider),
                provider,
            });
        }

        let base = settings.api_base.trim();
        Ok(Self {
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            base_url: (!base.is_empty()).then(|| base.to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout_secs: settings.timeout_secs,
            provider,
        })
    }
}

#[async_trait]
impl LlmBackend for ChatBackend {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String, AgentError> {
        let backend = map_backend(&self.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&self.model)
            .system(system)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .timeout_seconds(self.timeout_secs);

        if !self.api_key.is_empty() {
            builder = builder.api_key(&self.api_key);
        }
        if let Some(base) = &self.base_url {
            builder = builder.base_url(base);
        }

        let llm = builder.build().map_err(|e| AgentError::Build(e.to_string()))?;

        let messages = vec![ChatMessage::user().content(user_msg).build()];

        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| AgentError::Request(e.to_string()))?;

        Ok(completion_text(response.text()))
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.provider, self.model)
    }
}

// --- OpenAI-compatible HTTP endpoint ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [WireMessage<'a>; 2],
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Any server speaking the `/v1/chat/completions` protocol (vLLM, LM Studio, gateways).
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleBackend {
    pub fn new(settings: &AiSettings) -> Result<Self, AgentError> {
        let provider = settings.provider_name();
        let base = settings.api_base.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ConfigError::MissingSetting {
                name: "LLM_API_BASE",
                provider,
            }
            .into());
        }
        if settings.api_key.is_empty() {
            return Err(ConfigError::MissingSetting {
                name: "LLM_API_KEY",
                provider,
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AgentError::Build(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{base}/v1/chat/completions"),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String, AgentError> {
        let payload = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: [
                WireMessage {
                    role: "system",
                    content: system,
                },
                WireMessage {
                    role: "user",
                    content: user_msg,
                },
            ],
        };

        let completion: ChatCompletion = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(completion_text(
            completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
        ))
    }

    fn describe(&self) -> String {
        format!("openai-compatible ({})", self.model)
    }
}
