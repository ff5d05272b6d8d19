pub mod engine;
mod error;
mod prompt;

pub use engine::{backend_from_settings, LlmBackend};
pub use error::AgentError;
pub use prompt::{system_prompt, user_message};

use netai_core::{repair, AiSettings, DiagramRequest, DiagramResponse};

pub const SUMMARY: &str = "Generated a network architecture diagram with industry-standard layers \
based on the provided requirements.";

/// Prompt -> one completion -> repaired Mermaid.
pub struct DiagramAgent {
    backend: Box<dyn LlmBackend>,
}

impl DiagramAgent {
    pub fn new(backend: Box<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub fn from_settings(settings: &AiSettings) -> Result<Self, AgentError> {
        Ok(Self::new(backend_from_settings(settings)?))
    }

    pub async fn generate(&self, request: &DiagramRequest) -> Result<DiagramResponse, AgentError> {
        if !request.has_requirements() {
            return Err(AgentError::InvalidRequest(
                "requirements must not be empty".to_string(),
            ));
        }

        let system = system_prompt();
        let user_msg = user_message(request);

        tracing::info!(backend = %self.backend.describe(), "requesting diagram");

        let raw = self
            .backend
            .generate(&system, &user_msg)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "generate failed"))?;
        tracing::debug!(raw = %raw, "raw LLM output");

        let mermaid = repair::sanitize(&raw);
        tracing::debug!(
            raw_lines = raw.lines().count(),
            lines = mermaid.lines().count(),
            "sanitized diagram"
        );

        Ok(DiagramResponse {
            mermaid,
            summary: SUMMARY.to_string(),
        })
    }
}

/// Build a backend from `settings` and generate one diagram.
pub async fn generate_diagram(
    request: &DiagramRequest,
    settings: &AiSettings,
) -> Result<DiagramResponse, AgentError> {
    DiagramAgent::from_settings(settings)?.generate(request).await
}
