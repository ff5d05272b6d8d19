use std::path::PathBuf;

/// Failures while loading settings or constructing an LLM backend.
///
/// These are raised before any request reaches a provider and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported LLM provider: {0}")]
    UnknownProvider(String),

    #[error("{name} is required for the {provider} provider")]
    MissingSetting {
        name: &'static str,
        provider: String,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid .env file {}: {source}", path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Invalid settings JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
