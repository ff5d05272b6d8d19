pub mod error;
pub mod guidelines;
pub mod repair;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

// --- Request / response ---

/// A request to draw a network architecture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagramRequest {
    /// Free-text description of the network to design
    pub requirements: String,
    /// Optional background: existing sites, vendors, scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Ordered list of hard constraints, e.g. "dual-homed uplinks"
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl DiagramRequest {
    pub fn new(requirements: impl Into<String>) -> Self {
        Self {
            requirements: requirements.into(),
            context: None,
            constraints: Vec::new(),
        }
    }

    pub fn has_requirements(&self) -> bool {
        !self.requirements.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagramResponse {
    pub mermaid: String,
    pub summary: String,
}

// --- AI Settings ---

pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    /// Base URL for OpenAI-compatible endpoints, without the `/v1` suffix
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            api_base: String::new(),
            temperature: 0.2,
            max_tokens: 1200,
            timeout_secs: 60,
        }
    }
}

impl AiSettings {
    /// Normalized provider name (trimmed, lower-case).
    pub fn provider_name(&self) -> String {
        self.provider.trim().to_lowercase()
    }

    /// Overlay environment variables on top of these settings.
    ///
    /// `env` is injected so callers (and tests) control the source.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var("LLM_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.model = model;
        }
        if let Some(base) = var("LLM_API_BASE") {
            self.api_base = base;
        }
        let key = if self.provider_name() == "groq" {
            var("GROQ_API_KEY").or_else(|| var("LLM_API_KEY"))
        } else {
            var("LLM_API_KEY")
        };
        if let Some(key) = key {
            self.api_key = key;
        }
        if let Some(raw) = var("TEMPERATURE") {
            self.temperature = parse_value("TEMPERATURE", &raw)?;
        }
        if let Some(raw) = var("MAX_TOKENS") {
            self.max_tokens = parse_value("MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = var("LLM_TIMEOUT_SECS") {
            self.timeout_secs = parse_value("LLM_TIMEOUT_SECS", &raw)?;
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

// --- Storage ---

/// Resolve the global config directory (~/.netai/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".netai")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Read settings from `path`. A missing file yields defaults.
pub fn read_settings_file(path: &Path) -> Result<AiSettings, ConfigError> {
    if !path.exists() {
        return Ok(AiSettings::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `KEY=value` pairs from a dotenv file. A missing file yields no pairs.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let dotenv_error = |source: dotenvy::Error| ConfigError::Dotenv {
        path: path.to_path_buf(),
        source,
    };
    dotenvy::from_path_iter(path)
        .map_err(dotenv_error)?
        .map(|item| item.map_err(dotenv_error))
        .collect()
}

/// Settings file, then `.env` values, then `env`. Later sources win.
pub fn load_settings_from<F>(
    settings_file: &Path,
    dotenv_file: &Path,
    env: F,
) -> Result<AiSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = read_settings_file(settings_file)?;
    let dotenv = read_dotenv(dotenv_file)?;
    settings.apply_env(|name| env(name).or_else(|| dotenv.get(name).cloned()))?;
    Ok(settings)
}

/// Load `~/.netai/settings.json`, `./.env` and the process environment.
pub fn load_settings() -> Result<AiSettings, ConfigError> {
    load_settings_from(&settings_path(), Path::new(".env"), |name| {
        std::env::var(name).ok()
    })
}

pub fn write_settings_file(path: &Path, settings: &AiSettings) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    let provider = settings.provider_name();
    let needs_base = matches!(provider.as_str(), "openai_compatible" | "openai-compatible");
    !provider.is_empty()
        && !settings.model.trim().is_empty()
        && (provider == "ollama" || !settings.api_key.is_empty())
        && (!needs_base || !settings.api_base.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_groq_llama() {
        let s = AiSettings::default();
        assert_eq!(s.provider, "groq");
        assert_eq!(s.model, "llama-3.1-8b-instant");
        assert_eq!(s.max_tokens, 1200);
        assert!((s.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn groq_key_fills_api_key_for_groq() {
        let mut s = AiSettings::default();
        s.apply_env(env_from(&[("GROQ_API_KEY", "gsk-1")])).unwrap();
        assert_eq!(s.api_key, "gsk-1");
    }

    #[test]
    fn groq_key_wins_over_llm_api_key_for_groq() {
        let mut s = AiSettings::default();
        s.apply_env(env_from(&[("GROQ_API_KEY", "gsk-groq"), ("LLM_API_KEY", "sk-generic")]))
            .unwrap();
        assert_eq!(s.api_key, "gsk-groq");
    }

    #[test]
    fn llm_api_key_used_for_groq_without_groq_key() {
        let mut s = AiSettings::default();
        s.apply_env(env_from(&[("LLM_API_KEY", "sk-generic")])).unwrap();
        assert_eq!(s.api_key, "sk-generic");
    }

    #[test]
    fn groq_key_ignored_for_other_providers() {
        let mut s = AiSettings::default();
        s.apply_env(env_from(&[
            ("LLM_PROVIDER", "openai_compatible"),
            ("GROQ_API_KEY", "gsk-1"),
        ]))
        .unwrap();
        assert_eq!(s.provider, "openai_compatible");
        assert!(s.api_key.is_empty());
    }

    #[test]
    fn bad_number_is_invalid_value() {
        let mut s = AiSettings::default();
        let err = s
            .apply_env(env_from(&[("MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "MAX_TOKENS", .. }));
    }

    #[test]
    fn ollama_needs_no_key() {
        let s = AiSettings {
            provider: "Ollama ".into(),
            ..AiSettings::default()
        };
        assert!(ai_configured(&s));
        assert!(!ai_configured(&AiSettings::default()));
    }

    #[test]
    fn compatible_provider_needs_base_to_be_configured() {
        let mut s = AiSettings {
            provider: "openai_compatible".into(),
            api_key: "sk-local".into(),
            ..AiSettings::default()
        };
        assert!(!ai_configured(&s));
        s.api_base = "http://localhost:8000".into();
        assert!(ai_configured(&s));
    }

    #[test]
    fn request_requires_non_blank_requirements() {
        assert!(DiagramRequest::new("two sites, one DMZ").has_requirements());
        assert!(!DiagramRequest::new("   ").has_requirements());
    }

    #[test]
    fn request_defaults_constraints() {
        let req: DiagramRequest = serde_json::from_str(r#"{"requirements":"hq"}"#).unwrap();
        assert!(req.constraints.is_empty());
        assert_eq!(req.context, None);
    }
}
