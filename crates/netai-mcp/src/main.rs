use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;

use netai_core::{guidelines::GUIDELINES, repair, AiSettings, DiagramRequest};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SanitizeDiagramRequest {
    /// Raw Mermaid flowchart source, e.g. a model completion
    mermaid: String,
}

// --- Server ---

#[derive(Clone)]
pub struct NetaiServer {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl NetaiServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Generate a Mermaid flowchart for a network architecture. Takes free-text requirements, optional context and an ordered list of constraints. Returns JSON {mermaid, summary}; the Mermaid source is already repaired (unique node ids, no port syntax, brackets and subgraphs balanced)."
    )]
    async fn generate_diagram(
        &self,
        Parameters(req): Parameters<DiagramRequest>,
    ) -> Result<CallToolResult, McpError> {
        let settings = match netai_core::load_settings() {
            Ok(s) => s,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to load settings: {}",
                    e
                ))]))
            }
        };

        match netai_agent::generate_diagram(&req, &settings).await {
            Ok(response) => {
                let json = serde_json::to_string_pretty(&response)
                    .unwrap_or_else(|e| format!("Serialization error: {}", e));
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[tool(
        description = "Repair Mermaid flowchart source without calling a model: renames duplicate node ids, strips port suffixes (A:eth0) and -->|label|> arrows, drops a truncated last line and closes open subgraphs."
    )]
    fn sanitize_diagram(
        &self,
        Parameters(req): Parameters<SanitizeDiagramRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            repair::sanitize(&req.mermaid),
        )]))
    }

    #[tool(description = "Report server health, a UTC timestamp and whether an LLM provider is configured")]
    fn health(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            health_report().to_string(),
        )]))
    }

    #[tool(description = "Get the guidelines generated network diagrams follow")]
    fn get_guidelines(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(GUIDELINES)]))
    }
}

#[tool_handler]
impl ServerHandler for NetaiServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!("{}\n\n## Diagram Guidelines\n{}", INSTRUCTIONS, GUIDELINES);
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn health_report() -> serde_json::Value {
    let configured = netai_core::load_settings()
        .map(|s| netai_core::ai_configured(&s))
        .unwrap_or(false);
    serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "llmConfigured": configured,
    })
}

const INSTRUCTIONS: &str = r#"netai is a network architecture diagramming assistant. It turns a description of a network into a Mermaid flowchart.

## Tools
- `generate_diagram`: send requirements (required), context and constraints (optional). The configured LLM drafts the diagram and the result is repaired before it is returned.
- `sanitize_diagram`: repair Mermaid you already have. Use it on hand-written or model-written flowcharts before rendering.
- `health`: liveness check.
- `get_guidelines`: the conventions generated diagrams follow.

## Provider settings
Read from ~/.netai/settings.json. Values in ./.env, then the process environment, override it: LLM_PROVIDER, LLM_MODEL, LLM_API_BASE, LLM_API_KEY, GROQ_API_KEY, TEMPERATURE, MAX_TOKENS and LLM_TIMEOUT_SECS. Configuration problems are reported as tool errors; nothing is retried."#;

// --- CLI ---

#[derive(Debug, Parser)]
#[command(name = "netai-mcp", version, about = "Network architecture diagrams as Mermaid")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Repair Mermaid source from FILE (or stdin) and print it
    Sanitize { file: Option<PathBuf> },
    /// Generate a diagram with the configured provider and print the JSON response
    Generate {
        #[arg(long)]
        requirements: String,
        #[arg(long)]
        context: Option<String>,
        /// Repeat for several constraints; order is kept
        #[arg(long = "constraint")]
        constraints: Vec<String>,
    },
    /// Update ~/.netai/settings.json
    Configure(ConfigureArgs),
}

#[derive(Debug, Default, clap::Args)]
struct ConfigureArgs {
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// Empty keeps the stored key
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    api_base: Option<String>,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    max_tokens: Option<u32>,
    /// HTTP timeout for provider calls, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ConfigureArgs {
    fn apply(self, settings: &mut AiSettings) {
        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(key) = self.api_key.filter(|k| !k.is_empty()) {
            settings.api_key = key;
        }
        if let Some(base) = self.api_base {
            settings.api_base = base;
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.timeout_secs = timeout_secs;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Sanitize { file } => {
            let raw = read_input(file.as_ref())?;
            println!("{}", repair::sanitize(&raw));
            Ok(())
        }
        Command::Generate {
            requirements,
            context,
            constraints,
        } => {
            let request = DiagramRequest {
                requirements,
                context,
                constraints,
            };
            let settings = netai_core::load_settings()?;
            let response = netai_agent::generate_diagram(&request, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Configure(args) => {
            let path = netai_core::settings_path();
            let mut settings = netai_core::read_settings_file(&path)?;
            args.apply(&mut settings);
            netai_core::write_settings_file(&path, &settings)?;
            eprintln!(
                "Wrote {} ({} / {})",
                path.display(),
                settings.provider,
                settings.model
            );
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let service = NetaiServer::new()
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["netai-mcp"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn generate_keeps_constraint_order() {
        let cli = Cli::try_parse_from([
            "netai-mcp",
            "generate",
            "--requirements",
            "HQ plus two branches",
            "--constraint",
            "redundant WAN",
            "--constraint",
            "no internet breakout at branches",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Generate {
                requirements,
                context,
                constraints,
            }) => {
                assert_eq!(requirements, "HQ plus two branches");
                assert_eq!(context, None);
                assert_eq!(
                    constraints,
                    vec!["redundant WAN", "no internet breakout at branches"]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn generate_requires_requirements() {
        assert!(Cli::try_parse_from(["netai-mcp", "generate"]).is_err());
    }

    #[test]
    fn configure_keeps_key_when_empty() {
        let mut settings = AiSettings {
            api_key: "gsk-old".into(),
            ..AiSettings::default()
        };
        ConfigureArgs {
            model: Some("llama-3.3-70b-versatile".into()),
            api_key: Some(String::new()),
            ..ConfigureArgs::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.api_key, "gsk-old");
        assert_eq!(settings.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.provider, "groq");
    }

    #[test]
    fn configure_sets_timeout() {
        let cli = Cli::try_parse_from(["netai-mcp", "configure", "--timeout-secs", "120"]).unwrap();
        let Some(Command::Configure(args)) = cli.command else {
            panic!("expected configure");
        };
        let mut settings = AiSettings::default();
        args.apply(&mut settings);
        assert_eq!(settings.timeout_secs, 120);
        assert_eq!(settings.max_tokens, 1200);
    }

    #[test]
    fn health_report_is_healthy() {
        let report = health_report();
        assert_eq!(report["status"], "healthy");
        let ts = report["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.mmd");
        std::fs::write(&path, "A[x]\nA[y]").unwrap();
        let raw = read_input(Some(&path)).unwrap();
        assert_eq!(repair::sanitize(&raw), "A[x]\nA_2[y]");
    }

    #[test]
    fn missing_input_file_names_path() {
        let err = read_input(Some(&PathBuf::from("/nonexistent/net.mmd"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/net.mmd"));
    }
}
