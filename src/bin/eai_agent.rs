//! eai-agent CLI
//!
//! Runs one autonomous coding-agent task against a working directory.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eai_agent::agent::{
    AgentLoop, CancellationToken, FileStatePersister, LoopConfig, LoopOutcome, NoOpPersister, StatePersister, Task,
};
use eai_agent::config::Config;
use eai_agent::model::{ModelProvider, OpenRouterConfig as ProviderOpenRouterConfig, OpenRouterProvider};
use eai_agent::pathres::PathResolver;
use eai_agent::permission::{PermissionGate, PermissionMode};
use eai_agent::progress::{ProgressSink, TracingSink};
use eai_agent::redact::Redactor;
use eai_agent::tools::{canonical_registry, canonical_registry_dangerous, ToolEngine};
use eai_agent::{Error, Result, VERSION};
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(
    name = "eai-agent",
    author = "eai-agent Contributors",
    version = VERSION,
    about = "Autonomous coding-agent runtime",
    long_about = None
)]
struct Cli {
    /// The task instruction for the agent to carry out.
    instruction: String,

    /// Model id to request from the provider (defaults to the provider's configured default).
    #[arg(long)]
    model: Option<String>,

    /// Directory the agent is allowed to read and write within. Overrides working-directory
    /// resolution (EAI_WORKDIR, then /app if present, then the current directory).
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Directory persisted AgentState snapshots are written to, one `<task_id>.json` per run.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Upper bound on loop iterations before giving up without completion.
    #[arg(long, default_value_t = 50)]
    max_loops: u32,

    /// Run indefinitely instead of stopping at max-loops, hard-resetting on repeated no-action.
    #[arg(long)]
    relentless: bool,

    /// Allow tool calls outside the working directory and skip permission prompts entirely.
    #[arg(long)]
    dangerously_full_access: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("eai_agent=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mut app_config = Config::from_env().unwrap_or_default();
    if let Some(dir) = cli.workdir.clone() {
        app_config.agent.workspace = dir;
    }
    if let Some(dir) = cli.state_dir.clone() {
        app_config.agent.state_dir = Some(dir);
    }
    app_config.agent.max_loops = cli.max_loops;
    app_config.agent.relentless = cli.relentless;
    app_config.agent.dangerously_full_access = cli.dangerously_full_access;

    let workdir = app_config.agent.workspace.clone();
    tracing::info!(workdir = %workdir.display(), "resolved working directory");

    let mut provider_config = app_config.provider.openrouter.ok_or_else(|| {
        Error::Config("EAI_API_KEY or MINIMAX_API_KEY must be set".to_string())
    })?;
    if let Some(model) = cli.model {
        provider_config.default_model = model;
    }

    let mut redactor = Redactor::new([provider_config.api_key.expose_secret().to_string()]);
    if let Ok(sudo_password) = std::env::var("EAI_DESKTOP_SUDO_PASSWORD") {
        redactor.add(sudo_password);
    }

    let provider: Arc<dyn ModelProvider> = Arc::new(OpenRouterProvider::new(ProviderOpenRouterConfig {
        api_key: provider_config.api_key,
        base_url: provider_config.base_url,
        default_model: provider_config.default_model,
        site_url: provider_config.site_url,
        site_name: provider_config.site_name,
        timeout_secs: provider_config.timeout_secs,
    })?);

    let resolver = PathResolver::new(workdir.clone());
    let registry = if app_config.agent.dangerously_full_access {
        canonical_registry_dangerous(workdir.clone())
    } else {
        canonical_registry(workdir.clone())
    };
    let engine = ToolEngine::new(registry, resolver, redactor.clone());

    let mode = if app_config.agent.dangerously_full_access {
        PermissionMode::DangerouslyFullAccess
    } else {
        PermissionMode::FullAccess
    };
    let gate = PermissionGate::new(mode);

    let sink: Arc<dyn ProgressSink> = Arc::new(TracingSink);

    let persister: Arc<dyn StatePersister> = match app_config.agent.state_dir {
        Some(dir) => Arc::new(FileStatePersister::new(dir)),
        None => Arc::new(NoOpPersister),
    };

    let loop_config = LoopConfig {
        max_loops: app_config.agent.max_loops,
        relentless: app_config.agent.relentless,
        ..LoopConfig::default()
    };

    let agent_loop = AgentLoop::new(provider, engine, gate, sink, redactor, persister, loop_config);
    let cancel = CancellationToken::new();

    let task = Task::new(cli.instruction);
    let (state, outcome) = agent_loop.run(task, &cancel).await?;

    if let Some(output) = &state.final_output {
        println!("{output}");
    }

    match outcome {
        LoopOutcome::Completed => Ok(()),
        LoopOutcome::MaxIterationsExceeded => Err(Error::Internal("iteration cap reached without completion".to_string())),
        LoopOutcome::PermissionDenied => Err(Error::Permission("a required tool call was denied".to_string())),
        LoopOutcome::Cancelled => Err(Error::Internal("run was cancelled".to_string())),
        LoopOutcome::ModelConfigError => Err(Error::Config("model provider is misconfigured".to_string())),
    }
}
