//! `automation-run`: execute a persisted automation graph without an editor
//!
//! Loads the graph and an optional config file, seeds the registry with the
//! built-in modules, runs every trigger and prints a JSON summary of the
//! resulting context. Ctrl-C cancels the run; the partial summary is still
//! printed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use automation_engine::{
    AutomationConfig, CancellationToken, ConfigError, ContextKeys, EventError, EventSink,
    ExecutionContext, ExecutionEngine, ExecutionEvent, GraphModel, ModuleRegistry,
};
use automation_nodes::{DesktopHookError, DesktopHooks};
use clap::Parser;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Run an automation graph
#[derive(Parser, Debug)]
#[command(name = "automation-run")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the graph file (JSON)
    graph: PathBuf,

    /// Path to a config file; defaults apply when missing
    #[arg(long)]
    config: Option<PathBuf>,

    /// Test input for manual triggers (parsed as JSON when possible)
    #[arg(long)]
    input: Option<String>,

    /// Per-node timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Context collections to include in the summary
    #[arg(long = "collection", default_values_t = ["collected".to_string(), "merged".to_string()])]
    collections: Vec<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Failed to read graph file {path}: {source}")]
    ReadGraph {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load graph: {0}")]
    Graph(#[from] automation_engine::AutomationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hooks(#[from] DesktopHookError),

    #[error("Failed to render summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Logs execution events as they happen
struct LogEventSink;

impl EventSink<ExecutionEvent> for LogEventSink {
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError> {
        match &event {
            ExecutionEvent::NodeFailed { .. } | ExecutionEvent::TriggerSkipped { .. } => {
                log::warn!("{:?}", event)
            }
            _ => log::debug!("{:?}", event),
        }
        Ok(())
    }
}

fn parse_input(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn load_config(path: Option<&Path>) -> Result<AutomationConfig, CliError> {
    match path {
        Some(path) => Ok(AutomationConfig::load(path).await?),
        None => Ok(AutomationConfig::default()),
    }
}

async fn summarize(
    graph: &GraphModel,
    context: &ExecutionContext,
    collections: &[String],
) -> Result<Value, CliError> {
    let mut branches = Map::new();
    for trigger in graph.triggers() {
        let payloads = context.branch_payloads(&trigger.id).await;
        branches.insert(trigger.id.clone(), Value::Array(payloads));
    }

    let mut gathered = Map::new();
    for key in collections {
        let items = context.collection(key).await;
        if !items.is_empty() {
            gathered.insert(key.clone(), Value::Array(items));
        }
    }

    let diagnostics = serde_json::to_value(context.diagnostics().await)?;
    let execution_id = context
        .get_value(ContextKeys::EXECUTION_ID)
        .await
        .unwrap_or(Value::Null);

    Ok(json!({
        "executionId": execution_id,
        "branches": branches,
        "collections": gathered,
        "diagnostics": diagnostics,
    }))
}

async fn run(cli: Cli) -> Result<bool, CliError> {
    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.engine.node_timeout_ms = Some(timeout_ms);
    }

    let registry = Arc::new(ModuleRegistry::with_builtins());
    log::debug!("Registered {} built-in modules", registry.len());

    let json = tokio::fs::read_to_string(&cli.graph)
        .await
        .map_err(|source| CliError::ReadGraph {
            path: cli.graph.clone(),
            source,
        })?;
    let graph = GraphModel::from_json(registry.clone(), &json)?;
    log::info!(
        "Loaded {} ({} nodes, {} edges)",
        cli.graph.display(),
        graph.node_count(),
        graph.edge_count()
    );

    for error in graph.validate() {
        log::warn!("{}", error);
    }

    let hooks = Arc::new(DesktopHooks::new(config.hooks.clone())?);
    let engine = ExecutionEngine::new(hooks, config.engine.clone())
        .with_event_sink(Arc::new(LogEventSink));

    let context = ExecutionContext::new();
    if let Some(raw) = &cli.input {
        context.set(ContextKeys::TEST_INPUT, parse_input(raw)).await;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let context = engine
        .execute_with_cancel(&graph, &registry, context, cancel)
        .await;

    let summary = summarize(&graph, &context, &cli.collections).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(context.diagnostics().await.is_empty())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
