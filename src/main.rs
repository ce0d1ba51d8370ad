use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autoflow_actions::ActionRegistry;
use autoflow_core::config::{dirs_home, AppConfig};
use autoflow_core::types::{NodeExecutionState, NodeProgress};
use autoflow_engine::{JsonlRecordStore, RunRequest, Workflow, WorkflowExecutor, WorkflowGraph};

#[derive(Parser)]
#[command(name = "autoflow", version, about = "Run automation workflows from the command line")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "autoflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow and print per-node progress
    Run {
        /// Workflow JSON file
        workflow: PathBuf,
        /// Trigger node to start from (default: every manual trigger)
        #[arg(long)]
        trigger: Option<String>,
        /// Trigger payload entry, as key=value (repeatable)
        #[arg(long = "extra", value_parser = parse_extra)]
        extras: Vec<(String, String)>,
    },
    /// Check a workflow for configuration errors without running it
    Validate {
        /// Workflow JSON file
        workflow: PathBuf,
    },
    /// List built-in actions
    Actions,
    /// Show recorded runs of a workflow
    History {
        /// Workflow id
        workflow_id: String,
        /// Show at most this many of the latest runs
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Show current configuration
    Config,
}

fn parse_extra(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autoflow=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            workflow,
            trigger,
            extras,
        } => {
            let success = run_workflow(&config, &workflow, trigger, extras).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Validate { workflow } => {
            let wf = read_workflow(&workflow)?;
            let graph = WorkflowGraph::build(&wf)?;
            println!(
                "Workflow '{}' is valid: {} node(s), {} trigger(s)",
                wf.name,
                graph.len(),
                graph.triggers().len()
            );
            if !wf.enabled {
                println!("Note: workflow is disabled");
            }
        }
        Commands::Actions => {
            let registry = ActionRegistry::with_builtins();
            for def in registry.definitions() {
                println!("  {:<10} {}", def.name, def.description);
            }
        }
        Commands::History { workflow_id, limit } => {
            let store = JsonlRecordStore::new(config.record_dir());
            let records = store.load(&workflow_id).await?;
            if records.is_empty() {
                println!("No recorded runs for '{}'", workflow_id);
            }
            let skip = records.len().saturating_sub(limit);
            for record in records.iter().skip(skip) {
                println!(
                    "{}  {}  {:<7}  {}",
                    record.started_at.format("%Y-%m-%d %H:%M:%S"),
                    record.run_id,
                    if record.success { "ok" } else { "failed" },
                    record.message
                );
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Load the given config, falling back to ~/.autoflow/config.toml, then defaults.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        return Ok(AppConfig::load(path)?);
    }

    if let Some(home_config) = dirs_home().map(|h| h.join(".autoflow").join("config.toml")) {
        if home_config.exists() {
            info!(path = %home_config.display(), "Loading config from home directory");
            return Ok(AppConfig::load(&home_config)?);
        }
    }

    Ok(AppConfig::default())
}

fn read_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read workflow file {}", path.display()))?;
    Ok(Workflow::from_json(&json)?)
}

async fn run_workflow(
    config: &AppConfig,
    path: &Path,
    trigger: Option<String>,
    extras: Vec<(String, String)>,
) -> anyhow::Result<bool> {
    let workflow = read_workflow(path)?;
    if !workflow.enabled {
        warn!(workflow_id = %workflow.id, "Running a disabled workflow");
    }

    let registry =
        ActionRegistry::with_builtins().with_default_timeout(config.actions.default_timeout_secs);
    let mut executor =
        WorkflowExecutor::new(Arc::new(registry)).with_config(config.engine.clone());
    if config.log.enabled {
        executor = executor.with_record_sink(Arc::new(JsonlRecordStore::new(config.record_dir())));
    }

    let cancel = tokio_util::sync::CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Cancelling workflow run...");
        cancel_clone.cancel();
    });

    let mut request = RunRequest::new().with_cancel(cancel);
    request.trigger_node_id = trigger;
    request.trigger_extras = extras.into_iter().collect::<BTreeMap<_, _>>();

    let result = executor
        .execute(&workflow, request, |node_id, progress| match progress {
            NodeProgress::Running => println!("  ... {}", node_id),
            NodeProgress::Settled(state) => println!("  {:<7} {}", state.label(), node_id),
        })
        .await?;

    println!();
    for (node_id, state) in &result.node_results {
        match state {
            NodeExecutionState::Success { output } => println!("  ok      {}: {}", node_id, output),
            NodeExecutionState::Failed { error } => println!("  failed  {}: {}", node_id, error),
            NodeExecutionState::Skipped { reason } => println!("  skipped {}: {}", node_id, reason),
        }
    }
    println!("\n{}", result.message);

    Ok(result.success && !result.cancelled)
}
