use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use reasoning_pipeline::domain::executor::Executor;
use reasoning_pipeline::domain::pipeline::grid::launcher::{run_launcher, LaunchConfig};
use reasoning_pipeline::domain::plugin::{PluginRegistry, StaticTypeLookup};
use reasoning_pipeline::domain::utils::id::PathId;
use reasoning_pipeline::{compile_workflow_file, logger};

#[derive(Parser)]
#[command(name = "reasoning-pipeline", about = "Plugin-pipeline orchestrator for the distributed reasoning platform")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a workflow description, drive a query through one of its
    /// paths and print the first result batch.
    Run {
        /// Workflow description JSON file
        description: String,

        /// Query text injected into the path
        #[arg(long)]
        query: String,

        /// Path id to execute; defaults to the workflow's only path
        #[arg(long)]
        path: Option<String>,
    },

    /// Remote launcher entry point. Reads the staged job environment,
    /// runs the target plugin and writes the staged output file.
    Launch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { description, query, path } => run_workflow(&description, &query, path).await,
        Command::Launch => launch().await,
    }
}

async fn run_workflow(description: &str, query: &str, path: Option<String>) -> anyhow::Result<()> {
    let registry = PluginRegistry::with_builtins();
    let type_lookup = Arc::new(StaticTypeLookup::from_registry(&registry));

    let executor = Executor::new(registry).with_type_lookup(type_lookup);

    let graph = compile_workflow_file(description)?;
    let handle = executor.start(&graph)?;

    let path_id = match path {
        Some(path) => PathId::new(path),
        None => {
            let mut path_ids = handle.path_ids();
            match (path_ids.pop(), path_ids.is_empty()) {
                (Some(only), true) => only.clone(),
                _ => bail!("workflow has more than one path; select one with --path"),
            }
        }
    };

    handle.execute(query, &path_id).context("query injection failed")?;

    let results = handle.next_results(&path_id).await?;
    println!("Received {} result triples on path '{}':", results.len(), path_id);
    for triple in results.iter() {
        println!("  {}", triple);
    }

    handle.terminate().await;
    Ok(())
}

async fn launch() -> anyhow::Result<()> {
    let config = LaunchConfig::from_env().context("invalid launcher environment")?;
    let registry = PluginRegistry::with_builtins();

    run_launcher(&config, &registry).await?;
    Ok(())
}
