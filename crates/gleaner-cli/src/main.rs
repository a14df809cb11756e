//! gleaner - developer CLI for node output garbage collection.
//!
//! Runs against a JSON metadata snapshot and the local filesystem.
//!
//! ```bash
//! # Show what a pass would delete
//! gleaner plan --snapshot store.json --node trainer.json --pipeline my-pipeline
//!
//! # Run a pass and persist the new artifact states
//! gleaner collect --snapshot store.json --node trainer.json --pipeline my-pipeline --write
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); reports go to stdout as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gleaner_core::app::{BuildError, CollectorBuilder, NodeGarbageCollector};
use gleaner_core::domain::{GcError, NodeSpec, NodeUid};
use gleaner_core::impls::{InMemoryMetadataStore, LocalFilesystem, Snapshot};
use gleaner_core::ports::StoreError;

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(about = "Garbage-collect pipeline node output artifacts")]
struct Cli {
    /// Default log level to debug (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the artifacts a pass would delete
    Plan(Target),

    /// Run one pass and print its outcome
    Collect {
        #[command(flatten)]
        target: Target,

        /// Write the updated snapshot back to --snapshot
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args)]
struct Target {
    /// Metadata snapshot (artifacts, executions, events)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Node spec with per-output garbage collection policies
    #[arg(short, long)]
    node: PathBuf,

    /// Pipeline the node belongs to
    #[arg(short, long)]
    pipeline: String,

    /// Node id to collect for (defaults to the id declared in --node)
    #[arg(long)]
    node_id: Option<String>,

    /// Directory relative artifact uris resolve against
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Gc(#[from] GcError),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

struct Loaded {
    store: Arc<InMemoryMetadataStore>,
    collector: NodeGarbageCollector,
    node_uid: NodeUid,
    node: NodeSpec,
}

async fn load(target: &Target) -> Result<Loaded, CliError> {
    let snapshot: Snapshot = read_json(&target.snapshot).await?;
    let node: NodeSpec = read_json(&target.node).await?;
    info!(
        artifacts = snapshot.artifacts.len(),
        executions = snapshot.executions.len(),
        events = snapshot.events.len(),
        "snapshot loaded"
    );

    let store = Arc::new(InMemoryMetadataStore::from_snapshot(snapshot)?);
    let filesystem = match &target.root {
        Some(root) => LocalFilesystem::with_root(root),
        None => LocalFilesystem::new(),
    };
    let collector = CollectorBuilder::new()
        .store(store.clone())
        .filesystem(Arc::new(filesystem))
        .build()?;

    let node_id = target.node_id.clone().unwrap_or_else(|| node.id.clone());
    let node_uid = NodeUid::new(target.pipeline.clone(), node_id);
    Ok(Loaded {
        store,
        collector,
        node_uid,
        node,
    })
}

/// An aborted pass exits non-zero even though the report is printed.
async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Commands::Plan(target) => {
            let loaded = load(&target).await?;
            let candidates = loaded.collector.plan(&loaded.node_uid, &loaded.node).await?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Collect { target, write } => {
            let loaded = load(&target).await?;
            let outcome = loaded.collector.run(&loaded.node_uid, &loaded.node).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            if write {
                let snapshot = loaded.store.snapshot().await;
                let bytes = serde_json::to_vec_pretty(&snapshot)?;
                tokio::fs::write(&target.snapshot, bytes)
                    .await
                    .map_err(|source| CliError::Write {
                        path: target.snapshot.clone(),
                        source,
                    })?;
                info!(path = %target.snapshot.display(), "snapshot written");
            }

            if outcome.is_aborted() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "gleaner failed");
            ExitCode::FAILURE
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
    fn collect_parses_write_flag() {
        let cli = Cli::try_parse_from([
            "gleaner", "collect", "--snapshot", "s.json", "--node", "n.json", "--pipeline", "p",
            "--write",
        ])
        .unwrap();
        match cli.command {
            Commands::Collect { target, write } => {
                assert!(write);
                assert_eq!(target.pipeline, "p");
                assert_eq!(target.node_id, None);
            }
            Commands::Plan(_) => panic!("expected collect"),
        }
    }
}
