//! # Document Drifter CLI (`drifter`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `drifter init` | Create the history database |
//! | `drifter generate <url>` | Clone, scan, and generate a README |
//! | `drifter history` | List generated documents, newest first |
//! | `drifter history show <id>` | Print one stored document |
//! | `drifter scan <path>` | Show what the walker would send, without a model |
//!
//! ## Examples
//!
//! ```bash
//! drifter init --config ./config/drifter.toml
//! drifter generate https://github.com/user/repo --output README.md
//! drifter history --json --limit 5
//! drifter scan . --json
//! ```

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use document_drifter::clone::GitCloneSource;
use document_drifter::config::{self, Config};
use document_drifter::generate::create_generator;
use document_drifter::history::HistoryStore;
use document_drifter::models::RecordId;
use document_drifter::pipeline::{Pipeline, SaveOutcome};
use document_drifter::snapshot;

/// Document Drifter: generate a README for any public Git repository.
#[derive(Parser)]
#[command(
    name = "drifter",
    about = "Document Drifter: generate a README.md for a Git repository with an LLM",
    version,
    long_about = "Document Drifter clones a repository into a temporary directory, collects a \
    snapshot of its text files, asks a language model to write a README from that snapshot, \
    and keeps every generated document in a local SQLite history."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace). `RUST_LOG` wins if set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the history database.
    ///
    /// Idempotent; existing history is kept.
    Init,

    /// Generate a README for a repository.
    ///
    /// The document goes to stdout unless `--output` is given.
    Generate {
        /// Repository URL (anything `git clone` accepts).
        url: String,

        /// Write the document to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API key for the generation provider. Defaults to the variable
        /// named by `generation.api_key_env`.
        #[arg(long, env = "DRIFTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Do not record the result in history.
        #[arg(long)]
        no_save: bool,
    },

    /// List generated documents, newest first.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// Print records as JSON, including full documents.
        #[arg(long)]
        json: bool,

        /// Show at most this many records.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Scan a local directory and print the snapshot summary.
    Scan {
        /// Directory to scan.
        path: PathBuf,

        /// Print the serialized snapshot, cut to the snapshot budget.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print one stored document.
    Show {
        /// Record id.
        id: RecordId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Init => {
            let store = HistoryStore::open(&cfg.db.path).await?;
            store.initialize().await?;
            println!(
                "History database initialized at {}",
                store.path().display()
            );
            store.close().await;
        }
        Commands::Generate {
            url,
            output,
            api_key,
            no_save,
        } => {
            run_generate(&cfg, &url, output.as_deref(), api_key, no_save).await?;
        }
        Commands::History {
            action,
            json,
            limit,
        } => {
            let store = HistoryStore::open(&cfg.db.path).await?;
            store.initialize().await?;
            match action {
                Some(HistoryAction::Show { id }) => match store.get(id).await? {
                    Some(record) => println!("{}", record.artifact),
                    None => bail!("No history record with id {}", id),
                },
                None => print_history(&store, json, limit).await?,
            }
            store.close().await;
        }
        Commands::Scan { path, json } => {
            let snapshot = snapshot::scan(&path, &cfg.scan)?;
            if json {
                println!(
                    "{}",
                    snapshot::to_budgeted_json(&snapshot, cfg.scan.max_snapshot_chars)
                );
            } else {
                for (file, content) in snapshot.iter() {
                    println!("{:>8}  {}", content.chars().count(), file);
                }
                println!(
                    "{} files, {} chars",
                    snapshot.len(),
                    snapshot.total_chars()
                );
            }
        }
    }

    Ok(())
}

async fn run_generate(
    cfg: &Config,
    url: &str,
    output: Option<&Path>,
    api_key: Option<String>,
    no_save: bool,
) -> Result<()> {
    if !cfg.generation.is_enabled() {
        bail!("Generation provider is disabled; set generation.provider to gemini or openai");
    }
    let generator = create_generator(&cfg.generation, api_key)?;
    let source = GitCloneSource::new(cfg.clone.clone());
    let mut pipeline = Pipeline::new(cfg.scan.clone(), Box::new(source), generator);

    if !no_save {
        match open_history(&cfg.db.path).await {
            Ok(store) => pipeline = pipeline.with_store(store),
            Err(e) => warn!("history disabled for this run: {}", e),
        }
    }

    let generated = pipeline.run(url).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &generated.artifact)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("README written to {}", path.display());
        }
        None => println!("{}", generated.artifact),
    }

    match &generated.saved {
        SaveOutcome::Saved(id) => eprintln!("Saved to history as #{}", id),
        SaveOutcome::Failed(e) => eprintln!("Warning: could not save to history: {}", e),
        SaveOutcome::Skipped => {}
    }

    Ok(())
}

async fn open_history(path: &Path) -> document_drifter::Result<HistoryStore> {
    let store = HistoryStore::open(path).await?;
    store.initialize().await?;
    Ok(store)
}

async fn print_history(store: &HistoryStore, json: bool, limit: Option<usize>) -> Result<()> {
    let mut records = store.list_all().await?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No history yet.");
        return Ok(());
    }

    for record in &records {
        println!(
            "#{:<5} {}  {}  ({} chars)",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.source_identifier,
            record.artifact.chars().count()
        );
    }
    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "document_drifter=info,drifter=info",
        1 => "document_drifter=debug,drifter=debug",
        _ => "document_drifter=trace,drifter=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
