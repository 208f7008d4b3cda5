use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hive_models::{HiveConfig, NullSink};
use hive_store::SqliteStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hive", about = "Consensus detection over the agent swarm's opinions")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/hive.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the consensus engine once and print the new events
    Analyze {
        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// List stored consensus events, newest first
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Only events for this token
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Recent opinions on a token with their authors
    Opinions {
        token: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: HiveConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    match cli.command {
        Command::Analyze { pretty } => {
            let (_store, engine) =
                hive::build_engine(&config, Arc::new(NullSink)).context("Failed to build engine")?;
            let report = hive::analyze(&engine)
                .await
                .map_err(|e| anyhow::anyhow!("Analysis failed: {e}"))?;
            for failure in &report.failures {
                tracing::warn!(token = %failure.token, error = %failure.error, "Token skipped");
            }
            let output = if pretty {
                serde_json::to_string_pretty(&report.events)?
            } else {
                serde_json::to_string(&report.events)?
            };
            println!("{output}");
        }
        Command::Events { limit, token } => {
            let store = open_store(&config)?;
            let events = store.list_events(limit, token.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::Opinions { token, limit } => {
            let store = open_store(&config)?;
            let opinions = store.recent_opinions_with_agents(&token.to_uppercase(), limit)?;
            println!("{}", serde_json::to_string_pretty(&opinions)?);
        }
    }

    Ok(())
}

fn open_store(config: &HiveConfig) -> Result<SqliteStore> {
    SqliteStore::open(&config.store.sqlite_path)
        .with_context(|| format!("Failed to open hive DB: {}", config.store.sqlite_path))
}
