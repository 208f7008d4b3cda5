use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hive_daemon::config::DaemonConfig;
use hive_daemon::daemon::Daemon;
use hive_store::SqliteStore;

#[derive(Parser, Debug)]
#[command(
    name = "hive-daemon",
    about = "Hive daemon - runs consensus detection and the agent decision loops on their schedules"
)]
struct Cli {
    /// Path to daemon configuration file
    #[arg(short, long, default_value = "config/hive.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = DaemonConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config))?;

    let store = SqliteStore::open(&config.store.sqlite_path)
        .with_context(|| format!("Failed to open hive DB: {}", config.store.sqlite_path))?;

    if config.scheduler.agents_enabled
        && !config.agents.is_empty()
        && !hive_agents::claude_cli::check_cli_available(&config.oracle.binary).await
    {
        tracing::warn!(
            binary = %config.oracle.binary,
            "Claude CLI not found, agent iterations will fail until it is installed"
        );
    }

    let daemon = Daemon::new(config, store).context("Failed to build daemon")?;
    let cancel = daemon.cancel_token();

    // Handle shutdown signals
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    daemon
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Daemon error: {e}"))?;

    Ok(())
}
