use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use saptuner::config::DEFAULT_CONFIG_PATH;
use saptuner::storage::DEFAULT_STATE_DIR;
use saptuner::{SavedStateStore, Sysconfig, Tuner};

#[derive(Parser)]
#[command(name = "saptuner")]
#[command(about = "Kernel and OS tuning for SAP application workloads")]
struct Cli {
    /// Tuning profile (sysconfig format)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory holding pre-change snapshots
    #[arg(long, default_value = DEFAULT_STATE_DIR)]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the tuning profile, saving pre-change values
    Apply {
        /// Resolve and log targets without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Restore previously saved values and clear their snapshots
    Revert {
        #[arg(long)]
        dry_run: bool,
    },
    /// Show live values next to pending snapshots
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let store = SavedStateStore::open(&cli.state_dir)
        .with_context(|| format!("opening state directory '{}'", cli.state_dir.display()))?;

    match cli.command {
        Command::Apply { dry_run } => {
            let config = Sysconfig::load(&cli.config)
                .with_context(|| format!("loading profile '{}'", cli.config.display()))?;
            Tuner::new(config, store).with_dry_run(dry_run).apply()?;
        }
        Command::Revert { dry_run } => {
            // Revert only needs the snapshots; a lost profile must not
            // block restoring the host.
            let config = Sysconfig::load(&cli.config).unwrap_or_else(|e| {
                warn!("profile unavailable, reverting from snapshots only: {}", e);
                Sysconfig::default()
            });
            Tuner::new(config, store).with_dry_run(dry_run).revert()?;
        }
        Command::Status => {
            let config = Sysconfig::load(&cli.config).unwrap_or_default();
            for entry in Tuner::new(config, store).status() {
                let live = entry.live.unwrap_or_else(|| "-".to_string());
                let saved = entry
                    .saved
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<36} live: {:<24} saved: {}", entry.key, live, saved);
            }
        }
    }

    Ok(())
}
