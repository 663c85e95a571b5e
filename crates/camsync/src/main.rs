use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camsync::{build, now_millis, Config, CycleOutcome, PersistOutcome};

/// camsync -- republish CMSV8 stream URLs to a downstream endpoint.
#[derive(Parser, Debug)]
#[command(name = "camsync", version, about)]
struct Cli {
    /// Read settings from this file before the process environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Log what would be sent without contacting the endpoint
    #[arg(long, global = true)]
    dry_run: bool,

    /// Override PERSIST_CACHE_PATH
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync loop until interrupted (default)
    Run,

    /// Run a single cycle and exit
    Once {
        /// Ignore the cache and send the whole snapshot
        #[arg(long)]
        full: bool,
    },

    /// Print the current snapshot as JSON without sending it
    Snapshot,

    /// Validate configuration and the camera map, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path).with_context(|| format!("cannot read {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    // RUST_LOG may come from the env file.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut config = Config::from_env().context("invalid configuration")?;
    if cli.dry_run {
        config.send.dry_run = true;
    }
    if let Some(cache) = cli.cache {
        config.cache_path = cache;
    }

    let camera_map = config.load_camera_map()?;
    if camera_map.is_empty() {
        warn!(path = %config.camera_map_path.display(), "camera map has no groups");
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            info!(
                host = %config.cms.host,
                endpoint = %config.endpoint_url,
                groups = camera_map.len(),
                channels = camera_map.channel_count(),
                cache = %config.cache_path.display(),
                "configuration ok"
            );
        }
        Commands::Snapshot => {
            let mut sync_loop = build(&config, camera_map).await?;
            let report = sync_loop.snapshot(now_millis()).await?;
            println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
        }
        Commands::Once { full } => {
            let mut sync_loop = build(&config, camera_map).await?;
            let report = if full {
                sync_loop.resend_all(now_millis()).await
            } else {
                sync_loop.run_cycle(now_millis()).await
            };
            info!(outcome = ?report.outcome, persist = ?report.persist, "cycle finished");

            match (&report.outcome, &report.persist) {
                (CycleOutcome::LoginFailed(e), _) => anyhow::bail!("login failed: {e}"),
                (CycleOutcome::CollectFailed(e), _) => anyhow::bail!("collection failed: {e}"),
                (_, PersistOutcome::Failed(e)) => anyhow::bail!("cache save failed: {e}"),
                _ => {}
            }
        }
        Commands::Run => {
            info!(
                host = %config.cms.host,
                endpoint = %config.endpoint_url,
                groups = camera_map.len(),
                dry_run = config.send.dry_run,
                "starting sync loop"
            );
            let mut sync_loop = build(&config, camera_map).await?;
            tokio::select! {
                _ = sync_loop.run() => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
            }
        }
    }

    Ok(())
}
