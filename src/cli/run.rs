//! Handler for the `run` command.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::app::{run_with_shutdown, Config};
use crate::cli::{banner, RunArgs};
use crate::error::{Error, Result};

fn map_run_result(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "engine exited with error");
            Err(e)
        }
        Err(e) => {
            error!(error = %e, "engine task join failed");
            Err(Error::Internal(e.to_string()))
        }
    }
}

/// Executes the `run` subcommand: loads config, applies CLI overrides,
/// prints the banner, then drives the orchestrator until Ctrl+C.
pub async fn execute(config_path: &std::path::Path, log_level: Option<&str>, dry_run: bool, args: &RunArgs) -> Result<()> {
    let mut config = Config::load(config_path)?;

    if let Some(level) = log_level {
        config.logging.level = level.to_string();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if dry_run {
        config.dry_run = true;
    }

    config.init_logging();

    if !args.no_banner {
        banner::print_banner(config.exchanges.len(), config.dry_run);
    }

    info!(venues = config.exchanges.len(), dry_run = config.dry_run, "arbcore starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut engine_handle = tokio::spawn(async move { run_with_shutdown(config, shutdown_rx).await });

    tokio::select! {
        result = &mut engine_handle => {
            map_run_result(result)?;
            info!("arbcore stopped");
            return Ok(());
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received (Ctrl+C)");
            let _ = shutdown_tx.send(true);
        }
    }

    map_run_result(engine_handle.await)?;
    info!("arbcore stopped");
    Ok(())
}
