//! Handler for the `check` command: loads and validates configuration and
//! prints a health report. Makes no network calls.

use std::path::Path;

use crate::app::{health_check, Config, HealthStatus};
use crate::cli::output;
use crate::error::{Error, Result};

/// Executes the `check` subcommand.
pub fn execute(config_path: &Path) -> Result<()> {
    output::section("Configuration Check");
    output::field("Config", config_path.display());

    let config = Config::load(config_path)?;
    output::success("Configuration file is valid");

    output::section("Summary");
    output::field("Exchanges", config.exchanges.len());
    output::field("Symbols", config.trading.symbols.len());
    output::field("Dry run", config.dry_run);
    output::field("Journal mode", format!("{:?}", config.journal.mode));

    output::section("Health Check");
    let report = health_check(&config);
    for check in report.checks() {
        let label = format!("{}{}", check.name(), if check.critical() { " (critical)" } else { "" });
        match check.status() {
            HealthStatus::Healthy => output::success(&label),
            HealthStatus::Unhealthy(reason) => {
                if check.critical() {
                    output::error(&format!("{label}: {reason}"));
                } else {
                    output::warning(&format!("{label}: {reason}"));
                }
            }
        }
    }

    if !report.is_healthy() {
        return Err(Error::Internal("health check failed".to_string()));
    }

    output::success("Health check passed");
    Ok(())
}
