//! Static health reporting consumed by the `check` CLI subcommand. No
//! network calls: every check is a property of the loaded config.

use super::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    name: &'static str,
    critical: bool,
    status: HealthStatus,
}

impl HealthCheck {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn critical(&self) -> bool {
        self.critical
    }

    #[must_use]
    pub fn status(&self) -> &HealthStatus {
        &self.status
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    checks: Vec<HealthCheck>,
}

impl HealthReport {
    #[must_use]
    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().filter(|c| c.critical()).all(HealthCheck::is_healthy)
    }
}

#[must_use]
pub fn health_check(config: &Config) -> HealthReport {
    let mut checks = Vec::new();

    checks.push(HealthCheck {
        name: "exchanges",
        critical: true,
        status: if config.exchanges.is_empty() {
            HealthStatus::Unhealthy("no [[exchanges]] configured".to_string())
        } else {
            HealthStatus::Healthy
        },
    });

    let credentialed = config.exchanges.iter().filter(|e| has_credentials(e)).count();
    checks.push(HealthCheck {
        name: "venue_credentials",
        critical: !config.dry_run,
        status: if config.dry_run || credentialed >= 2 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy(format!("only {credentialed} of {} venues have credentials", config.exchanges.len()))
        },
    });

    checks.push(HealthCheck {
        name: "journal_sink",
        critical: false,
        status: match config.journal.mode {
            super::config::JournalMode::DryRun => HealthStatus::Healthy,
            _ if config.journal.path.trim().is_empty() => HealthStatus::Unhealthy("journal.path is empty".to_string()),
            _ => HealthStatus::Healthy,
        },
    });

    HealthReport { checks }
}

fn has_credentials(exchange: &super::config::ExchangeConfig) -> bool {
    std::env::var(format!("CORE_{}_API_KEY", exchange.name.to_uppercase())).map(|v| !v.is_empty()).unwrap_or(false)
}
