//! Application configuration loading and validation.
//!
//! Loaded from a TOML file; venue secrets are read from the process
//! environment, never from the file itself, mirroring the teacher's
//! `WALLET_PRIVATE_KEY` precedent.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::domain::{VenueId, VenueSettings};
use crate::core::exchange::EndpointMap;
use crate::error::{ConfigError, Result};

mod breakers;
mod exchanges;
mod executor;
mod journal;
mod logging;
mod stream;
mod trading;

pub use breakers::BreakersConfig;
pub use exchanges::{EndpointConfig, ExchangeConfig, RenderRuleConfig};
pub use executor::ExecutorSettingsConfig;
pub use journal::{JournalConfig, JournalMode};
pub use logging::LoggingConfig;
pub use stream::StreamConfig;
pub use trading::TradingConfig;

/// Root application configuration, matching the surface enumerated in §6
/// one-for-one: `[[exchanges]]`, `[trading]`, `[stream]`, `[breakers]`,
/// `[executor]`, `[logging]`, `[journal]`, plus top-level `dry_run`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub exchanges: Vec<ExchangeConfig>,
    pub trading: TradingConfig,
    pub stream: StreamConfig,
    pub breakers: BreakersConfig,
    pub executor: ExecutorSettingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Resolves every `[[exchanges]]` entry into a venue settings bundle,
    /// reading credentials from the environment as it goes.
    pub fn resolve_venues(&self) -> Result<Vec<(VenueId, VenueSettings, EndpointMap)>> {
        self.exchanges.iter().cloned().map(exchanges::ExchangeConfig::resolve).collect()
    }

    fn validate(&self) -> Result<()> {
        if self.exchanges.is_empty() {
            return Err(ConfigError::MissingField { field: "exchanges" }.into());
        }
        for exchange in &self.exchanges {
            if exchange.base_url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "exchanges.base_url",
                    reason: format!("venue {} has an empty base_url", exchange.name),
                }
                .into());
            }
        }

        let t = &self.trading;
        if t.min_spread_percent < Decimal::ZERO {
            return invalid("trading.min_spread_percent", "must be 0 or greater");
        }
        if t.min_profit_reference < Decimal::ZERO {
            return invalid("trading.min_profit_reference", "must be 0 or greater");
        }
        if t.max_position_per_venue <= Decimal::ZERO {
            return invalid("trading.max_position_per_venue", "must be greater than 0");
        }
        if t.max_total_position < t.max_position_per_venue {
            return invalid("trading.max_total_position", "must be >= max_position_per_venue");
        }
        if t.daily_loss_limit <= Decimal::ZERO {
            return invalid("trading.daily_loss_limit", "must be greater than 0");
        }
        if t.per_trade_loss_limit <= Decimal::ZERO {
            return invalid("trading.per_trade_loss_limit", "must be greater than 0");
        }
        if t.max_drawdown <= Decimal::ZERO || t.max_drawdown > Decimal::ONE {
            return invalid("trading.max_drawdown", "must be in (0, 1]");
        }
        if t.slippage_tolerance_percent < Decimal::ZERO {
            return invalid("trading.slippage_tolerance_percent", "must be 0 or greater");
        }
        if t.max_snapshot_age_ms <= 0 {
            return invalid("trading.max_snapshot_age_ms", "must be greater than 0");
        }

        let s = &self.stream;
        if s.polling_interval_ms == 0 {
            return invalid("stream.polling_interval_ms", "must be greater than 0");
        }
        if s.per_venue_concurrency == 0 {
            return invalid("stream.per_venue_concurrency", "must be greater than 0");
        }

        let b = &self.breakers;
        if b.volatility_window_ms <= 0 {
            return invalid("breakers.volatility_window_ms", "must be greater than 0");
        }
        if b.volatility_max_percent <= Decimal::ZERO {
            return invalid("breakers.volatility_max_percent", "must be greater than 0");
        }
        if b.connectivity_failures_to_trip == 0 {
            return invalid("breakers.connectivity_failures_to_trip", "must be greater than 0");
        }
        if b.error_rate_window == 0 {
            return invalid("breakers.error_rate_window", "must be greater than 0");
        }
        if b.error_rate_max <= Decimal::ZERO || b.error_rate_max > Decimal::ONE {
            return invalid("breakers.error_rate_max", "must be in (0, 1]");
        }

        let e = &self.executor;
        if e.poll_interval_ms == 0 {
            return invalid("executor.poll_interval_ms", "must be greater than 0");
        }
        if e.total_deadline_ms < e.poll_interval_ms {
            return invalid("executor.total_deadline_ms", "must be >= executor.poll_interval_ms");
        }
        if e.net_timeout_ms == 0 || e.net_timeout_ms > e.total_deadline_ms {
            return invalid("executor.net_timeout_ms", "must be > 0 and <= executor.total_deadline_ms");
        }

        if !self.dry_run {
            let credentialed = self.exchanges.iter().filter(|e| self.has_credentials(e)).count();
            if credentialed < 2 {
                return invalid(
                    "exchanges",
                    "at least two venues must carry credentials when dry_run is false; \
                     a two-leg trade needs an authenticated venue on each side",
                );
            }
        }

        Ok(())
    }

    fn has_credentials(&self, exchange: &ExchangeConfig) -> bool {
        std::env::var(format!("CORE_{}_API_KEY", exchange.name.to_uppercase()))
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }
}

fn invalid(field: &'static str, reason: &str) -> Result<()> {
    Err(ConfigError::InvalidValue { field, reason: reason.to_string() }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_TOML: &str = r#"
dry_run = true

[[exchanges]]
name = "alpha"
base_url = "https://alpha.example"
auth = "hmac-sha256"
maker_fee = "0.001"
taker_fee = "0.001"
[exchanges.endpoints]
orderbook_path = "/book/{symbol}"
order_path = "/order"
cancel_path = "/order/{order_id}"
open_orders_path = "/orders"
balance_path = "/balance"

[[exchanges]]
name = "beta"
base_url = "https://beta.example"
auth = "bearer-token"
maker_fee = "0.001"
taker_fee = "0.002"
[exchanges.endpoints]
orderbook_path = "/book/{symbol}"
order_path = "/order"
cancel_path = "/order/{order_id}"
open_orders_path = "/orders"
balance_path = "/balance"

[trading]
symbols = ["BTC-USDT"]
min_spread_percent = "0.003"
min_profit_reference = "0"
max_position_per_venue = "10"
max_total_position = "15"
daily_loss_limit = "1000"
per_trade_loss_limit = "100"
max_drawdown = "0.2"
slippage_tolerance_percent = "0.001"
max_snapshot_age_ms = 2000
max_retries = 3

[stream]
polling_interval_ms = 500
per_venue_concurrency = 4

[breakers]
volatility_window_ms = 60000
volatility_max_percent = "0.1"
connectivity_failures_to_trip = 3
error_rate_window = 20
error_rate_max = "0.5"

[executor]
poll_interval_ms = 200
total_deadline_ms = 10000
net_timeout_ms = 3000
"#;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_a_well_formed_config() {
        let (_dir, path) = write_config(VALID_TOML);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.exchanges.len(), 2);
        assert!(config.dry_run);
    }

    #[test]
    fn rejects_malformed_toml() {
        let (_dir, path) = write_config("this is not [ valid toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let broken = VALID_TOML.replace(r#"max_drawdown = "0.2""#, r#"max_drawdown = "1.5""#);
        let (_dir, path) = write_config(&broken);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn rejects_missing_credentials_outside_dry_run() {
        let live = VALID_TOML.replace("dry_run = true", "dry_run = false");
        let (_dir, path) = write_config(&live);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn accepts_missing_credentials_in_dry_run() {
        let (_dir, path) = write_config(VALID_TOML);
        assert!(Config::load(&path).is_ok());
    }
}
