//! Detector and risk thresholds shared by the scan and pre-trade gate.

use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Canonical symbol strings (`BASE-QUOTE` etc.) every venue is polled
    /// for. Not named in the external interface table; without it the
    /// stream has no instruments to subscribe to, so it is required here.
    pub symbols: Vec<String>,
    pub min_spread_percent: Decimal,
    pub min_profit_reference: Decimal,
    pub max_position_per_venue: Decimal,
    pub max_total_position: Decimal,
    pub daily_loss_limit: Decimal,
    pub per_trade_loss_limit: Decimal,
    pub max_drawdown: Decimal,
    pub slippage_tolerance_percent: Decimal,
    pub max_snapshot_age_ms: i64,
    pub max_retries: u32,
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,
}

fn default_min_order_size() -> Decimal {
    Decimal::new(1, 4)
}
