//! Arbitrage opportunity type.

use rust_decimal::Decimal;

use super::symbol::Symbol;
use super::venue::VenueId;

/// A derived, ephemeral artifact asserting that buying on `buy_venue` and
/// selling on `sell_venue` yields net positive profit after fees. Valid
/// only while both underlying snapshots are within the staleness budget;
/// the detector does not retain opportunities past one scan cycle.
#[derive(Debug, Clone)]
pub struct ArbitrageOpportunity {
    symbol: Symbol,
    buy_venue: VenueId,
    sell_venue: VenueId,
    quantity: Decimal,
    buy_price: Decimal,
    sell_price: Decimal,
    buy_fee_rate: Decimal,
    sell_fee_rate: Decimal,
    net_profit_quote: Decimal,
    net_profit_reference: Decimal,
    reference_converted: bool,
    buy_snapshot_ts_ms: i64,
    sell_snapshot_ts_ms: i64,
}

impl ArbitrageOpportunity {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        buy_venue: VenueId,
        sell_venue: VenueId,
        quantity: Decimal,
        buy_price: Decimal,
        sell_price: Decimal,
        buy_fee_rate: Decimal,
        sell_fee_rate: Decimal,
        net_profit_quote: Decimal,
        net_profit_reference: Decimal,
        reference_converted: bool,
        buy_snapshot_ts_ms: i64,
        sell_snapshot_ts_ms: i64,
    ) -> Self {
        Self {
            symbol,
            buy_venue,
            sell_venue,
            quantity,
            buy_price,
            sell_price,
            buy_fee_rate,
            sell_fee_rate,
            net_profit_quote,
            net_profit_reference,
            reference_converted,
            buy_snapshot_ts_ms,
            sell_snapshot_ts_ms,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn buy_venue(&self) -> &VenueId {
        &self.buy_venue
    }

    #[must_use]
    pub fn sell_venue(&self) -> &VenueId {
        &self.sell_venue
    }

    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    #[must_use]
    pub fn buy_price(&self) -> Decimal {
        self.buy_price
    }

    #[must_use]
    pub fn sell_price(&self) -> Decimal {
        self.sell_price
    }

    /// Gross spread as a fraction of the buy price: `(sell - buy) / buy`.
    #[must_use]
    pub fn gross_spread(&self) -> Decimal {
        if self.buy_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.sell_price - self.buy_price) / self.buy_price
    }

    #[must_use]
    pub fn net_profit_quote(&self) -> Decimal {
        self.net_profit_quote
    }

    #[must_use]
    pub fn net_profit_reference(&self) -> Decimal {
        self.net_profit_reference
    }

    #[must_use]
    pub fn reference_converted(&self) -> bool {
        self.reference_converted
    }

    /// Sum of the two snapshots' age relative to `now_ms`, used as the
    /// secondary tie-break when ranking opportunities.
    #[must_use]
    pub fn combined_latency_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.buy_snapshot_ts_ms) + (now_ms - self.sell_snapshot_ts_ms)
    }

    #[must_use]
    pub fn buy_snapshot_ts_ms(&self) -> i64 {
        self.buy_snapshot_ts_ms
    }

    #[must_use]
    pub fn sell_snapshot_ts_ms(&self) -> i64 {
        self.sell_snapshot_ts_ms
    }

    /// Both underlying snapshots must be within `max_age_ms` of `now_ms` for
    /// this opportunity to still be executable.
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64, max_age_ms: i64) -> bool {
        now_ms - self.buy_snapshot_ts_ms < max_age_ms && now_ms - self.sell_snapshot_ts_ms < max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> ArbitrageOpportunity {
        ArbitrageOpportunity::new(
            super::super::symbol::canonicalise("BTC-USDT").unwrap(),
            VenueId::new("A"),
            VenueId::new("B"),
            dec!(1.0),
            dec!(65000),
            dec!(65300),
            dec!(0.001),
            dec!(0.001),
            dec!(169.67),
            dec!(169.67),
            true,
            1_000,
            1_050,
        )
    }

    #[test]
    fn gross_spread_matches_scenario_one() {
        let opp = sample();
        // (65300 - 65000) / 65000 ~= 0.4615%
        let spread = opp.gross_spread();
        assert!(spread > dec!(0.0046) && spread < dec!(0.0047));
    }

    #[test]
    fn freshness_requires_both_snapshots_within_budget() {
        let opp = sample();
        assert!(opp.is_fresh(1_100, 500));
        assert!(!opp.is_fresh(2_000, 500));
    }

    #[test]
    fn combined_latency_sums_both_ages() {
        let opp = sample();
        assert_eq!(opp.combined_latency_ms(2_000), (2_000 - 1_000) + (2_000 - 1_050));
    }
}
