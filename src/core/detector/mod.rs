//! Cross-venue arbitrage scan (§4.4).

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::core::domain::{compatible, ArbitrageOpportunity, OrderBookSnapshot, VenueId};

/// Reference-currency conversion rates, keyed by quote currency code. A
/// missing entry means "no conversion available"; the detector then reports
/// the raw quote-currency profit and marks the opportunity unconverted
/// rather than rejecting it outright.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRates {
    rates: HashMap<String, Decimal>,
}

impl ReferenceRates {
    #[must_use]
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates }
    }

    #[must_use]
    pub fn convert(&self, quote: &str, amount: Decimal) -> Option<Decimal> {
        self.rates.get(quote).map(|rate| amount * rate)
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub min_spread_percent: Decimal,
    pub min_profit_reference: Decimal,
    pub max_position_size: Decimal,
    pub min_order_size: Decimal,
}

/// Per-venue worst-case fee rate to assume during detection (§4.4 step 5:
/// "use the higher of maker/taker for each leg"). Callers populate this from
/// `max(adapter.maker_fee(), adapter.taker_fee())` per venue.
pub type FeeTable = HashMap<VenueId, Decimal>;

pub struct ArbitrageDetector {
    config: DetectorConfig,
    rates: ReferenceRates,
    fees: FeeTable,
}

impl ArbitrageDetector {
    #[must_use]
    pub fn new(config: DetectorConfig, rates: ReferenceRates, fees: FeeTable) -> Self {
        Self { config, rates, fees }
    }

    fn fee_for(&self, venue: &VenueId) -> Decimal {
        self.fees.get(venue).copied().unwrap_or(Decimal::ZERO)
    }

    /// Scans every ordered pair of distinct, symbol-compatible snapshots and
    /// returns opportunities ranked net-profit descending, ties broken by
    /// lower combined latency then lexicographic `(buy_venue, sell_venue)`.
    #[must_use]
    pub fn scan(&self, snapshots: &[OrderBookSnapshot], now_ms: i64) -> Vec<ArbitrageOpportunity> {
        let mut found = Vec::new();

        for buy in snapshots {
            for sell in snapshots {
                if buy.venue() == sell.venue() {
                    continue;
                }
                if !compatible(buy.symbol(), sell.symbol()) {
                    continue;
                }
                if let Some(opportunity) = self.evaluate_pair(buy, sell) {
                    found.push(opportunity);
                }
            }
        }

        found.sort_by(|a, b| {
            b.net_profit_reference()
                .cmp(&a.net_profit_reference())
                .then_with(|| a.combined_latency_ms(now_ms).cmp(&b.combined_latency_ms(now_ms)))
                .then_with(|| a.buy_venue().cmp(b.buy_venue()))
                .then_with(|| a.sell_venue().cmp(b.sell_venue()))
        });

        found
    }

    fn evaluate_pair(&self, buy: &OrderBookSnapshot, sell: &OrderBookSnapshot) -> Option<ArbitrageOpportunity> {
        let ask = buy.best_ask()?;
        let bid = sell.best_bid()?;

        if ask.price() >= bid.price() {
            return None;
        }

        let quantity = ask.quantity().min(bid.quantity()).min(self.config.max_position_size);
        if quantity < self.config.min_order_size {
            return None;
        }

        let gross_spread = (bid.price() - ask.price()) / ask.price();
        if gross_spread < self.config.min_spread_percent {
            return None;
        }

        // Pessimistic fee assumption at detection time: the higher of
        // maker/taker per leg, since the executor may later choose either.
        let buy_fee = self.fee_for(buy.venue());
        let sell_fee = self.fee_for(sell.venue());

        let net_profit_quote = quantity * (bid.price() * (Decimal::ONE - sell_fee) - ask.price() * (Decimal::ONE + buy_fee));

        let quote_currency = buy.symbol().quote();
        let (net_profit_reference, reference_converted) = match self.rates.convert(quote_currency, net_profit_quote) {
            Some(converted) => (converted, true),
            None => (net_profit_quote, false),
        };

        if net_profit_reference < self.config.min_profit_reference {
            debug!(venue_buy = %buy.venue(), venue_sell = %sell.venue(), %net_profit_reference, "opportunity below profit threshold");
            return None;
        }

        Some(ArbitrageOpportunity::new(
            buy.symbol().clone(),
            buy.venue().clone(),
            sell.venue().clone(),
            quantity,
            ask.price(),
            bid.price(),
            buy_fee,
            sell_fee,
            net_profit_quote,
            net_profit_reference,
            reference_converted,
            buy.timestamp_ms(),
            sell.timestamp_ms(),
        ))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{canonicalise, PriceLevel};
    use rust_decimal_macros::dec;

    fn book(venue: &str, symbol: &str, ts: i64, bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            VenueId::new(venue),
            canonicalise(symbol).unwrap(),
            ts,
            bids.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect(),
            asks.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect(),
        )
    }

    fn config() -> DetectorConfig {
        DetectorConfig {
            min_spread_percent: dec!(0.003),
            min_profit_reference: Decimal::ZERO,
            max_position_size: dec!(100),
            min_order_size: dec!(0.0001),
        }
    }

    #[test]
    fn scenario_one_two_venue_detection() {
        let detector = ArbitrageDetector::new(config(), ReferenceRates::default(), FeeTable::new());
        let a = book("A", "BTC-USDT", 1_000, vec![], vec![(dec!(65000), dec!(1.0))]);
        let b = book("B", "BTC-USDT", 1_050, vec![(dec!(65300), dec!(1.0))], vec![]);

        let opportunities = detector.scan(&[a, b], 2_000);
        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        assert_eq!(opp.buy_venue().as_str(), "A");
        assert_eq!(opp.sell_venue().as_str(), "B");
        assert_eq!(opp.quantity(), dec!(1.0));
        let spread = opp.gross_spread();
        assert!(spread > dec!(0.0046) && spread < dec!(0.0047));
    }

    #[test]
    fn rejects_when_spread_below_threshold() {
        let detector = ArbitrageDetector::new(config(), ReferenceRates::default(), FeeTable::new());
        let a = book("A", "BTC-USDT", 0, vec![], vec![(dec!(65000), dec!(1.0))]);
        let b = book("B", "BTC-USDT", 0, vec![(dec!(65010), dec!(1.0))], vec![]);
        assert!(detector.scan(&[a, b], 0).is_empty());
    }

    #[test]
    fn rejects_when_ask_not_below_bid() {
        let detector = ArbitrageDetector::new(config(), ReferenceRates::default(), FeeTable::new());
        let a = book("A", "BTC-USDT", 0, vec![], vec![(dec!(65300), dec!(1.0))]);
        let b = book("B", "BTC-USDT", 0, vec![(dec!(65000), dec!(1.0))], vec![]);
        assert!(detector.scan(&[a, b], 0).is_empty());
    }

    #[test]
    fn scenario_three_quote_family_compatibility() {
        let detector = ArbitrageDetector::new(config(), ReferenceRates::default(), FeeTable::new());
        let a = book("A", "BTC-IRT", 0, vec![], vec![(dec!(65000), dec!(1.0))]);
        let b = book("B", "BTC-TMN", 0, vec![(dec!(65300), dec!(1.0))], vec![]);
        assert_eq!(detector.scan(&[a, b], 0).len(), 1);

        let b_usdt = book("B", "BTC-USDT", 0, vec![(dec!(65300), dec!(1.0))], vec![]);
        let a2 = book("A", "BTC-IRT", 0, vec![], vec![(dec!(65000), dec!(1.0))]);
        assert!(detector.scan(&[a2, b_usdt], 0).is_empty());
    }

    #[test]
    fn thin_top_level_below_min_order_size_is_dropped() {
        let mut cfg = config();
        cfg.min_order_size = dec!(0.01);
        let detector = ArbitrageDetector::new(cfg, ReferenceRates::default(), FeeTable::new());
        let a = book("A", "BTC-USDT", 0, vec![], vec![(dec!(65000), dec!(0.001))]);
        let b = book("B", "BTC-USDT", 0, vec![(dec!(65300), dec!(1.0))], vec![]);
        assert!(detector.scan(&[a, b], 0).is_empty());
    }

    #[test]
    fn net_profit_exactly_at_threshold_is_accepted() {
        // net_profit == min_profit_reference is a closed boundary: accepted.
        let mut cfg = config();
        let a = book("A", "BTC-USDT", 0, vec![], vec![(dec!(65000), dec!(1.0))]);
        let b = book("B", "BTC-USDT", 0, vec![(dec!(65300), dec!(1.0))], vec![]);
        let detector = ArbitrageDetector::new(cfg.clone(), ReferenceRates::default(), FeeTable::new());
        let opportunities = detector.scan(&[a.clone(), b.clone()], 0);
        let exact_profit = opportunities[0].net_profit_reference();

        cfg.min_profit_reference = exact_profit;
        let detector = ArbitrageDetector::new(cfg, ReferenceRates::default(), FeeTable::new());
        let opportunities = detector.scan(&[a, b], 0);
        assert_eq!(opportunities.len(), 1, "an opportunity exactly at the profit threshold must still be emitted");
    }

    #[test]
    fn unconverted_reference_falls_back_to_raw_quote_profit() {
        let detector = ArbitrageDetector::new(config(), ReferenceRates::default(), FeeTable::new());
        let a = book("A", "BTC-USDT", 0, vec![], vec![(dec!(65000), dec!(1.0))]);
        let b = book("B", "BTC-USDT", 0, vec![(dec!(65300), dec!(1.0))], vec![]);
        let opportunities = detector.scan(&[a, b], 0);
        assert!(!opportunities[0].reference_converted());
        assert_eq!(opportunities[0].net_profit_reference(), opportunities[0].net_profit_quote());
    }
}
