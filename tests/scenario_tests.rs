//! End-to-end scenarios driving the detector and risk manager directly
//! against scripted order book snapshots, without a network-backed venue
//! adapter.

use std::collections::HashMap;
use std::sync::Arc;

use arbcore::core::detector::{ArbitrageDetector, DetectorConfig, ReferenceRates};
use arbcore::core::domain::{
    canonicalise, ArbitrageOpportunity, Order, OrderBookSnapshot, OrderId, OrderSide, OrderType, PriceLevel, RejectReason, Symbol, VenueId,
};
use arbcore::core::exchange::{Balance, VenueAdapter};
use arbcore::core::executor::{ExecutorConfig, OrderExecutor};
use arbcore::core::journal::MemoryJournal;
use arbcore::core::risk::{RiskLimits, RiskManager};
use arbcore::error::VenueError;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn snapshot(venue: &str, symbol: &str, ts: i64, bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> OrderBookSnapshot {
    OrderBookSnapshot::new(
        VenueId::new(venue),
        canonicalise(symbol).unwrap(),
        ts,
        bids.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect(),
        asks.into_iter().map(|(p, q)| PriceLevel::new(p, q)).collect(),
    )
}

fn detector(min_spread: Decimal, min_profit: Decimal) -> ArbitrageDetector {
    let mut fees = HashMap::new();
    fees.insert(VenueId::new("A"), dec!(0.001));
    fees.insert(VenueId::new("B"), dec!(0.001));
    ArbitrageDetector::new(
        DetectorConfig {
            min_spread_percent: min_spread,
            min_profit_reference: min_profit,
            max_position_size: dec!(10),
            min_order_size: dec!(0.0001),
        },
        ReferenceRates::default(),
        fees,
    )
}

#[test]
fn two_venue_spread_is_detected_and_scored() {
    let snapshots = vec![
        snapshot("A", "BTC-USDT", 1_000, vec![], vec![(dec!(65000), dec!(1.0))]),
        snapshot("B", "BTC-USDT", 1_000, vec![(dec!(65300), dec!(1.0))], vec![]),
    ];

    let detector = detector(dec!(0.003), Decimal::ZERO);
    let opportunities = detector.scan(&snapshots, 2_000);

    assert_eq!(opportunities.len(), 1);
    let best = &opportunities[0];
    assert_eq!(best.buy_venue(), &VenueId::new("A"));
    assert_eq!(best.sell_venue(), &VenueId::new("B"));
    assert_eq!(best.quantity(), dec!(1.0));
    assert!(best.net_profit_quote() > Decimal::ZERO);
}

#[test]
fn below_min_spread_yields_no_opportunity() {
    let snapshots = vec![
        snapshot("A", "BTC-USDT", 1_000, vec![], vec![(dec!(65000), dec!(1.0))]),
        snapshot("B", "BTC-USDT", 1_000, vec![(dec!(65050), dec!(1.0))], vec![]),
    ];

    let detector = detector(dec!(0.30), Decimal::ZERO);
    let opportunities = detector.scan(&snapshots, 2_000);
    assert!(opportunities.is_empty());
}

#[test]
fn quote_family_compatible_symbols_are_matched_but_usdt_is_not() {
    let snapshots = vec![
        snapshot("A", "BTC-IRT", 1_000, vec![], vec![(dec!(3_650_000_000), dec!(1.0))]),
        snapshot("B", "BTC-TMN", 1_000, vec![(dec!(3_660_000_000), dec!(1.0))], vec![]),
    ];

    let detector = detector(dec!(0.001), Decimal::ZERO);
    let opportunities = detector.scan(&snapshots, 2_000);
    assert_eq!(opportunities.len(), 1, "IRT and TMN are mutually compatible quote families");

    let incompatible = vec![
        snapshot("A", "BTC-IRT", 1_000, vec![], vec![(dec!(3_650_000_000), dec!(1.0))]),
        snapshot("B", "BTC-USDT", 1_000, vec![(dec!(100_000), dec!(1.0))], vec![]),
    ];
    let opportunities = detector.scan(&incompatible, 2_000);
    assert!(opportunities.is_empty(), "IRT is not compatible with USDT");
}

fn risk_manager(volatility_max_percent: Decimal) -> RiskManager {
    RiskManager::new(
        RiskLimits {
            max_position_per_venue: dec!(10),
            max_total_position: dec!(15),
            daily_loss_limit: dec!(1000),
            per_trade_loss_limit: dec!(100),
            max_drawdown: dec!(0.2),
            balance_safety_margin: dec!(0.001),
        },
        60_000,
        volatility_max_percent,
        30_000,
        3,
        30_000,
        20,
        5,
        dec!(0.5),
        30_000,
    )
}

#[test]
fn volatility_breaker_trips_and_rejects_until_cooldown() {
    let symbol = canonicalise("BTC-USDT").unwrap();
    let risk = risk_manager(dec!(0.02));

    // establish a baseline
    risk.observe_price(&symbol, dec!(65000), 0);
    // a move well past the 2% threshold within the window
    risk.observe_price(&symbol, dec!(68000), 1_000);

    let venue_a = VenueId::new("A");
    let venue_b = VenueId::new("B");
    let result = risk.pre_trade_check(
        &symbol, &venue_a, &venue_b, dec!(1.0), dec!(10), dec!(10), dec!(1_000_000), dec!(1_000_000), dec!(65000), dec!(1.0), 1_000,
    );
    assert!(result.is_err(), "volatility breaker should reject trades on this symbol");

    // still within cooldown
    let result = risk.pre_trade_check(
        &symbol, &venue_a, &venue_b, dec!(1.0), dec!(10), dec!(10), dec!(1_000_000), dec!(1_000_000), dec!(65000), dec!(1.0), 1_500,
    );
    assert!(result.is_err(), "breaker should not reset before cooldown elapses");
}

/// A venue adapter whose order book can be swapped out mid-test, used to
/// simulate the spread collapsing between detection and execution.
struct ReactiveAdapter {
    id: VenueId,
    book: std::sync::Mutex<OrderBookSnapshot>,
}

impl ReactiveAdapter {
    fn set_book(&self, book: OrderBookSnapshot) {
        *self.book.lock().unwrap() = book;
    }
}

#[async_trait::async_trait]
impl VenueAdapter for ReactiveAdapter {
    fn id(&self) -> &VenueId {
        &self.id
    }
    async fn fetch_orderbook(&self, _symbol: &Symbol, _depth: u32) -> Result<OrderBookSnapshot, VenueError> {
        Ok(self.book.lock().unwrap().clone())
    }
    async fn place_order(&self, _s: &Symbol, _side: OrderSide, _t: OrderType, _q: Decimal, _p: Option<Decimal>, _po: bool) -> Result<Order, VenueError> {
        Err(VenueError::NetworkError("not reached in this scenario".to_string()))
    }
    async fn cancel_order(&self, _id: &OrderId, _s: Option<&Symbol>) -> Result<bool, VenueError> {
        Ok(true)
    }
    async fn get_order(&self, _id: &OrderId, _s: Option<&Symbol>) -> Result<Order, VenueError> {
        Err(VenueError::OrderNotFound("not reached in this scenario".to_string()))
    }
    async fn get_open_orders(&self, _s: Option<&Symbol>) -> Result<Vec<Order>, VenueError> {
        Ok(Vec::new())
    }
    async fn get_balance(&self, _currency: &str) -> Result<Balance, VenueError> {
        Ok(Balance { available: dec!(1_000_000), locked: Decimal::ZERO })
    }
    fn maker_fee(&self) -> Decimal {
        dec!(0.001)
    }
    fn taker_fee(&self) -> Decimal {
        dec!(0.001)
    }
    fn supports_post_only(&self) -> bool {
        false
    }
    fn is_authenticated(&self) -> bool {
        true
    }
}

fn loose_risk_manager() -> Arc<RiskManager> {
    Arc::new(RiskManager::new(
        RiskLimits {
            max_position_per_venue: dec!(100),
            max_total_position: dec!(200),
            daily_loss_limit: dec!(100_000),
            per_trade_loss_limit: dec!(100_000),
            max_drawdown: dec!(1),
            balance_safety_margin: dec!(0.01),
        },
        60_000,
        dec!(1),
        30_000,
        10,
        30_000,
        20,
        5,
        dec!(1),
        30_000,
    ))
}

#[tokio::test]
async fn spread_collapse_before_execution_yields_rejected() {
    let symbol = canonicalise("BTC-USDT").unwrap();
    let buy_venue = VenueId::new("A");
    let sell_venue = VenueId::new("B");

    let buy_adapter = Arc::new(ReactiveAdapter {
        id: buy_venue.clone(),
        book: std::sync::Mutex::new(snapshot("A", "BTC-USDT", 0, vec![], vec![(dec!(65000), dec!(1.0))])),
    });
    let sell_adapter = Arc::new(ReactiveAdapter {
        id: sell_venue.clone(),
        book: std::sync::Mutex::new(snapshot("B", "BTC-USDT", 0, vec![(dec!(65300), dec!(1.0))], vec![])),
    });

    let opportunity = ArbitrageOpportunity::new(
        symbol, buy_venue.clone(), sell_venue.clone(), dec!(1.0), dec!(65000), dec!(65300), dec!(0.001), dec!(0.001), dec!(169.67), dec!(169.67), true,
        Utc::now().timestamp_millis(), Utc::now().timestamp_millis(),
    );

    // the ask on A rises above the bid on B before execute() re-fetches
    buy_adapter.set_book(snapshot("A", "BTC-USDT", 0, vec![], vec![(dec!(65350), dec!(1.0))]));

    let mut adapters: HashMap<VenueId, Arc<dyn VenueAdapter>> = HashMap::new();
    adapters.insert(buy_venue, buy_adapter);
    adapters.insert(sell_venue, sell_adapter);

    let executor = OrderExecutor::new(
        adapters,
        loose_risk_manager(),
        Arc::new(MemoryJournal::new()),
        None,
        ExecutorConfig {
            poll_interval: std::time::Duration::from_millis(5),
            total_deadline: std::time::Duration::from_millis(200),
            net_timeout: std::time::Duration::from_millis(500),
            max_retries: 1,
            max_snapshot_age_ms: 600_000,
            min_profit_reference: Decimal::ZERO,
            min_order_size: dec!(0.0001),
        },
        false,
    );

    let result = executor.execute(&opportunity).await;
    match result {
        arbcore::core::domain::ExecutionResult::Rejected { reason, .. } => {
            assert_eq!(reason, RejectReason::SpreadCollapsed);
        }
        other => panic!("expected REJECTED(spread_collapsed), got {other:?}"),
    }
}
