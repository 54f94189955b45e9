//! Wires price stream, detector, risk, executor and journal into the
//! running application, grounded on the teacher's
//! `app/orchestrator/mod.rs::run_with_shutdown`: a `watch::Receiver<bool>`
//! races the scan loop so Ctrl+C (installed by `cli::run`) shuts the whole
//! pipeline down cleanly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::core::detector::{ArbitrageDetector, DetectorConfig, FeeTable, ReferenceRates};
use crate::core::domain::{canonicalise, VenueId};
use crate::core::exchange::{VenueAdapter, VenueFactory};
use crate::core::journal::{FileJournal, MemoryJournal, TradeRepository};
use crate::core::risk::{RiskLimits, RiskManager};
use crate::core::stream::PriceStream;
use crate::core::cache::OrderBookCache;
use crate::core::executor::{ExecutorConfig, OrderExecutor};
use crate::error::Result;

use super::config::{Config, JournalMode};

const CACHE_SUBSCRIBER_CAPACITY: usize = 64;

/// Builds every long-lived component described in §4 from a validated
/// [`Config`] and runs the scan loop until `shutdown` reports `true`.
pub async fn run_with_shutdown(config: Config, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let resolved = config.resolve_venues()?;

    let mut adapters = HashMap::new();
    let mut fees = FeeTable::new();
    let mut pairs = Vec::new();

    for (id, settings, endpoints) in resolved {
        fees.insert(id.clone(), settings.maker_fee.max(settings.taker_fee));
        let adapter = VenueFactory::build(settings, endpoints, config.stream.per_venue_concurrency)?;
        for symbol in &config.trading.symbols {
            pairs.push((id.clone(), canonicalise(symbol)?));
        }
        adapters.insert(id, adapter);
    }

    recover_open_orders(&adapters).await;

    let cache = OrderBookCache::new(CACHE_SUBSCRIBER_CAPACITY);

    let stream = PriceStream::new(
        adapters.clone(),
        pairs,
        cache.clone(),
        Duration::from_millis(config.stream.polling_interval_ms),
        config.trading.max_snapshot_age_ms,
        config.stream.depth,
        config.stream.per_venue_concurrency,
        config.breakers.connectivity_failures_to_trip,
    );
    stream.start().await;
    info!(venues = adapters.len(), symbols = config.trading.symbols.len(), "price stream started");

    let detector = ArbitrageDetector::new(
        DetectorConfig {
            min_spread_percent: config.trading.min_spread_percent,
            min_profit_reference: config.trading.min_profit_reference,
            max_position_size: config.trading.max_position_per_venue,
            min_order_size: config.trading.min_order_size,
        },
        ReferenceRates::default(),
        fees,
    );

    let risk = Arc::new(RiskManager::new(
        RiskLimits {
            max_position_per_venue: config.trading.max_position_per_venue,
            max_total_position: config.trading.max_total_position,
            daily_loss_limit: config.trading.daily_loss_limit,
            per_trade_loss_limit: config.trading.per_trade_loss_limit,
            max_drawdown: config.trading.max_drawdown,
            balance_safety_margin: config.trading.slippage_tolerance_percent,
        },
        config.breakers.volatility_window_ms,
        config.breakers.volatility_max_percent,
        config.breakers.volatility_cooldown_ms(),
        config.breakers.connectivity_failures_to_trip,
        config.breakers.connectivity_cooldown_ms(),
        config.breakers.error_rate_window,
        config.breakers.error_rate_min_samples(),
        config.breakers.error_rate_max,
        config.breakers.error_rate_cooldown_ms(),
    ));

    let journal: Arc<dyn TradeRepository> = match config.journal.mode {
        JournalMode::DryRun => Arc::new(MemoryJournal::new()),
        JournalMode::Realistic | JournalMode::Paper => Arc::new(FileJournal::new(config.journal.path.clone())),
    };

    let executor = Arc::new(OrderExecutor::new(
        adapters,
        risk.clone(),
        journal,
        None,
        ExecutorConfig {
            poll_interval: Duration::from_millis(config.executor.poll_interval_ms),
            total_deadline: Duration::from_millis(config.executor.total_deadline_ms),
            net_timeout: Duration::from_millis(config.executor.net_timeout_ms),
            max_retries: config.trading.max_retries,
            max_snapshot_age_ms: config.trading.max_snapshot_age_ms,
            min_profit_reference: config.trading.min_profit_reference,
            min_order_size: config.trading.min_order_size,
        },
        config.dry_run,
    ));

    let mut interval = tokio::time::interval(Duration::from_millis(config.stream.polling_interval_ms));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                scan_and_execute(&cache, &detector, &risk, &executor).await;
            }
            result = shutdown.changed() => {
                match result {
                    Ok(()) if *shutdown.borrow() => {
                        info!("shutdown signal received, stopping pipeline");
                        break;
                    }
                    Ok(()) => continue,
                    Err(_) => {
                        info!("shutdown channel closed, stopping pipeline");
                        break;
                    }
                }
            }
        }
    }

    stream.stop(Duration::from_secs(5)).await;
    Ok(())
}

/// Queries every authenticated adapter for its open orders at startup and
/// logs what's found. This process holds no memory of orders placed by a
/// prior run, so any order still open on a venue is surfaced here rather
/// than silently left unmanaged; reconciling them against the journal is
/// left to the operator.
async fn recover_open_orders(adapters: &HashMap<VenueId, Arc<dyn VenueAdapter>>) {
    for (id, adapter) in adapters {
        if !adapter.is_authenticated() {
            continue;
        }
        match adapter.get_open_orders(None).await {
            Ok(orders) if orders.is_empty() => {}
            Ok(orders) => {
                warn!(venue = %id, count = orders.len(), "open orders found at startup, carried over from a prior run");
            }
            Err(e) => {
                warn!(venue = %id, error = %e, "failed to query open orders during startup recovery");
            }
        }
    }
}

async fn scan_and_execute(
    cache: &OrderBookCache,
    detector: &ArbitrageDetector,
    risk: &Arc<RiskManager>,
    executor: &Arc<OrderExecutor>,
) {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let snapshots = cache.all();
    for snapshot in &snapshots {
        if let (Some(bid), Some(ask)) = (snapshot.best_bid(), snapshot.best_ask()) {
            let mid = (bid.price() + ask.price()) / rust_decimal::Decimal::from(2);
            risk.observe_price(snapshot.symbol(), mid, now_ms);
        }
    }

    let opportunities = detector.scan(&snapshots, now_ms);
    let Some(best) = opportunities.into_iter().next() else {
        return;
    };

    use crate::core::domain::ExecutionResult;
    match executor.execute(&best).await {
        ExecutionResult::Success(trade) => {
            info!(symbol = %trade.symbol, profit = %trade.realised_net_profit, "trade executed");
        }
        ExecutionResult::Partial { exposure, .. } => {
            warn!(venue = %exposure.venue, quantity = %exposure.quantity, "partial fill left an open exposure");
        }
        ExecutionResult::Rejected { reason, detail } => {
            warn!(?reason, detail, "opportunity rejected");
        }
        ExecutionResult::Failed { reason, detail } => {
            warn!(?reason, detail, "execution failed");
        }
        ExecutionResult::Timeout => {
            warn!("execution timed out before both legs reached a terminal state");
        }
    }
}
