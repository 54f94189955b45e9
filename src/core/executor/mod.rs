//! Dual-leg order executor (§4.6): concurrent placement, fill polling,
//! partial-fill compensation, and journaling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::domain::{
    ArbitrageOpportunity, Exposure, ExecutionResult, FailReason, LegState, Order, OrderSide, OrderStatus, OrderType,
    RejectReason, TradeRecord, VenueId,
};
use crate::core::exchange::VenueAdapter;
use crate::core::journal::{TradeFeatures, TradeRepository};
use crate::core::risk::RiskManager;

/// Advice requested from the optional maker/taker predictor before placing
/// each leg. Unavailability or error is non-fatal: the executor defaults to
/// taker and bumps [`OrderExecutor::advisor_failures`].
#[derive(Debug, Clone)]
pub struct MakerTakerAdvice {
    pub use_maker: bool,
    pub confidence: f64,
    pub predicted_fill_price: Option<Decimal>,
}

/// Features describing one candidate leg, handed to the advisor.
#[derive(Debug, Clone)]
pub struct LegFeatures {
    pub venue: VenueId,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
}

#[async_trait::async_trait]
pub trait MakerTakerAdvisor: Send + Sync {
    async fn advise_maker(&self, features: &LegFeatures) -> anyhow::Result<MakerTakerAdvice>;
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub poll_interval: Duration,
    pub total_deadline: Duration,
    pub net_timeout: Duration,
    pub max_retries: u32,
    pub max_snapshot_age_ms: i64,
    pub min_profit_reference: Decimal,
    pub min_order_size: Decimal,
}

struct Leg {
    venue: VenueId,
    state: LegState,
    order: Option<Order>,
}

pub struct OrderExecutor {
    adapters: HashMap<VenueId, Arc<dyn VenueAdapter>>,
    risk: Arc<RiskManager>,
    journal: Arc<dyn TradeRepository>,
    advisor: Option<Arc<dyn MakerTakerAdvisor>>,
    config: ExecutorConfig,
    dry_run: bool,
    advisor_failures: AtomicU64,
}

impl OrderExecutor {
    #[must_use]
    pub fn new(
        adapters: HashMap<VenueId, Arc<dyn VenueAdapter>>,
        risk: Arc<RiskManager>,
        journal: Arc<dyn TradeRepository>,
        advisor: Option<Arc<dyn MakerTakerAdvisor>>,
        config: ExecutorConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            adapters,
            risk,
            journal,
            advisor,
            config,
            dry_run,
            advisor_failures: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn advisor_failures(&self) -> u64 {
        self.advisor_failures.load(Ordering::SeqCst)
    }

    pub async fn execute(&self, opportunity: &ArbitrageOpportunity) -> ExecutionResult {
        let now_ms = Utc::now().timestamp_millis();

        if !opportunity.is_fresh(now_ms, self.config.max_snapshot_age_ms) {
            return ExecutionResult::Rejected { reason: RejectReason::Stale, detail: "snapshot older than max_snapshot_age_ms".to_string() };
        }

        if let Some(collapsed) = self.recheck_spread(opportunity).await {
            return collapsed;
        }

        let Some(buy_adapter) = self.adapters.get(opportunity.buy_venue()).cloned() else {
            return ExecutionResult::Failed { reason: FailReason::TransportError("no adapter for buy venue".to_string()), detail: String::new() };
        };
        let Some(sell_adapter) = self.adapters.get(opportunity.sell_venue()).cloned() else {
            return ExecutionResult::Failed { reason: FailReason::TransportError("no adapter for sell venue".to_string()), detail: String::new() };
        };

        let buy_balance = buy_adapter.get_balance(opportunity.symbol().quote()).await;
        let sell_balance = sell_adapter.get_balance(opportunity.symbol().base()).await;
        let required_buy = opportunity.quantity() * opportunity.buy_price();
        let required_sell = opportunity.quantity();
        let worst_case_loss = opportunity.quantity() * opportunity.buy_price() * Decimal::new(1, 2);

        if let Err(reason) = self.risk.pre_trade_check(
            opportunity.symbol(),
            opportunity.buy_venue(),
            opportunity.sell_venue(),
            opportunity.quantity(),
            worst_case_loss,
            worst_case_loss,
            buy_balance.map(|b| b.available).unwrap_or(Decimal::ZERO),
            sell_balance.map(|b| b.available).unwrap_or(Decimal::ZERO),
            required_buy,
            required_sell,
            now_ms,
        ) {
            return ExecutionResult::Rejected { reason, detail: format!("{reason:?}") };
        }

        let buy_post_only = self.consult_advisor(opportunity.buy_venue(), OrderSide::Buy, opportunity.quantity(), opportunity.buy_price()).await;
        let sell_post_only = self.consult_advisor(opportunity.sell_venue(), OrderSide::Sell, opportunity.quantity(), opportunity.sell_price()).await;

        if self.dry_run {
            info!(symbol = %opportunity.symbol(), "dry run: simulating execution without placing orders");
            return ExecutionResult::Timeout;
        }

        self.risk.commit_position(opportunity.buy_venue(), opportunity.quantity());
        self.risk.commit_position(opportunity.sell_venue(), opportunity.quantity());

        let (buy_result, sell_result) = tokio::join!(
            self.place_with_timeout(&buy_adapter, opportunity, OrderSide::Buy, buy_post_only),
            self.place_with_timeout(&sell_adapter, opportunity, OrderSide::Sell, sell_post_only),
        );

        self.risk.record_connectivity(opportunity.buy_venue(), buy_result.is_ok(), now_ms);
        self.risk.record_connectivity(opportunity.sell_venue(), sell_result.is_ok(), now_ms);

        let mut buy_leg = Leg { venue: opportunity.buy_venue().clone(), state: LegState::Unsubmitted, order: None };
        let mut sell_leg = Leg { venue: opportunity.sell_venue().clone(), state: LegState::Unsubmitted, order: None };

        match (buy_result, sell_result) {
            (Ok(order), Ok(other)) => {
                buy_leg.state = LegState::AckOpen;
                buy_leg.order = Some(order);
                sell_leg.state = LegState::AckOpen;
                sell_leg.order = Some(other);
            }
            (Ok(order), Err(_)) => {
                self.risk.release_position(&sell_leg.venue, opportunity.quantity());
                return self.handle_single_ack(&buy_adapter, order, &buy_leg.venue, opportunity).await;
            }
            (Err(_), Ok(order)) => {
                self.risk.release_position(&buy_leg.venue, opportunity.quantity());
                return self.handle_single_ack(&sell_adapter, order, &sell_leg.venue, opportunity).await;
            }
            (Err(_), Err(_)) => {
                self.risk.release_position(&buy_leg.venue, opportunity.quantity());
                self.risk.release_position(&sell_leg.venue, opportunity.quantity());
                return ExecutionResult::Failed { reason: FailReason::BothRejected, detail: "both legs rejected on submission".to_string() };
            }
        }

        let result = self.poll_to_completion(&buy_adapter, &sell_adapter, &mut buy_leg, &mut sell_leg, opportunity).await;

        self.risk.release_position(&buy_leg.venue, opportunity.quantity());
        self.risk.release_position(&sell_leg.venue, opportunity.quantity());

        if let Some(trade) = result.trade() {
            self.risk.record_trade_outcome(trade.realised_net_profit);
            self.journal.record_trade(trade).await;
        }

        result
    }

    async fn recheck_spread(&self, opportunity: &ArbitrageOpportunity) -> Option<ExecutionResult> {
        let Some(buy_adapter) = self.adapters.get(opportunity.buy_venue()) else {
            return None;
        };
        let Some(sell_adapter) = self.adapters.get(opportunity.sell_venue()) else {
            return None;
        };

        let (buy_book, sell_book) = tokio::join!(
            buy_adapter.fetch_orderbook(opportunity.symbol(), 1),
            sell_adapter.fetch_orderbook(opportunity.symbol(), 1),
        );

        let (Ok(buy_book), Ok(sell_book)) = (buy_book, sell_book) else {
            return None;
        };

        let (Some(ask), Some(bid)) = (buy_book.best_ask(), sell_book.best_bid()) else {
            return Some(ExecutionResult::Rejected { reason: RejectReason::SpreadCollapsed, detail: "one side has no liquidity".to_string() });
        };

        if ask.price() >= bid.price() {
            return Some(ExecutionResult::Rejected { reason: RejectReason::SpreadCollapsed, detail: "spread collapsed before execution".to_string() });
        }

        let quantity = ask.quantity().min(bid.quantity()).min(opportunity.quantity());
        let net_profit = quantity * (bid.price() - ask.price());
        if net_profit < self.config.min_profit_reference || quantity < self.config.min_order_size {
            return Some(ExecutionResult::Rejected { reason: RejectReason::SpreadCollapsed, detail: "net profit collapsed before execution".to_string() });
        }

        None
    }

    async fn consult_advisor(&self, venue: &VenueId, side: OrderSide, quantity: Decimal, price: Decimal) -> bool {
        let Some(advisor) = &self.advisor else {
            return false;
        };
        let features = LegFeatures { venue: venue.clone(), side, quantity, price };
        match advisor.advise_maker(&features).await {
            Ok(advice) => advice.use_maker,
            Err(err) => {
                self.advisor_failures.fetch_add(1, Ordering::SeqCst);
                warn!(%venue, error = %err, "maker/taker advisor failed, defaulting to taker");
                false
            }
        }
    }

    async fn place_with_timeout(
        &self,
        adapter: &Arc<dyn VenueAdapter>,
        opportunity: &ArbitrageOpportunity,
        side: OrderSide,
        post_only: bool,
    ) -> Result<Order, crate::error::VenueError> {
        let (price, order_type) = match side {
            OrderSide::Buy => (opportunity.buy_price(), OrderType::Limit),
            OrderSide::Sell => (opportunity.sell_price(), OrderType::Limit),
        };
        let adapter = adapter.clone();
        let symbol = opportunity.symbol().clone();
        let quantity = opportunity.quantity();

        let attempt = crate::core::exchange::retry_with_backoff(&crate::core::exchange::RetryPolicy { max_attempts: self.config.max_retries.max(1), ..Default::default() }, || {
            let adapter = adapter.clone();
            let symbol = symbol.clone();
            async move { adapter.place_order(&symbol, side, order_type, quantity, Some(price), post_only).await }
        });

        match tokio::time::timeout(self.config.net_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(crate::error::VenueError::NetworkError("order placement timed out".to_string())),
        }
    }

    async fn handle_single_ack(&self, adapter: &Arc<dyn VenueAdapter>, order: Order, venue: &VenueId, opportunity: &ArbitrageOpportunity) -> ExecutionResult {
        if let Some(id) = &order.venue_order_id {
            let _ = adapter.cancel_order(id, Some(&order.symbol)).await;
        }

        if order.filled_quantity > Decimal::ZERO {
            let exposure = Exposure { venue: venue.clone(), side: order.side, quantity: order.filled_quantity, currency: order.symbol.base().to_string() };
            let trade = TradeRecord {
                symbol: opportunity.symbol().clone(),
                buy_venue: opportunity.buy_venue().clone(),
                sell_venue: opportunity.sell_venue().clone(),
                buy_order_id: order.venue_order_id.clone(),
                sell_order_id: None,
                buy_fill_price: order.average_fill_price,
                sell_fill_price: None,
                matched_quantity: Decimal::ZERO,
                realised_net_profit: Decimal::ZERO,
                completed_at: Utc::now(),
            };
            self.journal.record_trade(&trade).await;
            return ExecutionResult::Partial { exposure, trade };
        }

        ExecutionResult::Failed { reason: FailReason::TransportError("one leg rejected, other cancelled with no fill".to_string()), detail: String::new() }
    }

    async fn poll_to_completion(
        &self,
        buy_adapter: &Arc<dyn VenueAdapter>,
        sell_adapter: &Arc<dyn VenueAdapter>,
        buy_leg: &mut Leg,
        sell_leg: &mut Leg,
        opportunity: &ArbitrageOpportunity,
    ) -> ExecutionResult {
        let deadline = tokio::time::Instant::now() + self.config.total_deadline;

        loop {
            self.refresh_leg(buy_adapter, buy_leg).await;
            self.refresh_leg(sell_adapter, sell_leg).await;

            let buy_done = buy_leg.order.as_ref().is_some_and(|o| o.status.is_terminal());
            let sell_done = sell_leg.order.as_ref().is_some_and(|o| o.status.is_terminal());

            if buy_done && sell_done {
                return self.reconcile(buy_leg, sell_leg, opportunity);
            }

            if tokio::time::Instant::now() >= deadline {
                self.cancel_leg(buy_adapter, buy_leg).await;
                self.cancel_leg(sell_adapter, sell_leg).await;
                if buy_leg.order.as_ref().is_some_and(|o| o.filled_quantity > Decimal::ZERO)
                    || sell_leg.order.as_ref().is_some_and(|o| o.filled_quantity > Decimal::ZERO)
                {
                    return self.reconcile(buy_leg, sell_leg, opportunity);
                }
                return ExecutionResult::Timeout;
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn refresh_leg(&self, adapter: &Arc<dyn VenueAdapter>, leg: &mut Leg) {
        let Some(order) = &leg.order else { return };
        if order.status.is_terminal() {
            return;
        }
        let Some(id) = order.venue_order_id.clone() else { return };
        match adapter.get_order(&id, Some(&order.symbol)).await {
            Ok(updated) => {
                leg.state = if updated.status.is_terminal() { LegState::Filled } else { LegState::Polling };
                leg.order = Some(updated);
            }
            Err(err) => {
                warn!(venue = %leg.venue, error = %err, "failed to poll order status");
            }
        }
    }

    async fn cancel_leg(&self, adapter: &Arc<dyn VenueAdapter>, leg: &mut Leg) {
        let Some(order) = &leg.order else { return };
        if order.status.is_terminal() {
            return;
        }
        if let Some(id) = order.venue_order_id.clone() {
            leg.state = LegState::CancelRequested;
            let _ = adapter.cancel_order(&id, Some(&order.symbol)).await;
            leg.state = LegState::Cancelled;
        }
    }

    fn reconcile(&self, buy_leg: &Leg, sell_leg: &Leg, opportunity: &ArbitrageOpportunity) -> ExecutionResult {
        let buy_filled = buy_leg.order.as_ref().map(|o| o.filled_quantity).unwrap_or(Decimal::ZERO);
        let sell_filled = sell_leg.order.as_ref().map(|o| o.filled_quantity).unwrap_or(Decimal::ZERO);
        let matched = buy_filled.min(sell_filled);

        let trade = TradeRecord {
            symbol: opportunity.symbol().clone(),
            buy_venue: buy_leg.venue.clone(),
            sell_venue: sell_leg.venue.clone(),
            buy_order_id: buy_leg.order.as_ref().and_then(|o| o.venue_order_id.clone()),
            sell_order_id: sell_leg.order.as_ref().and_then(|o| o.venue_order_id.clone()),
            buy_fill_price: buy_leg.order.as_ref().and_then(|o| o.average_fill_price),
            sell_fill_price: sell_leg.order.as_ref().and_then(|o| o.average_fill_price),
            matched_quantity: matched,
            realised_net_profit: matched * (opportunity.sell_price() - opportunity.buy_price()),
            completed_at: Utc::now(),
        };

        if buy_filled == sell_filled && buy_filled > Decimal::ZERO {
            return ExecutionResult::Success(trade);
        }

        if buy_filled != sell_filled && (buy_filled > Decimal::ZERO || sell_filled > Decimal::ZERO) {
            let (venue, side, quantity) = if buy_filled > sell_filled {
                (buy_leg.venue.clone(), OrderSide::Buy, buy_filled - sell_filled)
            } else {
                (sell_leg.venue.clone(), OrderSide::Sell, sell_filled - buy_filled)
            };
            let exposure = Exposure { venue, side, quantity, currency: opportunity.symbol().base().to_string() };
            return ExecutionResult::Partial { exposure, trade };
        }

        ExecutionResult::Timeout
    }
}
