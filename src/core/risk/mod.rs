//! Circuit breakers and the composite pre-trade risk gate (§4.5).
//!
//! The three breaker kinds share one generic state machine, grounded on the
//! reconnecting-stream circuit state this core's origin used for deciding
//! whether a dropped connection may retry: `CLOSED -> OPEN{until} ->
//! HALF_OPEN -> CLOSED`, generalised here from "may this stream reconnect"
//! to "may this scope trade."

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::domain::{RejectReason, VenueId};
use crate::core::domain::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// One circuit breaker instance. `until_ms` is the timestamp at which an
/// `Open` breaker becomes eligible to probe into `HalfOpen`; a single
/// successful probe closes it, any failed probe reopens it for another full
/// cooldown.
pub struct CircuitBreaker {
    state: RwLock<BreakerState>,
    until_ms: AtomicI64,
    cooldown_ms: i64,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            state: RwLock::new(BreakerState::Closed),
            until_ms: AtomicI64::new(0),
            cooldown_ms,
        }
    }

    /// Advances `Open -> HalfOpen` once the cooldown has elapsed, then
    /// reports whether the scope may currently be used.
    #[must_use]
    pub fn poll(&self, now_ms: i64) -> BreakerState {
        let mut state = self.state.write();
        if *state == BreakerState::Open && now_ms >= self.until_ms.load(Ordering::SeqCst) {
            *state = BreakerState::HalfOpen;
        }
        *state
    }

    #[must_use]
    pub fn is_closed(&self, now_ms: i64) -> bool {
        matches!(self.poll(now_ms), BreakerState::Closed | BreakerState::HalfOpen)
    }

    pub fn trip(&self, now_ms: i64) {
        let mut state = self.state.write();
        if *state != BreakerState::Open {
            warn!(cooldown_ms = self.cooldown_ms, "circuit breaker tripped");
        }
        *state = BreakerState::Open;
        self.until_ms.store(now_ms + self.cooldown_ms, Ordering::SeqCst);
    }

    /// Feeds the result of a half-open probe. Success closes the breaker;
    /// failure reopens it for another full cooldown, preventing flapping.
    pub fn record_probe(&self, success: bool, now_ms: i64) {
        let mut state = self.state.write();
        if *state != BreakerState::HalfOpen {
            return;
        }
        if success {
            *state = BreakerState::Closed;
            info!("circuit breaker closed after successful probe");
        } else {
            *state = BreakerState::Open;
            self.until_ms.store(now_ms + self.cooldown_ms, Ordering::SeqCst);
        }
    }
}

/// Trips when the fractional price move over the configured window exceeds
/// `max_percent`.
pub struct VolatilityBreaker {
    breaker: CircuitBreaker,
    window_ms: i64,
    max_percent: Decimal,
    samples: RwLock<VecDeque<(i64, Decimal)>>,
}

impl VolatilityBreaker {
    #[must_use]
    pub fn new(window_ms: i64, max_percent: Decimal, cooldown_ms: i64) -> Self {
        Self {
            breaker: CircuitBreaker::new(cooldown_ms),
            window_ms,
            max_percent,
            samples: RwLock::new(VecDeque::new()),
        }
    }

    /// Records a new price observation and trips the breaker if the move
    /// relative to the oldest sample still inside the window exceeds the
    /// threshold.
    pub fn observe(&self, now_ms: i64, price: Decimal) {
        let mut samples = self.samples.write();
        samples.push_back((now_ms, price));
        while samples.front().is_some_and(|(ts, _)| now_ms - ts > self.window_ms) {
            samples.pop_front();
        }
        if let Some((_, reference)) = samples.front().copied() {
            if reference.is_zero() {
                return;
            }
            let moved = ((price - reference) / reference).abs();
            if moved > self.max_percent {
                self.breaker.trip(now_ms);
            }
        }
    }

    #[must_use]
    pub fn is_closed(&self, now_ms: i64) -> bool {
        self.breaker.is_closed(now_ms)
    }

    pub fn record_probe(&self, success: bool, now_ms: i64) {
        self.breaker.record_probe(success, now_ms);
    }
}

/// Trips after `failures_to_trip` consecutive connectivity failures on a
/// venue.
pub struct ConnectivityBreaker {
    breaker: CircuitBreaker,
    failures_to_trip: u32,
    consecutive_failures: RwLock<u32>,
}

impl ConnectivityBreaker {
    #[must_use]
    pub fn new(failures_to_trip: u32, cooldown_ms: i64) -> Self {
        Self {
            breaker: CircuitBreaker::new(cooldown_ms),
            failures_to_trip,
            consecutive_failures: RwLock::new(0),
        }
    }

    pub fn record(&self, success: bool, now_ms: i64) {
        let mut failures = self.consecutive_failures.write();
        if success {
            *failures = 0;
        } else {
            *failures += 1;
            if *failures >= self.failures_to_trip {
                self.breaker.trip(now_ms);
            }
        }
    }

    #[must_use]
    pub fn is_closed(&self, now_ms: i64) -> bool {
        self.breaker.is_closed(now_ms)
    }
}

/// Trips when the failure ratio over the last `window` operations exceeds
/// `max_ratio`, provided at least `min_samples` observations exist.
pub struct ErrorRateBreaker {
    breaker: CircuitBreaker,
    window: usize,
    min_samples: usize,
    max_ratio: Decimal,
    outcomes: RwLock<VecDeque<bool>>,
}

impl ErrorRateBreaker {
    #[must_use]
    pub fn new(window: usize, min_samples: usize, max_ratio: Decimal, cooldown_ms: i64) -> Self {
        Self {
            breaker: CircuitBreaker::new(cooldown_ms),
            window: window.max(1),
            min_samples,
            max_ratio,
            outcomes: RwLock::new(VecDeque::new()),
        }
    }

    pub fn record(&self, success: bool, now_ms: i64) {
        let mut outcomes = self.outcomes.write();
        outcomes.push_back(success);
        while outcomes.len() > self.window {
            outcomes.pop_front();
        }
        if outcomes.len() < self.min_samples {
            return;
        }
        let failures = outcomes.iter().filter(|s| !**s).count();
        let ratio = Decimal::from(failures as u64) / Decimal::from(outcomes.len() as u64);
        if ratio > self.max_ratio {
            self.breaker.trip(now_ms);
        }
    }

    #[must_use]
    pub fn is_closed(&self, now_ms: i64) -> bool {
        self.breaker.is_closed(now_ms)
    }
}

/// Configuration for the position and loss limits the composite gate
/// enforces. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub max_position_per_venue: Decimal,
    pub max_total_position: Decimal,
    pub daily_loss_limit: Decimal,
    pub per_trade_loss_limit: Decimal,
    pub max_drawdown: Decimal,
    pub balance_safety_margin: Decimal,
}

/// Mutable trading-day state: realised loss and drawdown, updated by the
/// executor after every terminal execution.
#[derive(Debug, Default)]
struct DayState {
    realised_loss: Decimal,
    drawdown_fraction: Decimal,
}

/// Per-venue committed position, tracked while legs are in flight so a
/// second concurrent opportunity cannot double-commit the same capital.
#[derive(Default)]
struct PositionBook {
    per_venue: DashMap<VenueId, Decimal>,
}

impl PositionBook {
    fn projected(&self, venue: &VenueId, additional: Decimal) -> Decimal {
        self.per_venue.get(venue).map(|v| *v).unwrap_or(Decimal::ZERO) + additional
    }

    fn commit(&self, venue: &VenueId, quantity: Decimal) {
        *self.per_venue.entry(venue.clone()).or_insert(Decimal::ZERO) += quantity;
    }

    fn release(&self, venue: &VenueId, quantity: Decimal) {
        if let Some(mut entry) = self.per_venue.get_mut(venue) {
            *entry -= quantity;
        }
    }

    fn total(&self) -> Decimal {
        self.per_venue.iter().map(|e| *e).sum()
    }
}

/// Composes the three breaker kinds plus position/loss bookkeeping behind
/// one shared manager, grounded on the origin's single risk-aware state
/// object sitting alongside the rest of shared application state.
pub struct RiskManager {
    limits: RiskLimits,
    volatility: DashMap<Symbol, VolatilityBreaker>,
    connectivity: DashMap<VenueId, ConnectivityBreaker>,
    error_rate: DashMap<VenueId, ErrorRateBreaker>,
    positions: PositionBook,
    day: RwLock<DayState>,
    volatility_window_ms: i64,
    volatility_max_percent: Decimal,
    volatility_cooldown_ms: i64,
    connectivity_failures_to_trip: u32,
    connectivity_cooldown_ms: i64,
    error_rate_window: usize,
    error_rate_min_samples: usize,
    error_rate_max: Decimal,
    error_rate_cooldown_ms: i64,
}

impl RiskManager {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        limits: RiskLimits,
        volatility_window_ms: i64,
        volatility_max_percent: Decimal,
        volatility_cooldown_ms: i64,
        connectivity_failures_to_trip: u32,
        connectivity_cooldown_ms: i64,
        error_rate_window: usize,
        error_rate_min_samples: usize,
        error_rate_max: Decimal,
        error_rate_cooldown_ms: i64,
    ) -> Self {
        Self {
            limits,
            volatility: DashMap::new(),
            connectivity: DashMap::new(),
            error_rate: DashMap::new(),
            positions: PositionBook::default(),
            day: RwLock::new(DayState::default()),
            volatility_window_ms,
            volatility_max_percent,
            volatility_cooldown_ms,
            connectivity_failures_to_trip,
            connectivity_cooldown_ms,
            error_rate_window,
            error_rate_min_samples,
            error_rate_max,
            error_rate_cooldown_ms,
        }
    }

    pub fn observe_price(&self, symbol: &Symbol, price: Decimal, now_ms: i64) {
        self.volatility
            .entry(symbol.clone())
            .or_insert_with(|| VolatilityBreaker::new(self.volatility_window_ms, self.volatility_max_percent, self.volatility_cooldown_ms))
            .observe(now_ms, price);
    }

    pub fn record_connectivity(&self, venue: &VenueId, success: bool, now_ms: i64) {
        self.connectivity
            .entry(venue.clone())
            .or_insert_with(|| ConnectivityBreaker::new(self.connectivity_failures_to_trip, self.connectivity_cooldown_ms))
            .record(success, now_ms);
        self.error_rate
            .entry(venue.clone())
            .or_insert_with(|| ErrorRateBreaker::new(self.error_rate_window, self.error_rate_min_samples, self.error_rate_max, self.error_rate_cooldown_ms))
            .record(success, now_ms);
    }

    pub fn record_trade_outcome(&self, realised_profit: Decimal) {
        let mut day = self.day.write();
        if realised_profit < Decimal::ZERO {
            day.realised_loss += -realised_profit;
        }
    }

    pub fn commit_position(&self, venue: &VenueId, quantity: Decimal) {
        self.positions.commit(venue, quantity);
    }

    pub fn release_position(&self, venue: &VenueId, quantity: Decimal) {
        self.positions.release(venue, quantity);
    }

    /// Runs the eight pre-trade checks in order, returning the first
    /// failure. `worst_case_loss` and `per_trade_loss_estimate` are supplied
    /// by the caller since they depend on the specific opportunity's
    /// slippage assumptions.
    #[allow(clippy::too_many_arguments)]
    pub fn pre_trade_check(
        &self,
        symbol: &Symbol,
        buy_venue: &VenueId,
        sell_venue: &VenueId,
        quantity: Decimal,
        worst_case_loss: Decimal,
        per_trade_loss_estimate: Decimal,
        available_buy_balance: Decimal,
        available_sell_balance: Decimal,
        required_buy: Decimal,
        required_sell: Decimal,
        now_ms: i64,
    ) -> Result<(), RejectReason> {
        for venue in [buy_venue, sell_venue] {
            if let Some(c) = self.connectivity.get(venue) {
                if !c.is_closed(now_ms) {
                    return Err(RejectReason::ConnectivityBreaker);
                }
            }
            if let Some(e) = self.error_rate.get(venue) {
                if !e.is_closed(now_ms) {
                    return Err(RejectReason::ErrorRateBreaker);
                }
            }
        }

        if let Some(v) = self.volatility.get(symbol) {
            if !v.is_closed(now_ms) {
                return Err(RejectReason::VolatilityBreaker);
            }
        }

        if self.positions.projected(buy_venue, quantity) > self.limits.max_position_per_venue
            || self.positions.projected(sell_venue, quantity) > self.limits.max_position_per_venue
        {
            return Err(RejectReason::PositionLimitExceeded);
        }

        if self.positions.total() + quantity + quantity > self.limits.max_total_position {
            return Err(RejectReason::PositionLimitExceeded);
        }

        let day = self.day.read();
        if day.realised_loss + worst_case_loss > self.limits.daily_loss_limit {
            return Err(RejectReason::DailyLossLimitExceeded);
        }
        if per_trade_loss_estimate > self.limits.per_trade_loss_limit {
            return Err(RejectReason::PerTradeLossLimitExceeded);
        }
        if day.drawdown_fraction > self.limits.max_drawdown {
            return Err(RejectReason::DrawdownExceeded);
        }
        drop(day);

        let margin = Decimal::ONE + self.limits.balance_safety_margin;
        if available_buy_balance < required_buy * margin || available_sell_balance < required_sell * margin {
            return Err(RejectReason::InsufficientBalance);
        }

        Ok(())
    }
}
