//! Order lifecycle types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::symbol::Symbol;
use super::venue::VenueId;

/// Unique identifier for an order, venue-assigned once acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

/// Status never regresses from a terminal state
/// (`Filled`/`Cancelled`/`Rejected`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Unknown,
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }
}

/// An order placed on a single venue. Created on submission and mutated only
/// by status-poll results; never regresses from a terminal status.
#[derive(Debug, Clone)]
pub struct Order {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub venue_order_id: Option<OrderId>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub average_fill_price: Option<Decimal>,
    pub observed_fee: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn new(
        venue: VenueId,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            venue,
            symbol,
            side,
            order_type,
            quantity,
            limit_price,
            venue_order_id: None,
            status: OrderStatus::Pending,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            observed_fee: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a status-poll result. Once terminal, the order is frozen:
    /// later calls with a different status are ignored rather than
    /// regressing the order, matching the "never regresses" invariant.
    pub fn apply_update(
        &mut self,
        status: OrderStatus,
        filled_quantity: Decimal,
        average_fill_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) {
        if self.status.is_terminal() {
            self.updated_at = now;
            return;
        }
        self.status = status;
        self.filled_quantity = filled_quantity;
        if average_fill_price.is_some() {
            self.average_fill_price = average_fill_price;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        Order::new(
            VenueId::new("a"),
            super::super::symbol::canonicalise("BTC-USDT").unwrap(),
            OrderSide::Buy,
            OrderType::Limit,
            dec!(1),
            Some(dec!(65000)),
            Utc::now(),
        )
    }

    #[test]
    fn new_order_starts_pending_and_unfilled() {
        let o = sample_order();
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.filled_quantity, Decimal::ZERO);
    }

    #[test]
    fn terminal_status_never_regresses() {
        let mut o = sample_order();
        o.apply_update(OrderStatus::Filled, dec!(1), Some(dec!(65000)), Utc::now());
        assert_eq!(o.status, OrderStatus::Filled);

        o.apply_update(OrderStatus::Cancelled, dec!(0), None, Utc::now());
        assert_eq!(o.status, OrderStatus::Filled, "terminal status must not regress");
        assert_eq!(o.filled_quantity, dec!(1));
    }

    #[test]
    fn filled_quantity_never_exceeds_quantity_in_practice() {
        let mut o = sample_order();
        o.apply_update(OrderStatus::PartiallyFilled, dec!(0.5), Some(dec!(65000)), Utc::now());
        assert!(o.filled_quantity <= o.quantity);
    }
}
