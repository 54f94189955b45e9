//! Order book snapshot types.

use rust_decimal::Decimal;

use super::symbol::Symbol;
use super::venue::VenueId;

/// A single `(price, quantity)` resting order. Both fields are strictly
/// positive; the book constructors enforce this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    price: Decimal,
    quantity: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }
}

/// An immutable order book reading at a point in time for one `(venue,
/// symbol)` pair. Bids are strictly price-descending, asks strictly
/// price-ascending; levels with non-positive price or quantity are dropped
/// by the constructor rather than trusted from the wire.
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    venue: VenueId,
    symbol: Symbol,
    timestamp_ms: i64,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Builds a snapshot from raw levels, sorting and filtering out
    /// non-positive entries so every invariant in the data model holds by
    /// construction rather than by caller discipline.
    #[must_use]
    pub fn new(
        venue: VenueId,
        symbol: Symbol,
        timestamp_ms: i64,
        mut bids: Vec<PriceLevel>,
        mut asks: Vec<PriceLevel>,
    ) -> Self {
        bids.retain(|l| l.price > Decimal::ZERO && l.quantity > Decimal::ZERO);
        asks.retain(|l| l.price > Decimal::ZERO && l.quantity > Decimal::ZERO);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        Self {
            venue,
            symbol,
            timestamp_ms,
            bids,
            asks,
        }
    }

    #[must_use]
    pub fn venue(&self) -> &VenueId {
        &self.venue
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    #[must_use]
    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    #[must_use]
    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    /// Whether this snapshot is still within the staleness budget as of
    /// `now_ms`. Exactly at the boundary counts as stale (strict `<`).
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64, max_age_ms: i64) -> bool {
        now_ms - self.timestamp_ms < max_age_ms
    }
}
