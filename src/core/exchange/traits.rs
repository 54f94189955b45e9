//! The uniform venue capability surface (§4.2). One concrete adapter per
//! venue implements this trait; nothing above the adapter layer ever
//! matches on which venue it is talking to.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::domain::{Order, OrderId, OrderStatus, OrderType, Symbol, VenueId};
use crate::error::VenueError;

/// Available and locked balance for one currency on one venue.
#[derive(Debug, Clone, Copy)]
pub struct Balance {
    pub available: Decimal,
    pub locked: Decimal,
}

use crate::core::domain::OrderBookSnapshot;
use crate::core::domain::OrderSide;

#[async_trait]
pub trait VenueAdapter: Send + Sync {
    fn id(&self) -> &VenueId;

    /// Fetches a fresh order book snapshot. `depth` is clamped to whatever
    /// the venue supports; the returned snapshot has non-empty, sorted
    /// sides if the market exists.
    async fn fetch_orderbook(&self, symbol: &Symbol, depth: u32) -> Result<OrderBookSnapshot, VenueError>;

    /// Places an order. `post_only` is honoured only if
    /// [`VenueAdapter::supports_post_only`] is true; otherwise it is
    /// ignored and the caller is expected to record the downgrade.
    async fn place_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        post_only: bool,
    ) -> Result<Order, VenueError>;

    /// Idempotent for already-terminal orders: cancelling a filled or
    /// already-cancelled order returns `Ok(true)` rather than erroring.
    async fn cancel_order(&self, id: &OrderId, symbol: Option<&Symbol>) -> Result<bool, VenueError>;

    async fn get_order(&self, id: &OrderId, symbol: Option<&Symbol>) -> Result<Order, VenueError>;

    /// Used at startup for order recovery.
    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<Order>, VenueError>;

    async fn get_balance(&self, currency: &str) -> Result<Balance, VenueError>;

    fn maker_fee(&self) -> Decimal;
    fn taker_fee(&self) -> Decimal;
    fn supports_post_only(&self) -> bool;
    fn is_authenticated(&self) -> bool;
}

/// Whether a status represents an acknowledged (non-rejected) order.
#[must_use]
pub fn is_acknowledged(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Rejected | OrderStatus::Unknown)
}
