//! Trade record: the journaled artifact of one completed execution attempt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::order::OrderId;
use super::symbol::Symbol;
use super::venue::VenueId;

/// Created once both legs of an execution reach a terminal state. Links the
/// two final orders and the realised economics of the trade. Never retained
/// by the core after being handed to the journal.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub buy_venue: VenueId,
    pub sell_venue: VenueId,
    pub buy_order_id: Option<OrderId>,
    pub sell_order_id: Option<OrderId>,
    pub buy_fill_price: Option<Decimal>,
    pub sell_fill_price: Option<Decimal>,
    /// `min(final_filled_buy, final_filled_sell)`: the portion of the trade
    /// actually arbitraged.
    pub matched_quantity: Decimal,
    pub realised_net_profit: Decimal,
    pub completed_at: DateTime<Utc>,
}
