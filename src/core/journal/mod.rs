//! Trade journaling hook (§4.7): append-only, best-effort write-through to
//! an external repository. Failures are logged, never propagated to the
//! caller, matching "journaling failures must not alter the trade outcome."

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::core::domain::{Order, TradeRecord};

/// Feature values captured alongside a trade attempt, for offline model
/// training. Deliberately untyped beyond string keys; the core does not
/// interpret these values itself.
#[derive(Debug, Clone, Serialize)]
pub struct TradeFeatures {
    pub symbol: String,
    pub recorded_at: DateTime<Utc>,
    pub values: Vec<(String, f64)>,
}

/// Outbound repository interface. Append-only; no read surface, matching
/// "read-only query surface is out of scope for the core."
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn record_order(&self, order: &Order);
    async fn record_trade(&self, trade: &TradeRecord);
    async fn record_features(&self, features: &TradeFeatures);
}

/// In-memory reference implementation: an `Arc<RwLock<Vec<_>>>` behind the
/// trait, with no cross-call invariants beyond insertion order. Intended for
/// tests and the `dry-run`/`paper` journal modes.
#[derive(Default)]
pub struct MemoryJournal {
    orders: parking_lot::RwLock<Vec<Order>>,
    trades: parking_lot::RwLock<Vec<TradeRecord>>,
    features: parking_lot::RwLock<Vec<TradeFeatures>>,
}

impl MemoryJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.orders.read().clone()
    }

    #[must_use]
    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.read().clone()
    }

    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.trades.read().len()
    }
}

#[async_trait]
impl TradeRepository for MemoryJournal {
    async fn record_order(&self, order: &Order) {
        self.orders.write().push(order.clone());
    }

    async fn record_trade(&self, trade: &TradeRecord) {
        self.trades.write().push(trade.clone());
    }

    async fn record_features(&self, features: &TradeFeatures) {
        self.features.write().push(features.clone());
    }
}

/// Appends newline-delimited JSON to a file. Chosen over a relational store
/// because the journal is append-only and schema-free; `serde_json` line
/// writes are a direct fit and there is no query surface to justify a
/// database.
pub struct FileJournal {
    path: std::path::PathBuf,
}

impl FileJournal {
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn append_line(&self, value: &impl Serialize) {
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "failed to serialize journal record");
                return;
            }
        };
        use tokio::io::AsyncWriteExt;
        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await;
        match file {
            Ok(mut file) => {
                if let Err(err) = file.write_all(format!("{line}\n").as_bytes()).await {
                    error!(error = %err, path = %self.path.display(), "failed to append to journal file");
                }
            }
            Err(err) => {
                error!(error = %err, path = %self.path.display(), "failed to open journal file");
            }
        }
    }
}

#[derive(Serialize)]
struct SerializableOrder<'a> {
    venue: &'a str,
    symbol: String,
    status: &'static str,
    filled_quantity: String,
}

#[derive(Serialize)]
struct SerializableTrade<'a> {
    symbol: String,
    buy_venue: &'a str,
    sell_venue: &'a str,
    matched_quantity: String,
    realised_net_profit: String,
    completed_at: DateTime<Utc>,
}

#[async_trait]
impl TradeRepository for FileJournal {
    async fn record_order(&self, order: &Order) {
        let record = SerializableOrder {
            venue: order.venue.as_str(),
            symbol: order.symbol.to_string(),
            status: status_label(order.status),
            filled_quantity: order.filled_quantity.to_string(),
        };
        self.append_line(&record).await;
    }

    async fn record_trade(&self, trade: &TradeRecord) {
        let record = SerializableTrade {
            symbol: trade.symbol.to_string(),
            buy_venue: trade.buy_venue.as_str(),
            sell_venue: trade.sell_venue.as_str(),
            matched_quantity: trade.matched_quantity.to_string(),
            realised_net_profit: trade.realised_net_profit.to_string(),
            completed_at: trade.completed_at,
        };
        self.append_line(&record).await;
    }

    async fn record_features(&self, features: &TradeFeatures) {
        self.append_line(features).await;
    }
}

fn status_label(status: crate::core::domain::OrderStatus) -> &'static str {
    use crate::core::domain::OrderStatus::*;
    match status {
        Pending => "pending",
        Open => "open",
        PartiallyFilled => "partially_filled",
        Filled => "filled",
        Cancelled => "cancelled",
        Rejected => "rejected",
        Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{canonicalise, OrderSide, OrderType, VenueId};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn memory_journal_records_in_insertion_order() {
        let journal = MemoryJournal::new();
        let order = Order::new(VenueId::new("A"), canonicalise("BTC-USDT").unwrap(), OrderSide::Buy, OrderType::Limit, dec!(1), Some(dec!(100)), Utc::now());
        journal.record_order(&order).await;
        assert_eq!(journal.orders().len(), 1);
        assert_eq!(journal.trade_count(), 0);
    }

    #[tokio::test]
    async fn file_journal_appends_newline_delimited_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.ndjson");
        let journal = FileJournal::new(&path);

        let trade = TradeRecord {
            symbol: canonicalise("BTC-USDT").unwrap(),
            buy_venue: VenueId::new("A"),
            sell_venue: VenueId::new("B"),
            buy_order_id: None,
            sell_order_id: None,
            buy_fill_price: Some(dec!(65000)),
            sell_fill_price: Some(dec!(65300)),
            matched_quantity: dec!(1),
            realised_net_profit: dec!(169.67),
            completed_at: Utc::now(),
        };
        journal.record_trade(&trade).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"matched_quantity\":\"1\""));
    }
}
