//! In-memory order book cache, keyed on `(venue, symbol)`.
//!
//! Grounded on the reference architecture's `OrderBookCache`: a
//! `RwLock<HashMap<_, _>>` guarded only for the duration of the read/write,
//! plus an optional broadcast channel so subscribers see every update
//! without polling the map themselves.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::core::domain::{OrderBookSnapshot, Symbol, VenueId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey(VenueId, Symbol);

/// Shared, thread-safe store of the latest snapshot per `(venue, symbol)`.
/// Cloning an `OrderBookCache` shares the underlying map and channel.
#[derive(Clone)]
pub struct OrderBookCache {
    inner: Arc<RwLock<HashMap<CacheKey, OrderBookSnapshot>>>,
    updates: broadcast::Sender<OrderBookSnapshot>,
}

impl OrderBookCache {
    #[must_use]
    pub fn new(subscriber_capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(subscriber_capacity.max(1));
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            updates,
        }
    }

    /// Inserts a snapshot, replacing whatever was there for this key, and
    /// fans it out to subscribers. A lagging subscriber simply misses
    /// intermediate updates; it never blocks this call.
    pub fn insert(&self, snapshot: OrderBookSnapshot) {
        let key = CacheKey(snapshot.venue().clone(), snapshot.symbol().clone());
        self.inner.write().insert(key, snapshot.clone());
        let _ = self.updates.send(snapshot);
    }

    #[must_use]
    pub fn get(&self, venue: &VenueId, symbol: &Symbol) -> Option<OrderBookSnapshot> {
        self.inner.read().get(&CacheKey(venue.clone(), symbol.clone())).cloned()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderBookSnapshot> {
        self.updates.subscribe()
    }

    /// Snapshot of every cached entry, in no particular order. Used by the
    /// scan loop, which re-reads the whole cache once per tick rather than
    /// tracking individual key churn.
    #[must_use]
    pub fn all(&self) -> Vec<OrderBookSnapshot> {
        self.inner.read().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
