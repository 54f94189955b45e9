//! Periodic order book refresh across a configured set of `(venue, symbol)`
//! pairs, fanning fresh snapshots out through [`OrderBookCache`].
//!
//! One task per pair, each gated by a per-venue [`Semaphore`] so the total
//! number of outstanding requests to a single venue never exceeds its
//! configured concurrency cap, matching the connection-pool / rate-limit
//! discipline this core inherited from its origin's governor/pool code
//! (carried over as a semaphore, not the pooled-connection machinery
//! itself, since this stream polls REST rather than holding long-lived
//! sockets).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::cache::OrderBookCache;
use crate::core::domain::{OrderBookSnapshot, Symbol, VenueId};
use crate::core::exchange::VenueAdapter;

/// Per-pair lifecycle. `Stopped` is entered after too many consecutive
/// failures and is not automatically re-entered into `Fetching`; the pair
/// stays dark until the stream is restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Idle,
    Fetching,
    Fresh,
    Stale,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey(VenueId, Symbol);

pub struct PriceStream {
    adapters: HashMap<VenueId, Arc<dyn VenueAdapter>>,
    pairs: Vec<(VenueId, Symbol)>,
    cache: OrderBookCache,
    poll_interval: Duration,
    max_age_ms: i64,
    depth: u32,
    max_consecutive_failures: u32,
    semaphores: HashMap<VenueId, Arc<Semaphore>>,
    states: Arc<RwLock<HashMap<PairKey, PairState>>>,
    shutdown: CancellationToken,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl PriceStream {
    #[must_use]
    pub fn new(
        adapters: HashMap<VenueId, Arc<dyn VenueAdapter>>,
        pairs: Vec<(VenueId, Symbol)>,
        cache: OrderBookCache,
        poll_interval: Duration,
        max_age_ms: i64,
        depth: u32,
        per_venue_concurrency: usize,
        max_consecutive_failures: u32,
    ) -> Self {
        let semaphores = adapters
            .keys()
            .map(|v| (v.clone(), Arc::new(Semaphore::new(per_venue_concurrency.max(1)))))
            .collect();
        let states = pairs
            .iter()
            .map(|(v, s)| (PairKey(v.clone(), s.clone()), PairState::Idle))
            .collect();

        Self {
            adapters,
            pairs,
            cache,
            poll_interval,
            max_age_ms,
            depth,
            max_consecutive_failures,
            semaphores,
            states: Arc::new(RwLock::new(states)),
            shutdown: CancellationToken::new(),
            handles: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderBookSnapshot> {
        self.cache.subscribe()
    }

    #[must_use]
    pub fn state_of(&self, venue: &VenueId, symbol: &Symbol) -> Option<PairState> {
        self.states.read().get(&PairKey(venue.clone(), symbol.clone())).copied()
    }

    /// Spawns one refresh loop per configured pair. Idempotent calls would
    /// double-spawn; callers must only call this once per stream instance.
    pub async fn start(&self) {
        let mut handles = self.handles.lock().await;
        for (venue, symbol) in self.pairs.clone() {
            let Some(adapter) = self.adapters.get(&venue).cloned() else {
                warn!(%venue, "no adapter configured for pair, skipping");
                continue;
            };
            let Some(semaphore) = self.semaphores.get(&venue).cloned() else {
                continue;
            };
            let cache = self.cache.clone();
            let states = self.states.clone();
            let shutdown = self.shutdown.clone();
            let poll_interval = self.poll_interval;
            let max_age_ms = self.max_age_ms;
            let depth = self.depth;
            let max_failures = self.max_consecutive_failures;
            let key = PairKey(venue.clone(), symbol.clone());

            handles.push(tokio::spawn(async move {
                let mut consecutive_failures = 0u32;
                loop {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    set_state(&states, &key, PairState::Fetching);

                    let permit = tokio::select! {
                        permit = semaphore.acquire() => permit,
                        _ = shutdown.cancelled() => break,
                    };
                    let Ok(_permit) = permit else { break };

                    match adapter.fetch_orderbook(&symbol, depth).await {
                        Ok(snapshot) => {
                            consecutive_failures = 0;
                            let fresh = snapshot.is_fresh(snapshot.timestamp_ms(), max_age_ms);
                            set_state(&states, &key, if fresh { PairState::Fresh } else { PairState::Stale });
                            debug!(%venue, %symbol, ts = snapshot.timestamp_ms(), "refreshed order book");
                            cache.insert(snapshot);
                        }
                        Err(err) => {
                            consecutive_failures += 1;
                            warn!(%venue, %symbol, error = %err, consecutive_failures, "order book refresh failed");
                            set_state(&states, &key, PairState::Stale);
                            if consecutive_failures >= max_failures {
                                warn!(%venue, %symbol, "too many consecutive failures, stopping pair");
                                set_state(&states, &key, PairState::Stopped);
                                break;
                            }
                        }
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(poll_interval) => {},
                        _ = shutdown.cancelled() => break,
                    }
                }
                info!(%venue, %symbol, "price stream task exiting");
            }));
        }
    }

    /// Signals every refresh task to stop and waits for them to finish, up
    /// to `timeout`. Tasks still running past the deadline are abandoned
    /// (not forcibly killed) rather than blocking shutdown indefinitely.
    pub async fn stop(&self, timeout: Duration) {
        self.shutdown.cancel();
        let mut handles = self.handles.lock().await;
        let joins = handles.drain(..).collect::<Vec<_>>();
        let _ = tokio::time::timeout(timeout, futures::future::join_all(joins)).await;
    }
}

fn set_state(states: &Arc<RwLock<HashMap<PairKey, PairState>>>, key: &PairKey, state: PairState) {
    states.write().insert(key.clone(), state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::canonicalise;
    use crate::core::exchange::Balance;
    use crate::error::VenueError;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingAdapter {
        id: VenueId,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl VenueAdapter for CountingAdapter {
        fn id(&self) -> &VenueId {
            &self.id
        }
        async fn fetch_orderbook(&self, symbol: &Symbol, _depth: u32) -> Result<OrderBookSnapshot, VenueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(OrderBookSnapshot::new(
                self.id.clone(),
                symbol.clone(),
                0,
                vec![crate::core::domain::PriceLevel::new(dec!(100), dec!(1))],
                vec![crate::core::domain::PriceLevel::new(dec!(101), dec!(1))],
            ))
        }
        async fn place_order(
            &self,
            _s: &Symbol,
            _side: crate::core::domain::OrderSide,
            _t: crate::core::domain::OrderType,
            _q: Decimal,
            _p: Option<Decimal>,
            _po: bool,
        ) -> Result<crate::core::domain::Order, VenueError> {
            unimplemented!()
        }
        async fn cancel_order(&self, _id: &crate::core::domain::OrderId, _s: Option<&Symbol>) -> Result<bool, VenueError> {
            unimplemented!()
        }
        async fn get_order(&self, _id: &crate::core::domain::OrderId, _s: Option<&Symbol>) -> Result<crate::core::domain::Order, VenueError> {
            unimplemented!()
        }
        async fn get_open_orders(&self, _s: Option<&Symbol>) -> Result<Vec<crate::core::domain::Order>, VenueError> {
            Ok(Vec::new())
        }
        async fn get_balance(&self, _c: &str) -> Result<Balance, VenueError> {
            unimplemented!()
        }
        fn maker_fee(&self) -> Decimal {
            Decimal::ZERO
        }
        fn taker_fee(&self) -> Decimal {
            Decimal::ZERO
        }
        fn supports_post_only(&self) -> bool {
            false
        }
        fn is_authenticated(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn publishes_a_snapshot_then_stops_cleanly() {
        let calls = Arc::new(AtomicU32::new(0));
        let venue = VenueId::new("A");
        let symbol = canonicalise("BTC-USDT").unwrap();
        let mut adapters: HashMap<VenueId, Arc<dyn VenueAdapter>> = HashMap::new();
        adapters.insert(venue.clone(), Arc::new(CountingAdapter { id: venue.clone(), calls: calls.clone() }));

        let cache = OrderBookCache::new(8);
        let stream = PriceStream::new(
            adapters,
            vec![(venue.clone(), symbol.clone())],
            cache,
            Duration::from_millis(5),
            60_000,
            10,
            4,
            3,
        );
        let mut rx = stream.subscribe();
        stream.start().await;

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(received.is_ok());

        stream.stop(Duration::from_secs(1)).await;
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(stream.state_of(&venue, &symbol), Some(PairState::Fresh));
    }
}
