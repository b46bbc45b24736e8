//! In-memory repository and publisher.
//!
//! [`MemoryRepository`] is the reference [`OrderRepository`]: a hash map of
//! orders plus an append-only trade log deduplicated by `trade_id`. It
//! backs the test suite and single-process deployments that do not need
//! durable storage. [`RecordingPublisher`] captures published trades for
//! inspection.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;

use bazaar_types::{BazaarError, MarketKey, Order, OrderId, Result, Trade, TradeId};

use crate::repository::{EventPublisher, OrderRepository};

#[derive(Debug, Default)]
struct Store {
    orders: HashMap<OrderId, Order>,
    trades: Vec<Trade>,
    trade_ids: HashSet<TradeId>,
}

/// Hash-map-backed order and trade store, idempotent on `trade_id`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // Store mutations never panic, so the lock cannot be poisoned.
        self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current state of one order, if ever saved.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.lock().orders.get(order_id).cloned()
    }

    /// All recorded trades, in commit order.
    #[must_use]
    pub fn trades(&self) -> Vec<Trade> {
        self.lock().trades.clone()
    }

    /// Number of recorded trades.
    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.lock().trades.len()
    }
}

impl OrderRepository for MemoryRepository {
    fn load_active_orders(
        &self,
        market: &MarketKey,
    ) -> impl Future<Output = Result<Vec<Order>>> + Send {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .values()
            .filter(|o| o.market() == *market && o.is_active())
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.sequence);
        async move { Ok(orders) }
    }

    fn save_order(&self, order: &Order) -> impl Future<Output = Result<()>> + Send {
        self.lock().orders.insert(order.id, order.clone());
        async { Ok(()) }
    }

    fn save_fill(
        &self,
        taker: &Order,
        maker: &Order,
        trade: &Trade,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = {
            let mut store = self.lock();
            // Orders reflect the latest state either way; only the trade
            // record is deduplicated.
            store.orders.insert(taker.id, taker.clone());
            store.orders.insert(maker.id, maker.clone());
            if store.trade_ids.insert(trade.id) {
                store.trades.push(trade.clone());
                Ok(())
            } else {
                Err(BazaarError::TradeAlreadyRecorded(trade.id))
            }
        };
        async move { result }
    }
}

/// Publisher that records every trade it is handed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Trade>>,
}

impl RecordingPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn published(&self) -> Vec<Trade> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish_trade(&self, trade: &Trade) -> impl Future<Output = Result<()>> + Send {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(trade.clone());
        async { Ok(()) }
    }
}
