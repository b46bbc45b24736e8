//! The public engine API.
//!
//! [`Engine`] is the front door: it validates orders before anything is
//! queued, lazily warm-starts one [`MarketCoordinator`] per market, routes
//! submits/cancels to the owning market task, and tracks which orders are
//! mid-match so a cancel can never race its own submit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bazaar_types::{
    BazaarError, EngineConfig, MarketKey, MatchOutcome, Order, OrderBookView, OrderId, Result,
};
use chrono::Utc;
use tokio::sync::Mutex;

use crate::coordinator::MarketCoordinator;
use crate::repository::{EventPublisher, OrderRepository};

/// Order intake, routing, and lifecycle tracking over a set of
/// independently running market tasks.
pub struct Engine<R, P> {
    repo: Arc<R>,
    publisher: Arc<P>,
    config: EngineConfig,
    /// One coordinator per market, created on first touch.
    markets: Mutex<HashMap<MarketKey, Arc<MarketCoordinator>>>,
    /// Which market currently holds each routed order.
    routes: Mutex<HashMap<OrderId, MarketKey>>,
    /// Orders whose submit is currently in flight.
    in_flight: Mutex<HashSet<OrderId>>,
    stopped: AtomicBool,
}

impl<R: OrderRepository, P: EventPublisher> Engine<R, P> {
    #[must_use]
    pub fn new(repo: R, publisher: P) -> Self {
        Self::with_config(repo, publisher, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(repo: R, publisher: P, config: EngineConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            publisher: Arc::new(publisher),
            config,
            markets: Mutex::new(HashMap::new()),
            routes: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Validate, route, and match an order.
    ///
    /// Validation failures are rejected here, before the coordinator queue,
    /// so an invalid order is never partially applied. Partially filled
    /// orders may be resubmitted (e.g. after a
    /// [`BazaarError::PartialCommit`]); matching resumes from their
    /// remaining quantity.
    pub async fn submit_order(&self, order: Order) -> Result<MatchOutcome> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(BazaarError::EngineStopped);
        }
        order.validate(Utc::now())?;

        let order_id = order.id;
        let market = order.market();

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(order_id) {
                return Err(BazaarError::AlreadyProcessing(order_id));
            }
        }

        let result = async {
            let coordinator = self.market_handle(market).await?;
            coordinator.submit(order).await
        }
        .await;

        self.in_flight.lock().await.remove(&order_id);

        if let Ok(outcome) = &result {
            let mut routes = self.routes.lock().await;
            for id in &outcome.completed {
                routes.remove(id);
            }
            if outcome.order.is_active() {
                routes.insert(order_id, market);
            } else {
                routes.remove(&order_id);
            }
        }
        result
    }

    /// Cancel a resting order.
    ///
    /// Returns [`BazaarError::AlreadyProcessing`] while the order's own
    /// submit is still in flight, and [`BazaarError::OrderNotFound`] if the
    /// engine no longer routes the order (filled, expired, cancelled, or
    /// never seen).
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(BazaarError::EngineStopped);
        }
        if self.in_flight.lock().await.contains(&order_id) {
            return Err(BazaarError::AlreadyProcessing(order_id));
        }

        let market = self
            .routes
            .lock()
            .await
            .get(&order_id)
            .copied()
            .ok_or(BazaarError::OrderNotFound(order_id))?;
        let coordinator = self
            .markets
            .lock()
            .await
            .get(&market)
            .cloned()
            .ok_or(BazaarError::OrderNotFound(order_id))?;

        match coordinator.cancel(order_id).await {
            Ok(order) => {
                self.routes.lock().await.remove(&order_id);
                Ok(order)
            }
            Err(err) => {
                if matches!(err, BazaarError::OrderNotFound(_)) {
                    // Stale route: the order left the book without us seeing
                    // it (e.g. expired during another player's submit).
                    self.routes.lock().await.remove(&order_id);
                }
                Err(err)
            }
        }
    }

    /// Eventually consistent snapshot of one market's book.
    ///
    /// Touches the market, so after a restart this reflects the
    /// warm-started resting orders.
    pub async fn snapshot(&self, market: MarketKey) -> Result<OrderBookView> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(BazaarError::EngineStopped);
        }
        let coordinator = self.market_handle(market).await?;
        coordinator.snapshot().await
    }

    /// Stop accepting requests and wait for every market task to drain.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let coordinators: Vec<Arc<MarketCoordinator>> =
            self.markets.lock().await.drain().map(|(_, c)| c).collect();
        for coordinator in coordinators {
            coordinator.shutdown().await;
        }
        tracing::info!("engine stopped");
    }

    /// Get or warm-start the coordinator for `market`.
    ///
    /// The markets lock is never held across the (potentially slow) warm
    /// start, so one market's load cannot stall another market's traffic;
    /// a lost creation race simply discards the extra coordinator.
    async fn market_handle(&self, market: MarketKey) -> Result<Arc<MarketCoordinator>> {
        {
            let markets = self.markets.lock().await;
            if let Some(coordinator) = markets.get(&market) {
                return Ok(coordinator.clone());
            }
        }

        let (coordinator, loaded) = MarketCoordinator::spawn(
            market,
            self.repo.clone(),
            self.publisher.clone(),
            self.config.clone(),
        )
        .await?;
        let coordinator = Arc::new(coordinator);

        let mut markets = self.markets.lock().await;
        if let Some(existing) = markets.get(&market) {
            let existing = existing.clone();
            drop(markets);
            coordinator.shutdown().await;
            return Ok(existing);
        }
        markets.insert(market, coordinator.clone());
        drop(markets);

        if !loaded.is_empty() {
            let mut routes = self.routes.lock().await;
            routes.extend(loaded.into_iter().map(|id| (id, market)));
        }
        Ok(coordinator)
    }
}

#[cfg(test)]
mod tests {
    use bazaar_types::{ItemId, OrderSide, OrderStatus, TradingMode};

    use crate::memory::{MemoryRepository, RecordingPublisher};

    use super::*;

    fn engine() -> Engine<MemoryRepository, RecordingPublisher> {
        Engine::new(MemoryRepository::new(), RecordingPublisher::new())
    }

    fn market() -> MarketKey {
        MarketKey::new(ItemId::new(), TradingMode::OpenMarket)
    }

    #[tokio::test]
    async fn invalid_order_rejected_before_routing() {
        let engine = engine();
        let bad = Order::dummy(OrderSide::Buy, 100, 0);

        let err = engine.submit_order(bad).await.unwrap_err();
        assert!(matches!(err, BazaarError::InvalidOrder { .. }));
        // No market was ever created for it.
        assert!(engine.markets.lock().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_unknown_order() {
        let engine = engine();
        let err = engine.cancel_order(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, BazaarError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn submit_then_cancel() {
        let engine = engine();
        let sell = Order::dummy_for_market(market(), OrderSide::Sell, 100, 5);

        engine.submit_order(sell.clone()).await.unwrap();
        let cancelled = engine.cancel_order(sell.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // Second cancel: the route is gone.
        let err = engine.cancel_order(sell.id).await.unwrap_err();
        assert!(matches!(err, BazaarError::OrderNotFound(_)));

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn markets_are_independent() {
        let engine = engine();
        let m1 = market();
        let m2 = MarketKey::new(m1.item_id, TradingMode::BlackMarket);

        engine
            .submit_order(Order::dummy_for_market(m1, OrderSide::Sell, 100, 5))
            .await
            .unwrap();
        // Same item, different mode: must not cross.
        let outcome = engine
            .submit_order(Order::dummy_for_market(m2, OrderSide::Buy, 100, 5))
            .await
            .unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(engine.markets.lock().await.len(), 2);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn stopped_engine_rejects_requests() {
        let engine = engine();
        engine.shutdown().await;

        let err = engine
            .submit_order(Order::dummy(OrderSide::Buy, 100, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BazaarError::EngineStopped));

        let err = engine.cancel_order(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, BazaarError::EngineStopped));

        let err = engine.snapshot(market()).await.unwrap_err();
        assert!(matches!(err, BazaarError::EngineStopped));
    }

    #[tokio::test]
    async fn snapshot_of_untouched_market_is_empty() {
        let engine = engine();
        let view = engine.snapshot(market()).await.unwrap();
        assert!(view.bids.is_empty());
        assert!(view.asks.is_empty());
        engine.shutdown().await;
    }
}
