//! External collaborator traits.
//!
//! The engine owns matching; persistence and notification are someone
//! else's responsibility, reached only through these two narrow traits.
//! Futures are returned `impl Future + Send` so market tasks stay
//! spawnable without trait-object plumbing.

use std::future::Future;

use bazaar_types::{MarketKey, Order, Result, Trade};

/// Source of truth for orders and trades.
///
/// `save_fill` must be **idempotent on `trade_id`**: replaying a fill whose
/// trade is already recorded must not create a duplicate. Implementations
/// signal a replay with [`bazaar_types::BazaarError::TradeAlreadyRecorded`];
/// the executor absorbs that as success.
pub trait OrderRepository: Send + Sync + 'static {
    /// Load every active (Open / PartiallyFilled) order for one market.
    /// Used to warm-start a market coordinator.
    fn load_active_orders(
        &self,
        market: &MarketKey,
    ) -> impl Future<Output = Result<Vec<Order>>> + Send;

    /// Persist a single order's current state (resting, cancelled, expired).
    fn save_order(&self, order: &Order) -> impl Future<Output = Result<()>> + Send;

    /// Persist one fill as a single logical unit: both updated orders plus
    /// the immutable trade record.
    fn save_fill(
        &self,
        taker: &Order,
        maker: &Order,
        trade: &Trade,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Fire-and-forget trade notification fan-out.
///
/// Failures are logged and swallowed by the executor -- a dead notifier
/// must never block or fail a match.
pub trait EventPublisher: Send + Sync + 'static {
    fn publish_trade(&self, trade: &Trade) -> impl Future<Output = Result<()>> + Send;
}

/// Publisher that drops every event. The default when no notification
/// fan-out is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish_trade(&self, _trade: &Trade) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

// Shared handles delegate, so an embedder can keep a reference to the
// repository it hands the engine.

impl<T: OrderRepository> OrderRepository for std::sync::Arc<T> {
    fn load_active_orders(
        &self,
        market: &MarketKey,
    ) -> impl Future<Output = Result<Vec<Order>>> + Send {
        T::load_active_orders(self, market)
    }

    fn save_order(&self, order: &Order) -> impl Future<Output = Result<()>> + Send {
        T::save_order(self, order)
    }

    fn save_fill(
        &self,
        taker: &Order,
        maker: &Order,
        trade: &Trade,
    ) -> impl Future<Output = Result<()>> + Send {
        T::save_fill(self, taker, maker, trade)
    }
}

impl<T: EventPublisher> EventPublisher for std::sync::Arc<T> {
    fn publish_trade(&self, trade: &Trade) -> impl Future<Output = Result<()>> + Send {
        T::publish_trade(self, trade)
    }
}
