//! Single-writer market coordination.
//!
//! One tokio task per market owns that market's [`OrderBook`] exclusively.
//! Submits, cancels, and snapshots arrive over a bounded command channel
//! and are processed strictly FIFO, one to completion before the next --
//! the only concurrency discipline a market needs. Different markets share
//! nothing and run fully in parallel.
//!
//! The task also owns the market's monotonic sequence counter, the
//! time-priority tie-breaker stamped on every accepted order. Wall-clock
//! timestamps are never used for priority, so clock skew cannot reorder
//! fills.

use std::sync::Arc;

use bazaar_book::{OrderBook, plan_match};
use bazaar_types::{
    BazaarError, EngineConfig, MarketKey, MatchOutcome, Order, OrderBookView, OrderId,
    OrderStatus, Result,
};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::executor::TradeExecutor;
use crate::repository::{EventPublisher, OrderRepository};

enum MarketCommand {
    Submit {
        order: Order,
        reply: oneshot::Sender<Result<MatchOutcome>>,
    },
    Cancel {
        order_id: OrderId,
        reply: oneshot::Sender<Result<Order>>,
    },
    Snapshot {
        reply: oneshot::Sender<OrderBookView>,
    },
    Close,
}

/// Handle to one market's single-writer task.
///
/// Cloneable access is not needed: the engine owns exactly one handle per
/// market and serializes nothing itself -- backpressure and ordering come
/// from the bounded channel.
pub struct MarketCoordinator {
    market: MarketKey,
    tx: mpsc::Sender<MarketCommand>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl MarketCoordinator {
    /// Warm-start a market: load its active orders from the repository,
    /// seed the book and the sequence counter, and spawn the writer task.
    ///
    /// Returns the handle plus the ids of the orders restored into the
    /// book, so the caller can rebuild its routing index.
    pub async fn spawn<R: OrderRepository, P: EventPublisher>(
        market: MarketKey,
        repo: Arc<R>,
        publisher: Arc<P>,
        config: EngineConfig,
    ) -> Result<(Self, Vec<OrderId>)> {
        let resting = repo.load_active_orders(&market).await?;
        let mut loaded = Vec::with_capacity(resting.len());
        let mut book = OrderBook::new(market);
        let mut next_seq: u64 = 1;
        for order in resting {
            next_seq = next_seq.max(order.sequence + 1);
            loaded.push(order.id);
            book.insert(order)?;
        }
        tracing::info!(%market, resting = loaded.len(), "market coordinator started");

        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let worker = MarketWorker {
            market,
            book,
            next_seq,
            executor: TradeExecutor::new(repo, publisher, config),
        };
        let task = tokio::spawn(worker.run(rx));

        Ok((
            Self {
                market,
                tx,
                task: tokio::sync::Mutex::new(Some(task)),
            },
            loaded,
        ))
    }

    #[must_use]
    pub fn market(&self) -> MarketKey {
        self.market
    }

    /// Queue an order for matching and wait for the outcome.
    pub async fn submit(&self, order: Order) -> Result<MatchOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(MarketCommand::Submit { order, reply })
            .await
            .map_err(|_| task_gone(self.market))?;
        rx.await.map_err(|_| task_gone(self.market))?
    }

    /// Queue a cancellation and wait for the cancelled order.
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(MarketCommand::Cancel { order_id, reply })
            .await
            .map_err(|_| task_gone(self.market))?;
        rx.await.map_err(|_| task_gone(self.market))?
    }

    /// Detached snapshot of the book, built between commands.
    pub async fn snapshot(&self) -> Result<OrderBookView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(MarketCommand::Snapshot { reply })
            .await
            .map_err(|_| task_gone(self.market))?;
        rx.await.map_err(|_| task_gone(self.market))
    }

    /// Ask the task to stop and wait for it. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(MarketCommand::Close).await;
        if let Some(task) = self.task.lock().await.take() {
            if let Err(err) = task.await {
                tracing::error!(market = %self.market, error = %err, "market task join failed");
            }
        }
    }
}

/// The single-writer-per-market design makes a dead task mid-request a
/// structural impossibility; hitting this is a coordinator bug.
fn task_gone(market: MarketKey) -> BazaarError {
    BazaarError::ConcurrencyUnreachable {
        detail: format!("market task for {market} is gone"),
    }
}

struct MarketWorker<R, P> {
    market: MarketKey,
    book: OrderBook,
    next_seq: u64,
    executor: TradeExecutor<R, P>,
}

impl<R: OrderRepository, P: EventPublisher> MarketWorker<R, P> {
    async fn run(mut self, mut rx: mpsc::Receiver<MarketCommand>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                MarketCommand::Submit { order, reply } => {
                    let _ = reply.send(self.handle_submit(order).await);
                }
                MarketCommand::Cancel { order_id, reply } => {
                    let _ = reply.send(self.handle_cancel(order_id).await);
                }
                MarketCommand::Snapshot { reply } => {
                    let _ = reply.send(self.book.view(self.next_seq - 1));
                }
                MarketCommand::Close => break,
            }
        }
        tracing::info!(market = %self.market, "market coordinator stopped");
    }

    async fn handle_submit(&mut self, mut order: Order) -> Result<MatchOutcome> {
        let mut completed = self.expire_resting().await;

        order.sequence = self.next_seq;
        self.next_seq += 1;

        let plan = plan_match(&order, &self.book);
        let result = self
            .executor
            .commit(&mut self.book, &mut order, &plan)
            .await?;
        completed.extend(result.completed);

        if order.is_active() {
            // An order rests only once its resting state is durable; if the
            // write fails, committed trades stand and the caller resubmits.
            self.executor.persist_order(&order).await?;
            self.book.insert(order.clone())?;
        }

        tracing::info!(
            market = %self.market,
            order = %order.id,
            status = %order.status,
            trades = result.trades.len(),
            "submit processed"
        );
        Ok(MatchOutcome {
            order,
            trades: result.trades,
            completed,
        })
    }

    async fn handle_cancel(&mut self, order_id: OrderId) -> Result<Order> {
        let Some(mut order) = self.book.remove(&order_id) else {
            return Err(BazaarError::OrderNotFound(order_id));
        };

        let resting_status = order.status;
        order.status = OrderStatus::Cancelled;
        match self.executor.persist_order(&order).await {
            Ok(()) => {
                tracing::info!(market = %self.market, order = %order_id, "order cancelled");
                Ok(order)
            }
            Err(err) => {
                // A cancel takes effect only once durable; put the order back.
                order.status = resting_status;
                self.book.insert(order)?;
                Err(err)
            }
        }
    }

    /// Lazily expire resting orders whose TTL elapsed. Runs at the head of
    /// every submit so an expired order can never be filled.
    async fn expire_resting(&mut self) -> Vec<OrderId> {
        let purged = self.book.purge_expired(Utc::now());
        let mut expired = Vec::with_capacity(purged.len());
        for mut order in purged {
            order.status = OrderStatus::Expired;
            tracing::info!(market = %self.market, order = %order.id, "resting order expired");
            if let Err(err) = self.executor.persist_order(&order).await {
                tracing::warn!(order = %order.id, error = %err, "expiry persistence failed");
            }
            expired.push(order.id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use bazaar_types::{ItemId, OrderSide, TradingMode};
    use chrono::Duration;

    use crate::memory::{MemoryRepository, RecordingPublisher};

    use super::*;

    async fn spawn_market(
        repo: Arc<MemoryRepository>,
    ) -> (MarketCoordinator, Vec<OrderId>, MarketKey) {
        let market = MarketKey::new(ItemId::new(), TradingMode::OpenMarket);
        let (coord, loaded) = MarketCoordinator::spawn(
            market,
            repo,
            Arc::new(RecordingPublisher::new()),
            EngineConfig::default(),
        )
        .await
        .unwrap();
        (coord, loaded, market)
    }

    #[tokio::test]
    async fn submit_rests_then_matches() {
        let repo = Arc::new(MemoryRepository::new());
        let (coord, _, market) = spawn_market(repo.clone()).await;

        let sell = Order::dummy_for_market(market, OrderSide::Sell, 100, 10);
        let outcome = coord.submit(sell.clone()).await.unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.order.status, OrderStatus::Open);
        assert_eq!(outcome.order.sequence, 1);

        let buy = Order::dummy_for_market(market, OrderSide::Buy, 100, 6);
        let outcome = coord.submit(buy).await.unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, 6);
        assert_eq!(outcome.trades[0].price, 100);
        assert_eq!(outcome.order.status, OrderStatus::Filled);
        assert_eq!(outcome.order.sequence, 2);

        // Maker partially filled, still resting, persisted.
        let maker = repo.order(&sell.id).unwrap();
        assert_eq!(maker.status, OrderStatus::PartiallyFilled);
        assert_eq!(maker.filled_qty, 6);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_resting_order() {
        let repo = Arc::new(MemoryRepository::new());
        let (coord, _, market) = spawn_market(repo.clone()).await;

        let sell = Order::dummy_for_market(market, OrderSide::Sell, 100, 5);
        coord.submit(sell.clone()).await.unwrap();

        let cancelled = coord.cancel(sell.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(repo.order(&sell.id).unwrap().status, OrderStatus::Cancelled);

        // A matching buy now finds nothing and rests.
        let buy = Order::dummy_for_market(market, OrderSide::Buy, 100, 5);
        let outcome = coord.submit(buy).await.unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.order.status, OrderStatus::Open);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_unknown_order() {
        let repo = Arc::new(MemoryRepository::new());
        let (coord, _, _) = spawn_market(repo).await;

        let err = coord.cancel(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, BazaarError::OrderNotFound(_)));

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn warm_start_restores_book_and_sequence() {
        let repo = Arc::new(MemoryRepository::new());
        let market = MarketKey::new(ItemId::new(), TradingMode::BlackMarket);

        let mut resting = Order::dummy_for_market(market, OrderSide::Sell, 100, 10);
        resting.sequence = 41;
        repo.save_order(&resting).await.unwrap();

        let (coord, loaded) = MarketCoordinator::spawn(
            market,
            repo.clone(),
            Arc::new(RecordingPublisher::new()),
            EngineConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(loaded, vec![resting.id]);

        let view = coord.snapshot().await.unwrap();
        assert_eq!(view.best_ask(), Some(100));

        // New submissions continue past the restored sequence.
        let buy = Order::dummy_for_market(market, OrderSide::Buy, 100, 4);
        let outcome = coord.submit(buy).await.unwrap();
        assert_eq!(outcome.order.sequence, 42);
        assert_eq!(outcome.trades.len(), 1);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn expired_orders_never_fill() {
        let repo = Arc::new(MemoryRepository::new());
        let (coord, _, market) = spawn_market(repo.clone()).await;

        let mut sell = Order::dummy_for_market(market, OrderSide::Sell, 100, 5);
        sell.expires_at = Utc::now() + Duration::milliseconds(1);
        coord.submit(sell.clone()).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let buy = Order::dummy_for_market(market, OrderSide::Buy, 100, 5);
        let outcome = coord.submit(buy).await.unwrap();

        assert!(outcome.trades.is_empty(), "expired maker must not fill");
        assert_eq!(outcome.order.status, OrderStatus::Open);
        assert!(outcome.completed.contains(&sell.id));
        assert_eq!(repo.order(&sell.id).unwrap().status, OrderStatus::Expired);

        coord.shutdown().await;
    }

    #[tokio::test]
    async fn snapshot_is_detached() {
        let repo = Arc::new(MemoryRepository::new());
        let (coord, _, market) = spawn_market(repo).await;

        coord
            .submit(Order::dummy_for_market(market, OrderSide::Buy, 90, 3))
            .await
            .unwrap();
        let before = coord.snapshot().await.unwrap();

        coord
            .submit(Order::dummy_for_market(market, OrderSide::Buy, 95, 2))
            .await
            .unwrap();
        let after = coord.snapshot().await.unwrap();

        // The earlier view is unaffected by later mutations.
        assert_eq!(before.bids.len(), 1);
        assert_eq!(after.bids.len(), 2);
        assert_eq!(after.best_bid(), Some(95));

        coord.shutdown().await;
    }
}
