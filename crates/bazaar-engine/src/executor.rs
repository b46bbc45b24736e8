//! Applies a match plan: order state transitions, trade records,
//! persistence, notification.
//!
//! The executor is the only code that mutates fill state. Each proposed
//! fill commits as one logical unit (both updated orders + the trade) with
//! a deadline and retry against the persistence collaborator. The matching
//! decision itself is never recomputed here -- a failed commit is retried
//! as-is, and trade ids are deterministic, so retries are idempotent.

use std::sync::Arc;

use bazaar_book::OrderBook;
use bazaar_types::{
    BazaarError, EngineConfig, MatchPlan, Order, OrderId, OrderSide, Result, Trade, TradeId,
    compute_fee,
};
use chrono::Utc;

use crate::repository::{EventPublisher, OrderRepository};

/// What a committed plan produced.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// Trades persisted, in execution order.
    pub trades: Vec<Trade>,
    /// Makers this commit fully filled (removed from the book).
    pub completed: Vec<OrderId>,
}

/// Commits proposed fills atomically with persistence.
pub struct TradeExecutor<R, P> {
    repo: Arc<R>,
    publisher: Arc<P>,
    config: EngineConfig,
}

impl<R: OrderRepository, P: EventPublisher> TradeExecutor<R, P> {
    pub fn new(repo: Arc<R>, publisher: Arc<P>, config: EngineConfig) -> Self {
        Self {
            repo,
            publisher,
            config,
        }
    }

    /// Apply `plan` to the book and the taker.
    ///
    /// Fills commit in plan order. If persistence ultimately fails on fill
    /// *i*, fills `0..i` stand (other participants may already observe
    /// them): the failing fill is rolled back in memory, the maker returns
    /// to the book untouched, and the caller receives
    /// [`BazaarError::PartialCommit`] naming the committed trades. The
    /// caller reconciles by resubmitting the order; deterministic trade ids
    /// make the replay safe.
    pub async fn commit(
        &self,
        book: &mut OrderBook,
        taker: &mut Order,
        plan: &MatchPlan,
    ) -> Result<CommitResult> {
        let mut trades: Vec<Trade> = Vec::with_capacity(plan.fills.len());
        let mut completed: Vec<OrderId> = Vec::new();

        for fill in &plan.fills {
            let mut maker = book.remove(&fill.resting_order_id).ok_or_else(|| {
                BazaarError::ConcurrencyUnreachable {
                    detail: format!("planned maker {} not in book", fill.resting_order_id),
                }
            })?;

            let maker_before = maker.clone();
            let taker_checkpoint = (taker.filled_qty, taker.status);
            // Taker fill offset at the time of this fill; the deterministic
            // trade id input that makes replays collide with the original.
            let fill_offset = taker.filled_qty;

            maker.apply_fill(fill.quantity);
            taker.apply_fill(fill.quantity);

            let (buy_order, sell_order) = match taker.side {
                OrderSide::Buy => (&*taker, &maker),
                OrderSide::Sell => (&maker, &*taker),
            };
            let trade = Trade {
                id: TradeId::deterministic(taker.id, maker.id, fill_offset),
                buy_order_id: buy_order.id,
                sell_order_id: sell_order.id,
                buyer_id: buy_order.player_id,
                seller_id: sell_order.player_id,
                item_id: taker.item_id,
                mode: taker.mode,
                quantity: fill.quantity,
                price: fill.price,
                fee: compute_fee(fill.price, fill.quantity, self.config.fee_bps),
                currency: taker.currency,
                taker_side: taker.side,
                executed_at: Utc::now(),
            };

            match self.persist_fill(taker, &maker, &trade).await {
                Ok(()) => {
                    tracing::debug!(
                        trade = %trade.id,
                        price = trade.price,
                        qty = trade.quantity,
                        maker = %maker.id,
                        "fill committed"
                    );
                    if maker.is_active() {
                        book.requeue(maker)?;
                    } else {
                        completed.push(maker.id);
                    }
                    if let Err(err) = self.publisher.publish_trade(&trade).await {
                        tracing::warn!(trade = %trade.id, error = %err, "trade notification dropped");
                    }
                    trades.push(trade);
                }
                Err(err) => {
                    // This fill never happened: both sides return to their
                    // pre-fill state. Earlier fills stay committed.
                    (taker.filled_qty, taker.status) = taker_checkpoint;
                    book.requeue(maker_before)?;
                    tracing::error!(
                        order = %taker.id,
                        committed = trades.len(),
                        error = %err,
                        "persistence failed mid-commit"
                    );
                    if trades.is_empty() {
                        return Err(err);
                    }
                    return Err(BazaarError::PartialCommit {
                        order_id: taker.id,
                        committed: trades.iter().map(|t| t.id).collect(),
                    });
                }
            }
        }

        Ok(CommitResult { trades, completed })
    }

    /// Persist one fill with deadline + exponential backoff.
    ///
    /// A `TradeAlreadyRecorded` response is the idempotency signal for a
    /// replayed fill and counts as success.
    async fn persist_fill(&self, taker: &Order, maker: &Order, trade: &Trade) -> Result<()> {
        let attempts = self.config.persist_attempts.max(1);
        let mut last_err = BazaarError::PersistenceTimeout { attempts };

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff(attempt - 1)).await;
            }
            let save = self.repo.save_fill(taker, maker, trade);
            match tokio::time::timeout(self.config.persist_timeout(), save).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(BazaarError::TradeAlreadyRecorded(id))) => {
                    tracing::debug!(trade = %id, "replayed fill already recorded");
                    return Ok(());
                }
                Ok(Err(err)) => {
                    tracing::warn!(trade = %trade.id, attempt, error = %err, "fill persistence failed");
                    last_err = err;
                }
                Err(_elapsed) => {
                    tracing::warn!(trade = %trade.id, attempt, "fill persistence timed out");
                    last_err = BazaarError::PersistenceTimeout { attempts };
                }
            }
        }
        Err(last_err)
    }

    /// Persist a single order state change (resting, cancel, expiry) with
    /// the same deadline/retry policy as fills.
    pub(crate) async fn persist_order(&self, order: &Order) -> Result<()> {
        let attempts = self.config.persist_attempts.max(1);
        let mut last_err = BazaarError::PersistenceTimeout { attempts };

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff(attempt - 1)).await;
            }
            let save = self.repo.save_order(order);
            match tokio::time::timeout(self.config.persist_timeout(), save).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => {
                    tracing::warn!(order = %order.id, attempt, error = %err, "order persistence failed");
                    last_err = err;
                }
                Err(_elapsed) => {
                    tracing::warn!(order = %order.id, attempt, "order persistence timed out");
                    last_err = BazaarError::PersistenceTimeout { attempts };
                }
            }
        }
        Err(last_err)
    }
}
