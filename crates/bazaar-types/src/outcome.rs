//! Matcher and engine result types.
//!
//! [`MatchPlan`] is the pure matcher's output -- proposed fills only, no
//! state change. [`MatchOutcome`] is what a submit returns once the
//! executor has committed the plan. [`OrderBookView`] is the detached
//! read-only snapshot exposed for UI/analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MarketKey, Order, OrderId, PlayerId, Trade};

/// One fill proposed by the matcher, priced at the resting order's limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedFill {
    pub resting_order_id: OrderId,
    pub resting_player_id: PlayerId,
    /// Items to transfer: `min(taker remaining, resting remaining)`.
    pub quantity: u32,
    /// Execution price -- always the resting order's limit price.
    pub price: u64,
}

/// The matcher's complete answer for one incoming order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchPlan {
    /// Fills in execution order (price priority, then time priority).
    pub fills: Vec<ProposedFill>,
    /// Taker quantity left over after all proposed fills.
    pub remaining: u32,
    /// Resting orders skipped by self-trade prevention. They stay in the
    /// book untouched; matching continued past them.
    pub skipped_self: Vec<OrderId>,
}

impl MatchPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Total quantity across all proposed fills.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.fills.iter().map(|f| u64::from(f.quantity)).sum()
    }
}

/// Result of a committed submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// The incoming order with its final fill state and status.
    pub order: Order,
    /// Trades executed by this submit, in execution order.
    pub trades: Vec<Trade>,
    /// Resting orders this submit removed from the book: fully filled
    /// makers, plus any orders the pre-match expiry purge retired.
    pub completed: Vec<OrderId>,
}

/// Aggregate of one price level, as seen in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelView {
    pub price: u64,
    /// Total remaining quantity across all orders at this price.
    pub quantity: u64,
    /// Number of resting orders at this price.
    pub orders: usize,
}

/// Read-only snapshot of one market's book.
///
/// Eventually consistent: built inside the market task and detached from
/// the live structure -- it never aliases the mutating book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookView {
    pub market: MarketKey,
    /// The market's sequence counter at snapshot time.
    pub sequence: u64,
    /// Bid levels, best (highest) price first.
    pub bids: Vec<LevelView>,
    /// Ask levels, best (lowest) price first.
    pub asks: Vec<LevelView>,
    pub as_of: DateTime<Utc>,
}

impl OrderBookView {
    #[must_use]
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.first().map(|l| l.price)
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.first().map(|l| l.price)
    }
}
