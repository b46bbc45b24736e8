//! The order book for a single market (item × trading mode).
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<u64>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<u64, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<OrderId, (OrderSide, u64)>` enables O(log n)
//! removal and requeue without scanning levels.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use bazaar_types::{
    BazaarError, LevelView, MarketKey, Order, OrderBookView, OrderId, OrderSide, Result,
};
use chrono::{DateTime, Utc};

use crate::price_level::PriceLevel;

/// Price-time priority index of all resting orders for one market.
#[derive(Debug)]
pub struct OrderBook {
    /// The market this book serves.
    pub market: MarketKey,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<u64>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<u64, PriceLevel>,
    /// Fast lookup: `OrderId -> (side, price)`.
    index: HashMap<OrderId, (OrderSide, u64)>,
}

impl OrderBook {
    /// Create a new empty order book for the given market.
    #[must_use]
    pub fn new(market: MarketKey) -> Self {
        Self {
            market,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion
    // =================================================================

    /// Insert an active order at its limit price.
    ///
    /// # Errors
    /// `InvalidOrder` for zero price/quantity, inactive status, or an order
    /// from a different market; `DuplicateOrder` if the id already rests.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.quantity == 0 || order.limit_price == 0 {
            return Err(BazaarError::InvalidOrder {
                reason: "price and quantity must be > 0".to_string(),
            });
        }
        if !order.is_active() {
            return Err(BazaarError::InvalidOrder {
                reason: format!("{} order cannot rest in the book", order.status),
            });
        }
        if order.market() != self.market {
            return Err(BazaarError::InvalidOrder {
                reason: format!("order belongs to {}, book serves {}", order.market(), self.market),
            });
        }
        if self.index.contains_key(&order.id) {
            return Err(BazaarError::DuplicateOrder(order.id));
        }

        let price = order.limit_price;
        self.index.insert(order.id, (order.side, price));

        match order.side {
            OrderSide::Buy => {
                self.bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price))
                    .insert(order);
            }
            OrderSide::Sell => {
                self.asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price))
                    .insert(order);
            }
        }
        Ok(())
    }

    /// Re-insert a partially filled order at its **original** time priority.
    ///
    /// Priority comes from the order's unchanged `sequence`, so a partial
    /// fill never costs a maker its place in the queue.
    pub fn requeue(&mut self, order: Order) -> Result<()> {
        self.insert(order)
    }

    // =================================================================
    // Removal
    // =================================================================

    /// Remove an order by id (full fill, cancel, or expiry).
    ///
    /// Returns `None` if the order is not resting -- removal is a no-op,
    /// not an error.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(order_id)?;

        let (order, now_empty) = match side {
            OrderSide::Buy => {
                let level = self.bids.get_mut(&Reverse(price))?;
                let order = level.remove_order(order_id);
                (order, level.is_empty())
            }
            OrderSide::Sell => {
                let level = self.asks.get_mut(&price)?;
                let order = level.remove_order(order_id);
                (order, level.is_empty())
            }
        };

        if now_empty {
            match side {
                OrderSide::Buy => {
                    self.bids.remove(&Reverse(price));
                }
                OrderSide::Sell => {
                    self.asks.remove(&price);
                }
            }
        }
        order
    }

    /// Remove and return every resting order whose TTL has elapsed.
    ///
    /// Returned orders keep their resting status; the caller marks them
    /// `Expired` and persists the transition.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> Vec<Order> {
        let expired: Vec<OrderId> = self
            .iter_side(OrderSide::Buy)
            .chain(self.iter_side(OrderSide::Sell))
            .filter(|o| o.is_expired(now))
            .map(|o| o.id)
            .collect();

        expired
            .iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Highest-priority resting order on the side **opposite** `side`,
    /// i.e. the first candidate an incoming `side` order would match.
    #[must_use]
    pub fn best_opposite(&self, side: OrderSide) -> Option<&Order> {
        self.iter_side(side.opposite()).next()
    }

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }

    /// Spread = best_ask - best_bid. `None` if either side is empty.
    #[must_use]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => i64::try_from(ask).ok()?.checked_sub(i64::try_from(bid).ok()?),
            _ => None,
        }
    }

    /// Total number of resting orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the book has no orders on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether an order currently rests in this book.
    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    // =================================================================
    // Iteration (for the matcher)
    // =================================================================

    /// Iterate one side's resting orders in priority order: best price
    /// first, then ascending sequence within a price.
    pub fn iter_side(&self, side: OrderSide) -> Box<dyn Iterator<Item = &Order> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.bids.values().flat_map(|l| l.orders.iter())),
            OrderSide::Sell => Box::new(self.asks.values().flat_map(|l| l.orders.iter())),
        }
    }

    // =================================================================
    // Snapshots
    // =================================================================

    /// Detached aggregate view of the book, one entry per price level.
    #[must_use]
    pub fn view(&self, sequence: u64) -> OrderBookView {
        let level_view = |l: &PriceLevel| LevelView {
            price: l.price,
            quantity: l.total_quantity(),
            orders: l.len(),
        };
        OrderBookView {
            market: self.market,
            sequence,
            bids: self.bids.values().map(level_view).collect(),
            asks: self.asks.values().map(level_view).collect(),
            as_of: Utc::now(),
        }
    }
}
