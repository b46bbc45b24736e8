//! Order model for the Bazaar matching engine.
//!
//! An order has an immutable identity (who, what, which market, which side,
//! at what price) and mutable fill state. All mutation goes through
//! [`Order::apply_fill`] or the explicit cancel/expire transitions -- nothing
//! else touches `filled_qty` or `status`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{BazaarError, ItemId, MarketKey, OrderId, PlayerId, Result, TradingMode, constants};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side this order matches against.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an order.
///
/// `Open` and `PartiallyFilled` are derived from fill state;
/// `Cancelled` and `Expired` are explicit terminal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// The currency an order settles in. A tag only -- conversion between
/// currencies happens outside the engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum CurrencyKind {
    #[default]
    Eurodollars,
    CraftingScrip,
}

impl std::fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eurodollars => write!(f, "EURODOLLARS"),
            Self::CraftingScrip => write!(f, "CRAFTING_SCRIP"),
        }
    }
}

/// A buy or sell order for a quantity of one item in one market.
///
/// Prices are integer minor-currency units; quantities are whole items.
/// `sequence` is the per-market time-priority counter stamped by the
/// market coordinator on acceptance (0 = not yet accepted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub player_id: PlayerId,
    pub item_id: ItemId,
    pub mode: TradingMode,
    pub side: OrderSide,
    pub limit_price: u64,
    pub quantity: u32,
    pub filled_qty: u32,
    pub status: OrderStatus,
    pub currency: CurrencyKind,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    /// Create a fresh `Open` order with the default TTL.
    #[must_use]
    pub fn new(
        player_id: PlayerId,
        item_id: ItemId,
        mode: TradingMode,
        side: OrderSide,
        limit_price: u64,
        quantity: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            player_id,
            item_id,
            mode,
            side,
            limit_price,
            quantity,
            filled_qty: 0,
            status: OrderStatus::Open,
            currency: CurrencyKind::default(),
            sequence: 0,
            created_at: now,
            expires_at: now + Duration::hours(constants::DEFAULT_ORDER_TTL_HOURS),
        }
    }

    /// The market this order belongs to.
    #[must_use]
    pub fn market(&self) -> MarketKey {
        MarketKey::new(self.item_id, self.mode)
    }

    /// Unfilled quantity.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.quantity - self.filled_qty
    }

    /// Whether this order is eligible for matching or resting in a book.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
            && self.remaining() > 0
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether this order's price crosses a resting opposite-side order.
    #[must_use]
    pub fn crosses(&self, resting: &Order) -> bool {
        match self.side {
            OrderSide::Buy => self.limit_price >= resting.limit_price,
            OrderSide::Sell => self.limit_price <= resting.limit_price,
        }
    }

    /// Apply a fill of `qty` items and re-derive the status.
    ///
    /// Callers guarantee `0 < qty <= remaining()`; the matcher computes
    /// fill quantities as `min(taker remaining, maker remaining)`.
    pub fn apply_fill(&mut self, qty: u32) {
        debug_assert!(qty > 0 && qty <= self.remaining());
        self.filled_qty += qty;
        self.status = if self.filled_qty == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    /// Validate an order before it enters a coordinator queue.
    ///
    /// # Errors
    /// `InvalidOrder` for zero price/quantity or inconsistent fill state,
    /// `OrderExpired` if the order's TTL already passed.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.quantity == 0 {
            return Err(BazaarError::InvalidOrder {
                reason: "quantity must be > 0".to_string(),
            });
        }
        if self.limit_price == 0 {
            return Err(BazaarError::InvalidOrder {
                reason: "limit price must be > 0".to_string(),
            });
        }
        if self.filled_qty > self.quantity {
            return Err(BazaarError::InvalidOrder {
                reason: format!(
                    "filled quantity {} exceeds quantity {}",
                    self.filled_qty, self.quantity
                ),
            });
        }
        if !self.is_active() {
            return Err(BazaarError::InvalidOrder {
                reason: format!("order is {} and cannot be (re)submitted", self.status),
            });
        }
        if self.is_expired(now) {
            return Err(BazaarError::OrderExpired(self.id));
        }
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(side: OrderSide, price: u64, qty: u32) -> Self {
        Self::new(
            PlayerId::new(),
            ItemId::new(),
            TradingMode::OpenMarket,
            side,
            price,
            qty,
        )
    }

    pub fn dummy_for_market(market: MarketKey, side: OrderSide, price: u64, qty: u32) -> Self {
        Self::new(PlayerId::new(), market.item_id, market.mode, side, price, qty)
    }

    pub fn dummy_for_player(player: PlayerId, side: OrderSide, price: u64, qty: u32) -> Self {
        Self::new(
            player,
            ItemId::new(),
            TradingMode::OpenMarket,
            side,
            price,
            qty,
        )
    }
}
