//! Trade records produced by the trade executor.
//!
//! A [`Trade`] is the immutable record of one fill between a buy and a
//! sell order. Trades are append-only: once committed they are never
//! mutated or deleted, forming the audit log of all matching activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CurrencyKind, ItemId, OrderId, OrderSide, PlayerId, TradeId, TradingMode, constants};

/// Fee for a fill, in integer minor-currency units.
///
/// `floor(price * quantity * fee_bps / 10_000)`, computed in u128 so the
/// intermediate product cannot overflow. Never floating point -- repeated
/// float rounding drifts on financial values.
#[must_use]
pub fn compute_fee(price: u64, quantity: u32, fee_bps: u32) -> u64 {
    let notional = u128::from(price) * u128::from(quantity);
    let fee = notional * u128::from(fee_bps) / u128::from(constants::FEE_BPS_DENOMINATOR);
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// One executed fill between a buy order and a sell order.
///
/// `price` follows the maker-price convention: it is always the *resting*
/// order's limit price, rewarding the order that provided liquidity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic per-fill identifier; the idempotency key for persistence.
    pub id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer_id: PlayerId,
    pub seller_id: PlayerId,
    pub item_id: ItemId,
    pub mode: TradingMode,
    /// Items transferred by this fill. Always > 0.
    pub quantity: u32,
    /// Execution price per item -- the resting order's limit price.
    pub price: u64,
    /// Marketplace fee on the notional, integer basis-point arithmetic.
    pub fee: u64,
    pub currency: CurrencyKind,
    /// Which side the incoming (aggressive) order was on.
    pub taker_side: OrderSide,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Total value transferred: `price * quantity`.
    #[must_use]
    pub fn notional(&self) -> u64 {
        u64::try_from(u128::from(self.price) * u128::from(self.quantity)).unwrap_or(u64::MAX)
    }

    /// The order that triggered this fill.
    #[must_use]
    pub fn taker_order_id(&self) -> OrderId {
        match self.taker_side {
            OrderSide::Buy => self.buy_order_id,
            OrderSide::Sell => self.sell_order_id,
        }
    }

    /// The resting order whose price set the execution price.
    #[must_use]
    pub fn maker_order_id(&self) -> OrderId {
        match self.taker_side {
            OrderSide::Buy => self.sell_order_id,
            OrderSide::Sell => self.buy_order_id,
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} x{} @ {} {} (fee {})",
            self.id, self.item_id, self.quantity, self.price, self.currency, self.fee,
        )
    }
}
