//! # bazaar-book
//!
//! **Per-market order book and pure matching algorithm.**
//!
//! This crate is the synchronous core of the engine. It has:
//!
//! - **No side effects**: the matcher proposes fills, it never applies them
//! - **Price-time priority**: best price wins; equal prices break by
//!   per-market sequence, never by quantity or player
//! - **O(log n) best-candidate lookup**: `BTreeMap` price levels, not a
//!   linear scan over resting orders
//!
//! The async machinery (market coordinators, trade executor, persistence)
//! lives in `bazaar-engine` and owns one `OrderBook` per market.

pub mod matcher;
pub mod orderbook;
pub mod price_level;

pub use matcher::plan_match;
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
