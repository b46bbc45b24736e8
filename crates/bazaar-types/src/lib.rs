//! # bazaar-types
//!
//! Shared types for the **Bazaar** item-market matching engine.
//!
//! This crate is the leaf dependency of the workspace -- every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`PlayerId`], [`ItemId`], [`TradeId`],
//!   [`TradingMode`], [`MarketKey`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderStatus`], [`CurrencyKind`]
//! - **Trade model**: [`Trade`], [`compute_fee`]
//! - **Match results**: [`ProposedFill`], [`MatchPlan`], [`MatchOutcome`],
//!   [`OrderBookView`], [`LevelView`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`BazaarError`] with `BZR_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod order;
pub mod outcome;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use bazaar_types::{Order, OrderSide, Trade, MatchOutcome, ...};

pub use config::*;
pub use error::*;
pub use ids::*;
pub use order::*;
pub use outcome::*;
pub use trade::*;

// Constants are accessed via `bazaar_types::constants::FOO`
// (not re-exported to avoid name collisions).
