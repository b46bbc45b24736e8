//! # bazaar-engine
//!
//! **Trade execution and market coordination for Bazaar.**
//!
//! The engine turns the pure matching core (`bazaar-book`) into a running
//! service component:
//!
//! - **[`Engine`]**: the public API -- `submit_order`, `cancel_order`,
//!   `snapshot`, `shutdown`
//! - **[`MarketCoordinator`]**: one single-writer task per market; all book
//!   mutation happens inside it, requests are FIFO, markets never share state
//! - **[`TradeExecutor`]**: commits proposed fills atomically with
//!   persistence -- deterministic trade ids, integer basis-point fees,
//!   deadline + retry on the repository, partial-commit reporting
//! - **[`OrderRepository`] / [`EventPublisher`]**: the only two
//!   collaborators the engine consumes; [`MemoryRepository`] is the
//!   in-process reference implementation
//!
//! ## Order Flow
//!
//! ```text
//! Engine::submit_order → validate → MarketCoordinator (FIFO queue)
//!     → plan_match (pure) → TradeExecutor::commit → book writeback
//! ```

pub mod coordinator;
pub mod engine;
pub mod executor;
pub mod memory;
pub mod repository;

pub use coordinator::MarketCoordinator;
pub use engine::Engine;
pub use executor::{CommitResult, TradeExecutor};
pub use memory::{MemoryRepository, RecordingPublisher};
pub use repository::{EventPublisher, NoopPublisher, OrderRepository};
