//! System-wide constants for the Bazaar matching engine.

/// Basis-point denominator for fee arithmetic (100% = 10_000 bps).
pub const FEE_BPS_DENOMINATOR: u32 = 10_000;

/// Default marketplace fee: 200 bps = 2% of notional.
pub const DEFAULT_FEE_BPS: u32 = 200;

/// Default deadline for one persistence attempt, in milliseconds.
pub const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 2_000;

/// Default number of persistence attempts per fill (1 initial + retries).
pub const DEFAULT_PERSIST_ATTEMPTS: u32 = 3;

/// Default backoff before the first persistence retry, in milliseconds.
/// Doubles on every subsequent retry.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 50;

/// Default depth of a market coordinator's command queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 1_024;

/// Default order time-to-live in hours.
pub const DEFAULT_ORDER_TTL_HOURS: i64 = 24;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Bazaar";
