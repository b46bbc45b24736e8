//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunables for the engine and its market coordinators.
///
/// All fields have sensible defaults; deployments override via whatever
/// config loading the embedding service uses (these types only need to
/// deserialize).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Marketplace fee in basis points of trade notional.
    pub fee_bps: u32,
    /// Deadline for a single persistence attempt, in milliseconds. Only the
    /// downstream persistence call is deadlined -- in-memory matching is
    /// bounded by book size and needs no timeout.
    pub persist_timeout_ms: u64,
    /// Total persistence attempts per fill before giving up.
    pub persist_attempts: u32,
    /// Backoff before the first retry, in milliseconds; doubles per retry.
    pub backoff_base_ms: u64,
    /// Command queue depth per market coordinator.
    pub queue_depth: usize,
    /// TTL applied to new orders, in hours.
    pub order_ttl_hours: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_bps: constants::DEFAULT_FEE_BPS,
            persist_timeout_ms: constants::DEFAULT_PERSIST_TIMEOUT_MS,
            persist_attempts: constants::DEFAULT_PERSIST_ATTEMPTS,
            backoff_base_ms: constants::DEFAULT_BACKOFF_BASE_MS,
            queue_depth: constants::DEFAULT_QUEUE_DEPTH,
            order_ttl_hours: constants::DEFAULT_ORDER_TTL_HOURS,
        }
    }
}

impl EngineConfig {
    /// Deadline for one persistence attempt.
    #[must_use]
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    /// Backoff before retry number `retry` (0-based): base * 2^retry.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << retry.min(16));
        Duration::from_millis(ms)
    }
}
