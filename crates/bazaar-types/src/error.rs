//! Error taxonomy for the Bazaar matching engine.
//!
//! All errors use the `BZR_ERR_` prefix convention for easy grepping in
//! logs. Codes are grouped by subsystem:
//! - 1xx: Order validation / lookup
//! - 2xx: Matching
//! - 3xx: Cancellation
//! - 4xx: Persistence / commit
//! - 5xx: Coordination
//! - 9xx: Internal

use thiserror::Error;

use crate::{OrderId, PlayerId, TradeId};

/// Central error enum for all engine operations.
#[derive(Debug, Error)]
pub enum BazaarError {
    // =================================================================
    // Order errors (1xx)
    // =================================================================
    /// The requested order is not resting in any book known to the engine.
    #[error("BZR_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation and never entered a coordinator queue.
    #[error("BZR_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// An order with this id is already resting in the book.
    #[error("BZR_ERR_102: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order's TTL elapsed.
    #[error("BZR_ERR_103: Order expired: {0}")]
    OrderExpired(OrderId),

    // =================================================================
    // Matching errors (2xx)
    // =================================================================
    /// Both sides of a prospective fill belong to the same player.
    /// Never fails a submit -- the candidate is skipped and matching
    /// continues; this surfaces in logs and in `MatchPlan::skipped_self`.
    #[error("BZR_ERR_200: Self-trade prevented: player {player} on both sides")]
    SelfTrade { player: PlayerId },

    // =================================================================
    // Cancellation errors (3xx)
    // =================================================================
    /// The order's submit is still in flight; cancel again once it settles.
    #[error("BZR_ERR_300: Order is currently being matched: {0}")]
    AlreadyProcessing(OrderId),

    // =================================================================
    // Persistence / commit errors (4xx)
    // =================================================================
    /// The persistence collaborator rejected a write.
    #[error("BZR_ERR_400: Persistence failed: {reason}")]
    PersistenceFailed { reason: String },

    /// The persistence collaborator missed its deadline on every attempt.
    #[error("BZR_ERR_401: Persistence timed out after {attempts} attempts")]
    PersistenceTimeout { attempts: u32 },

    /// A trade with this id was already recorded. Retries absorb this as
    /// success -- it is the idempotency signal, not a failure.
    #[error("BZR_ERR_402: Trade already recorded: {0}")]
    TradeAlreadyRecorded(TradeId),

    /// Persistence failed partway through a multi-fill commit. The fills in
    /// `committed` stand -- other participants may already observe them -- and
    /// must not be rolled back; the caller reconciles by resubmitting the
    /// order, which regenerates identical trade ids for the unfinished fills.
    #[error("BZR_ERR_403: Partial commit for order {order_id}: {} fills stand, remainder not applied", .committed.len())]
    PartialCommit {
        order_id: OrderId,
        committed: Vec<TradeId>,
    },

    // =================================================================
    // Coordination errors (5xx)
    // =================================================================
    /// A state the single-writer-per-market design makes structurally
    /// impossible was observed -- a market task found dead mid-request, or a
    /// planned maker missing from the book. Indicates a coordinator bug,
    /// never a normal runtime condition.
    #[error("BZR_ERR_500: Unreachable concurrency state: {detail}")]
    ConcurrencyUnreachable { detail: String },

    /// The engine has been shut down and accepts no further requests.
    #[error("BZR_ERR_501: Engine is stopped")]
    EngineStopped,

    // =================================================================
    // Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BZR_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BazaarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_code() {
        let err = BazaarError::OrderNotFound(OrderId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("BZR_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn partial_commit_reports_committed_count() {
        let err = BazaarError::PartialCommit {
            order_id: OrderId::new(),
            committed: vec![TradeId::new(), TradeId::new()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("BZR_ERR_403"));
        assert!(msg.contains("2 fills stand"));
    }

    #[test]
    fn all_errors_have_bzr_prefix() {
        let errors: Vec<BazaarError> = vec![
            BazaarError::InvalidOrder {
                reason: "x".into(),
            },
            BazaarError::SelfTrade {
                player: PlayerId::new(),
            },
            BazaarError::AlreadyProcessing(OrderId::new()),
            BazaarError::PersistenceTimeout { attempts: 3 },
            BazaarError::TradeAlreadyRecorded(TradeId::new()),
            BazaarError::ConcurrencyUnreachable {
                detail: "x".into(),
            },
            BazaarError::EngineStopped,
            BazaarError::Internal("x".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("BZR_ERR_"), "missing prefix: {msg}");
        }
    }
}
