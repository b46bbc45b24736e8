//! Pure price-time priority matcher.
//!
//! [`plan_match`] is a function from (incoming order, book) to a list of
//! proposed fills -- no side effects, no book mutation. The trade executor
//! applies the plan atomically with persistence; keeping the decision pure
//! means a failed commit can be retried without re-running (and possibly
//! changing) the matching decision.
//!
//! ## Self-Trade Prevention
//!
//! A candidate owned by the incoming order's player is skipped, not
//! crossed: it stays resting and matching continues with the next
//! candidate in priority order.

use bazaar_types::{BazaarError, MatchPlan, Order, ProposedFill};

use crate::OrderBook;

/// Propose fills for `incoming` against the resting opposite side.
///
/// Walks candidates in price-time priority order. For each candidate:
/// price-incompatible stops the walk (the book is price-ordered, so no
/// later candidate can cross either); a same-player candidate is skipped;
/// otherwise a fill of `min(remaining, candidate remaining)` is proposed
/// at the **candidate's** limit price (maker-price convention).
#[must_use]
pub fn plan_match(incoming: &Order, book: &OrderBook) -> MatchPlan {
    let mut plan = MatchPlan {
        remaining: incoming.remaining(),
        ..MatchPlan::default()
    };

    for candidate in book.iter_side(incoming.side.opposite()) {
        if plan.remaining == 0 {
            break;
        }
        if !incoming.crosses(candidate) {
            // Price-ordered book: every later candidate is at the same
            // price or worse.
            break;
        }
        if candidate.player_id == incoming.player_id {
            tracing::warn!(
                taker = %incoming.id,
                resting = %candidate.id,
                "{}",
                BazaarError::SelfTrade {
                    player: candidate.player_id
                },
            );
            plan.skipped_self.push(candidate.id);
            continue;
        }

        let fill_qty = plan.remaining.min(candidate.remaining());
        debug_assert!(fill_qty > 0, "inactive orders never rest in the book");

        plan.fills.push(ProposedFill {
            resting_order_id: candidate.id,
            resting_player_id: candidate.player_id,
            quantity: fill_qty,
            price: candidate.limit_price,
        });
        plan.remaining -= fill_qty;
    }

    plan
}
