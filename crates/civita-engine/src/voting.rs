//! Quadratic vote pricing.
//!
//! The cost to hold N votes on one proposal is N² credits; repeated calls pay
//! the marginal difference. Reputation discounts shave basis points off the
//! marginal cost, floored so that no vote is ever free.

use crate::error::EngineError;
use crate::reputation::ReputationTier;

/// Basis-point denominator (10_000 = 1.0).
const BPS_DENOMINATOR: u128 = 10_000;

/// Total cost to hold `votes` votes on one proposal.
pub fn total_cost(votes: u128) -> Result<u128, EngineError> {
    votes.checked_mul(votes).ok_or(EngineError::CostOverflow)
}

/// Undiscounted cost of going from `old_total` to `old_total + additional`
/// votes on one proposal.
pub fn marginal_cost(old_total: u128, additional: u128) -> Result<u128, EngineError> {
    let new_total = old_total
        .checked_add(additional)
        .ok_or(EngineError::CostOverflow)?;
    Ok(total_cost(new_total)? - total_cost(old_total)?)
}

/// Apply a bps discount, rounding down.
pub fn apply_discount(cost: u128, discount_bps: u16) -> Result<u128, EngineError> {
    let keep = BPS_DENOMINATOR - discount_bps as u128;
    cost.checked_mul(keep)
        .map(|scaled| scaled / BPS_DENOMINATOR)
        .ok_or(EngineError::CostOverflow)
}

/// Discounted marginal cost for a vote purchase.
///
/// When exactly one vote is bought and the discount would round the charge
/// to zero, the undiscounted cost is charged instead: every vote costs at
/// least one credit.
pub fn charge(old_total: u128, additional: u128, tier: ReputationTier) -> Result<u128, EngineError> {
    let base = marginal_cost(old_total, additional)?;
    let discounted = apply_discount(base, tier.discount_bps())?;
    if additional == 1 && discounted == 0 {
        return Ok(base);
    }
    Ok(discounted)
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
pub fn integer_sqrt(n: u128) -> u128 {
    if n <= 1 {
        return n;
    }

    let mut x = n;
    let mut y = (x + 1) / 2;

    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }

    x
}

/// Most votes a fresh voter can afford with `budget` credits
/// (before any discount).
pub fn max_votes_from_budget(budget: u128) -> u128 {
    integer_sqrt(budget)
}
