//! # Math
//!
//! Checked fee, deposit and reward arithmetic. Everything here is pure so it
//! can be property-tested without an `Env`.

use crate::Error;

/// Basis-point denominator.
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Success fee taken from `min(raised, goal)`: 2%.
pub const FEE_BPS: i128 = 200;

/// Creator deposit posted at `init`: 2% of goal.
pub const DEPOSIT_BPS: i128 = 200;

/// Funding window from creation to deadline: 60 days.
pub const FUNDING_WINDOW_SECS: u64 = 60 * 24 * 60 * 60;

/// Deposit required for `goal`.
pub fn deposit_for_goal(goal: i128) -> Result<i128, Error> {
    goal.checked_mul(DEPOSIT_BPS)
        .map(|scaled| scaled / BPS_DENOMINATOR)
        .ok_or(Error::Overflow)
}

/// Deadline for a campaign opened at `created_at`.
pub fn deadline_from(created_at: u64) -> Result<u64, Error> {
    created_at
        .checked_add(FUNDING_WINDOW_SECS)
        .ok_or(Error::Overflow)
}

/// Split the success payout into `(creator_amount, fee)`.
///
/// Only `min(raised, goal)` is distributed; the fee is rounded down and the
/// creator receives the remainder, so the two always sum to the base.
pub fn success_split(raised: i128, goal: i128) -> Result<(i128, i128), Error> {
    let base = raised.min(goal);
    let fee = base
        .checked_mul(FEE_BPS)
        .map(|scaled| scaled / BPS_DENOMINATOR)
        .ok_or(Error::Overflow)?;
    Ok((base - fee, fee))
}

/// Split the deposit on failure into `(admin_share, creator_share)`.
///
/// The admin gets the rounded-down half; the odd unit goes to the creator.
pub fn deposit_split(deposit: i128) -> (i128, i128) {
    let admin_share = deposit / 2;
    (admin_share, deposit - admin_share)
}

/// Reward tokens owed for `amount` contributed at `token_rate`.
pub fn reward_for(amount: i128, token_rate: i128) -> Result<i128, Error> {
    amount.checked_mul(token_rate).ok_or(Error::Overflow)
}

/// Whether a pool of `token_pool` covers the rewards owed on `raised`.
pub fn pool_covers(raised: i128, token_rate: i128, token_pool: i128) -> bool {
    reward_for(raised, token_rate).is_ok_and(|owed| owed <= token_pool)
}

/// Reward tokens that no contribution can ever claim.
pub fn unreserved_rewards(raised: i128, token_rate: i128, token_pool: i128) -> Result<i128, Error> {
    let owed = reward_for(raised, token_rate)?;
    Ok(token_pool.checked_sub(owed).ok_or(Error::Overflow)?.max(0))
}

/// Currency raised above the goal; zero when the goal was met exactly.
pub fn surplus(raised: i128, goal: i128) -> i128 {
    if raised > goal {
        raised - goal
    } else {
        0
    }
}
