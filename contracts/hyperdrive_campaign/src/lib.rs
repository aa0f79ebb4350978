//! # Hyperdrive Campaign Contract
//!
//! One deployed instance of this contract is one crowdfunding campaign. It
//! holds the raised currency, the creator's deposit and the reward-token
//! pool, and decides exactly once who gets what.
//!
//! | Phase      | Entry Point(s)                                            |
//! |------------|-----------------------------------------------------------|
//! | Bootstrap  | [`HyperdriveCampaign::init`]                              |
//! | Funding    | [`HyperdriveCampaign::contribute`]                        |
//! | Succeeded  | `claim_tokens`, `withdraw_funds`, `withdraw_surplus`, `return_deposit` |
//! | Failed     | `refund`, `reclaim_deposit_on_failure`                    |
//! | Any        | `finalize`, `get_campaign`, `get_contribution`, `phase`   |
//!
//! ## Architecture
//!
//! Validation and state transitions live in [`settlement`]. Contribution
//! records live in [`ledger`], the campaign singleton in [`storage`]. This
//! file contains only the public entry points, authorization and event
//! emissions.

#![no_std]

#[cfg(test)]
extern crate std;

use soroban_sdk::{contract, contracterror, contractimpl, Address, Env};

pub mod events;
mod ledger;
pub mod math;
pub mod settlement;
mod storage;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;

use events::{
    CampaignOpened, Contributed, DepositReturned, DepositSplit, FundsWithdrawn, Refunded,
    SurplusWithdrawn, TokensClaimed,
};
pub use types::{Campaign, CampaignConfig, CampaignState, ContributionRecord, Phase};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidGoal = 3,
    InvalidTokenRate = 4,
    InvalidTokenPool = 5,
    NonPositiveAmount = 6,
    DeadlinePassed = 7,
    AmountMismatch = 8,
    StillFunding = 9,
    GoalNotReached = 10,
    GoalReached = 11,
    NotCreator = 12,
    AlreadyClaimed = 13,
    AlreadyRefunded = 14,
    AlreadyWithdrawn = 15,
    DepositAlreadyReturned = 16,
    SurplusAlreadyWithdrawn = 17,
    NoContribution = 18,
    NoSurplus = 19,
    InsufficientTokenPool = 20,
    Overflow = 21,
    InvariantViolation = 22,
}

/// Coarse classification of [`Error`] for callers deciding how to react.
///
/// None of these are transient: resubmitting the same operation against the
/// same state fails the same way.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Wrong phase, deadline, caller or input.
    PreconditionViolation,
    /// The payment that arrived does not match the declared amount.
    AmountMismatch,
    /// A one-time action was attempted again.
    DuplicateAction,
    /// The address has no contribution record.
    NotFound,
    /// Arithmetic overflow or a failed transition check.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AmountMismatch => ErrorKind::AmountMismatch,
            Error::AlreadyClaimed
            | Error::AlreadyRefunded
            | Error::AlreadyWithdrawn
            | Error::DepositAlreadyReturned
            | Error::SurplusAlreadyWithdrawn => ErrorKind::DuplicateAction,
            Error::NoContribution => ErrorKind::NotFound,
            Error::Overflow | Error::InvariantViolation => ErrorKind::Internal,
            Error::AlreadyInitialized
            | Error::NotInitialized
            | Error::InvalidGoal
            | Error::InvalidTokenRate
            | Error::InvalidTokenPool
            | Error::NonPositiveAmount
            | Error::DeadlinePassed
            | Error::StillFunding
            | Error::GoalNotReached
            | Error::GoalReached
            | Error::NotCreator
            | Error::NoSurplus
            | Error::InsufficientTokenPool => ErrorKind::PreconditionViolation,
        }
    }
}

#[contract]
pub struct HyperdriveCampaign;

#[contractimpl]
impl HyperdriveCampaign {
    // ─────────────────────────────────────────────────────────
    // Deployment
    // ─────────────────────────────────────────────────────────

    /// Open the campaign.
    ///
    /// Must be called exactly once after deployment. `creator` signs and
    /// funds the 2% deposit in `currency` plus `token_pool` units of
    /// `reward_token`. The pool must be a different token from `currency`
    /// and hold at least `goal * token_rate`. The deadline is fixed at 60
    /// days from now.
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        env: Env,
        creator: Address,
        admin: Address,
        currency: Address,
        reward_token: Address,
        goal: i128,
        token_rate: i128,
        token_pool: i128,
    ) -> Result<Campaign, Error> {
        creator.require_auth();
        let campaign = settlement::open(
            &env,
            creator,
            admin,
            currency,
            reward_token,
            goal,
            token_rate,
            token_pool,
        )?;

        events::emit_opened(
            &env,
            CampaignOpened {
                creator: campaign.creator.clone(),
                admin: campaign.admin.clone(),
                goal: campaign.goal,
                token_rate: campaign.token_rate,
                deposit: campaign.deposit,
                deadline: campaign.deadline,
            },
        );
        Ok(campaign)
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Contribute `amount` of the campaign currency.
    ///
    /// The payment is pulled from `from` inside this call; the same
    /// authorization covers both the call and the transfer, so they succeed
    /// or fail together. A contribution the reward pool cannot back is
    /// rejected with `InsufficientTokenPool`.
    pub fn contribute(env: Env, from: Address, amount: i128) -> Result<ContributionRecord, Error> {
        from.require_auth();
        let (record, state) = settlement::contribute(&env, &from, amount)?;

        events::emit_contributed(
            &env,
            Contributed {
                contributor: from,
                amount,
                raised: state.raised,
            },
        );
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────

    /// Claim reward tokens for `claimant`'s contribution. Success only, once.
    pub fn claim_tokens(env: Env, claimant: Address) -> Result<i128, Error> {
        claimant.require_auth();
        let tokens = settlement::claim_tokens(&env, &claimant)?;
        events::emit_tokens_claimed(&env, TokensClaimed { claimant, tokens });
        Ok(tokens)
    }

    /// Get `contributor`'s currency back. Failure only, once.
    pub fn refund(env: Env, contributor: Address) -> Result<i128, Error> {
        contributor.require_auth();
        let amount = settlement::refund(&env, &contributor)?;
        events::emit_refunded(&env, Refunded { contributor, amount });
        Ok(amount)
    }

    /// Pay out `min(raised, goal)`: 98% to the creator, 2% to the admin.
    pub fn withdraw_funds(env: Env, caller: Address) -> Result<FundsWithdrawn, Error> {
        caller.require_auth();
        let withdrawn = settlement::withdraw_funds(&env, &caller)?;
        events::emit_funds_withdrawn(&env, withdrawn.clone());
        Ok(withdrawn)
    }

    /// Pay the amount raised above the goal to the creator.
    pub fn withdraw_surplus(env: Env, caller: Address) -> Result<i128, Error> {
        caller.require_auth();
        let amount = settlement::withdraw_surplus(&env, &caller)?;
        events::emit_surplus_withdrawn(
            &env,
            SurplusWithdrawn {
                creator: caller,
                amount,
            },
        );
        Ok(amount)
    }

    /// Return the deposit and the unreserved reward tokens to the creator
    /// after success. Anyone may trigger it; the payee is always the creator.
    pub fn return_deposit(env: Env, caller: Address) -> Result<DepositReturned, Error> {
        caller.require_auth();
        let returned = settlement::return_deposit(&env)?;
        events::emit_deposit_returned(&env, returned.clone());
        Ok(returned)
    }

    /// Split the deposit 50/50 between admin and creator after failure.
    pub fn reclaim_deposit_on_failure(env: Env, caller: Address) -> Result<DepositSplit, Error> {
        caller.require_auth();
        let split = settlement::reclaim_deposit_on_failure(&env)?;
        events::emit_deposit_split(&env, split.clone());
        Ok(split)
    }

    /// Persist the phase resolution once the deadline has passed.
    pub fn finalize(env: Env) -> Result<Phase, Error> {
        settlement::finalize(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get_campaign(env: Env) -> Result<Campaign, Error> {
        storage::load_campaign(&env)
    }

    pub fn get_contribution(env: Env, contributor: Address) -> Option<ContributionRecord> {
        ledger::get(&env, &contributor)
    }

    /// Phase at the current ledger time, resolved or not yet persisted.
    pub fn phase(env: Env) -> Result<Phase, Error> {
        settlement::current_phase(&env)
    }
}
