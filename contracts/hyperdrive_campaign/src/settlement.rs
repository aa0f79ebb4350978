//! # Settlement Engine
//!
//! Every operation follows the same shape:
//!
//! 1. [`Settlement::begin`] loads config and state and resolves the phase
//!    against the ledger clock.
//! 2. Preconditions are checked against that snapshot. Nothing has been
//!    written yet, so an early `Err` leaves no trace.
//! 3. The operation stages at most one record change and any payouts.
//! 4. [`Settlement::commit`] runs the transition checker, then writes the
//!    record and state and executes payouts.
//!
//! Soroban reverts the whole invocation on any error, so a failed payout
//! also undoes the writes of step 4.

use soroban_sdk::{token, Address, Env, Vec};

use crate::events::{self, DepositReturned, DepositSplit, FundsWithdrawn, PhaseResolved};
use crate::ledger;
use crate::math;
use crate::storage;
use crate::types::{Campaign, CampaignConfig, CampaignState, ContributionRecord, Payout, Phase};
use crate::Error;

/// Phase of the campaign at `now`.
///
/// A stored resolution is final. Otherwise the campaign is funding until the
/// deadline, and succeeds iff the goal was met (inclusive).
pub fn resolve_phase(config: &CampaignConfig, state: &CampaignState, now: u64) -> Phase {
    if state.phase.is_resolved() {
        return state.phase;
    }
    if now < config.deadline {
        Phase::Funding
    } else if state.raised >= config.goal {
        Phase::Succeeded
    } else {
        Phase::Failed
    }
}

struct StagedRecord {
    owner: Address,
    before: ContributionRecord,
    after: ContributionRecord,
}

/// One atomic state transition under construction.
pub struct Settlement {
    env: Env,
    config: CampaignConfig,
    before: CampaignState,
    state: CampaignState,
    staged: Option<StagedRecord>,
    payouts: Vec<Payout>,
}

impl Settlement {
    pub fn begin(env: &Env) -> Result<Self, Error> {
        let config = storage::load_config(env)?;
        let before = storage::load_state(env)?;
        let mut state = before.clone();
        state.phase = resolve_phase(&config, &before, env.ledger().timestamp());

        Ok(Settlement {
            env: env.clone(),
            config,
            before,
            state,
            staged: None,
            payouts: Vec::new(env),
        })
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    fn require_succeeded(&self) -> Result<(), Error> {
        match self.state.phase {
            Phase::Funding => Err(Error::StillFunding),
            Phase::Failed => Err(Error::GoalNotReached),
            Phase::Succeeded => Ok(()),
        }
    }

    fn require_failed(&self) -> Result<(), Error> {
        match self.state.phase {
            Phase::Funding => Err(Error::StillFunding),
            Phase::Succeeded => Err(Error::GoalReached),
            Phase::Failed => Ok(()),
        }
    }

    fn require_creator(&self, caller: &Address) -> Result<(), Error> {
        if *caller != self.config.creator {
            return Err(Error::NotCreator);
        }
        Ok(())
    }

    /// Record of `owner` with a positive contribution.
    fn contribution_of(&self, owner: &Address) -> Result<ContributionRecord, Error> {
        ledger::get(&self.env, owner)
            .filter(|record| record.amount > 0)
            .ok_or(Error::NoContribution)
    }

    /// Stage a change to `owner`'s record. A missing record starts zeroed and
    /// counts as a new contributor.
    fn stage_record<F>(&mut self, owner: &Address, mutator: F) -> Result<ContributionRecord, Error>
    where
        F: FnOnce(&mut ContributionRecord) -> Result<(), Error>,
    {
        let existing = ledger::get(&self.env, owner);
        if existing.is_none() {
            self.state.contributors = self
                .state
                .contributors
                .checked_add(1)
                .ok_or(Error::Overflow)?;
        }
        let before = existing.unwrap_or_default();
        let mut after = before.clone();
        mutator(&mut after)?;

        self.staged = Some(StagedRecord {
            owner: owner.clone(),
            before,
            after: after.clone(),
        });
        Ok(after)
    }

    fn pay(&mut self, token: &Address, to: &Address, amount: i128) {
        if amount > 0 {
            self.payouts.push_back(Payout {
                token: token.clone(),
                to: to.clone(),
                amount,
            });
        }
    }

    /// Check the staged transition and apply it.
    pub fn commit(self) -> Result<CampaignState, Error> {
        check_state_transition(&self.before, &self.state)?;

        match &self.staged {
            Some(staged) => {
                check_record_transition(&self.before, &self.state, &staged.before, &staged.after)?;
                let expected = &staged.before;
                let after = staged.after.clone();
                ledger::upsert(&self.env, &staged.owner, |record| {
                    if *record != *expected {
                        return Err(Error::InvariantViolation);
                    }
                    *record = after;
                    Ok(())
                })?;
            }
            None if self.state.raised != self.before.raised => {
                return Err(Error::InvariantViolation);
            }
            None => {}
        }

        storage::save_state(&self.env, &self.state);

        if !self.before.phase.is_resolved() && self.state.phase.is_resolved() {
            events::emit_phase_resolved(
                &self.env,
                PhaseResolved {
                    phase: self.state.phase,
                    raised: self.state.raised,
                    goal: self.config.goal,
                },
            );
        }

        let custody = self.env.current_contract_address();
        for payout in self.payouts.iter() {
            token::Client::new(&self.env, &payout.token).transfer(&custody, &payout.to, &payout.amount);
        }

        Ok(self.state)
    }
}

fn newly_set(before: bool, after: bool) -> bool {
    !before && after
}

fn never_cleared(before: bool, after: bool) -> bool {
    !before || after
}

fn check_state_transition(before: &CampaignState, after: &CampaignState) -> Result<(), Error> {
    let phase_ok = !before.phase.is_resolved() || after.phase == before.phase;
    let raised_ok = after.raised >= before.raised
        && (after.phase == Phase::Funding || after.raised == before.raised);
    let flags_ok = never_cleared(before.fee_withdrawn, after.fee_withdrawn)
        && never_cleared(before.deposit_returned, after.deposit_returned)
        && never_cleared(before.surplus_withdrawn, after.surplus_withdrawn)
        && (!newly_set(before.fee_withdrawn, after.fee_withdrawn) || after.phase == Phase::Succeeded)
        && (!newly_set(before.surplus_withdrawn, after.surplus_withdrawn)
            || after.phase == Phase::Succeeded)
        && (!newly_set(before.deposit_returned, after.deposit_returned) || after.phase.is_resolved());

    if phase_ok && raised_ok && flags_ok && after.contributors >= before.contributors {
        Ok(())
    } else {
        Err(Error::InvariantViolation)
    }
}

fn check_record_transition(
    state_before: &CampaignState,
    state_after: &CampaignState,
    before: &ContributionRecord,
    after: &ContributionRecord,
) -> Result<(), Error> {
    let amount_delta = after.amount.checked_sub(before.amount).ok_or(Error::Overflow)?;
    let raised_delta = state_after
        .raised
        .checked_sub(state_before.raised)
        .ok_or(Error::Overflow)?;
    let phase = state_after.phase;

    // One record per transition, so its delta must account for all of `raised`.
    let amount_ok = amount_delta >= 0
        && amount_delta == raised_delta
        && (amount_delta == 0 || phase == Phase::Funding);
    let flags_ok = never_cleared(before.tokens_claimed, after.tokens_claimed)
        && never_cleared(before.refunded, after.refunded)
        && (!newly_set(before.tokens_claimed, after.tokens_claimed) || phase == Phase::Succeeded)
        && (!newly_set(before.refunded, after.refunded) || phase == Phase::Failed);

    if amount_ok && flags_ok {
        Ok(())
    } else {
        Err(Error::InvariantViolation)
    }
}

/// Pull `amount` of `token` from `from` into contract custody and verify the
/// contract's balance grew by exactly that much.
fn collect(env: &Env, token: &Address, from: &Address, amount: i128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    let client = token::Client::new(env, token);
    let custody = env.current_contract_address();

    let before = client.balance(&custody);
    client.transfer(from, &custody, &amount);
    let received = client
        .balance(&custody)
        .checked_sub(before)
        .ok_or(Error::Overflow)?;

    if received != amount {
        return Err(Error::AmountMismatch);
    }
    Ok(())
}

// ── Operations ───────────────────────────────────────────────────────

/// Create the campaign singleton and pull the creator's deposit and reward
/// pool into custody.
#[allow(clippy::too_many_arguments)]
pub fn open(
    env: &Env,
    creator: Address,
    admin: Address,
    currency: Address,
    reward_token: Address,
    goal: i128,
    token_rate: i128,
    token_pool: i128,
) -> Result<Campaign, Error> {
    if storage::is_initialized(env) {
        return Err(Error::AlreadyInitialized);
    }
    if goal <= 0 {
        return Err(Error::InvalidGoal);
    }
    if token_rate <= 0 {
        return Err(Error::InvalidTokenRate);
    }
    let deposit = math::deposit_for_goal(goal).map_err(|_| Error::InvalidGoal)?;

    // The pool must be a separate balance and must cover every reward up to
    // the goal, or the campaign could never pay out.
    if currency == reward_token || !math::pool_covers(goal, token_rate, token_pool) {
        return Err(Error::InvalidTokenPool);
    }

    let created_at = env.ledger().timestamp();
    let config = CampaignConfig {
        creator,
        admin,
        currency,
        reward_token,
        goal,
        token_rate,
        deposit,
        token_pool,
        created_at,
        deadline: math::deadline_from(created_at)?,
    };
    let state = CampaignState::opened();

    collect(env, &config.currency, &config.creator, deposit)?;
    collect(env, &config.reward_token, &config.creator, token_pool)?;

    storage::save_campaign(env, &config, &state);
    Ok(Campaign::from_parts(config, state))
}

/// Credit `amount` to `from` after verifying the payment leg.
pub fn contribute(
    env: &Env,
    from: &Address,
    amount: i128,
) -> Result<(ContributionRecord, CampaignState), Error> {
    let mut tx = Settlement::begin(env)?;

    if tx.phase() != Phase::Funding {
        return Err(Error::DeadlinePassed);
    }
    if amount <= 0 {
        return Err(Error::NonPositiveAmount);
    }
    let raised = tx.state.raised.checked_add(amount).ok_or(Error::Overflow)?;
    if !math::pool_covers(raised, tx.config.token_rate, tx.config.token_pool) {
        return Err(Error::InsufficientTokenPool);
    }

    collect(env, &tx.config.currency, from, amount)?;

    tx.state.raised = raised;
    let record = tx.stage_record(from, |record| {
        record.amount = record.amount.checked_add(amount).ok_or(Error::Overflow)?;
        Ok(())
    })?;

    let state = tx.commit()?;
    Ok((record, state))
}

/// Pay `claimant` their reward tokens. Returns the amount paid.
pub fn claim_tokens(env: &Env, claimant: &Address) -> Result<i128, Error> {
    let mut tx = Settlement::begin(env)?;
    tx.require_succeeded()?;

    let record = tx.contribution_of(claimant)?;
    if record.tokens_claimed {
        return Err(Error::AlreadyClaimed);
    }

    let tokens = math::reward_for(record.amount, tx.config.token_rate)?;
    let reward_token = tx.config.reward_token.clone();
    let pool = token::Client::new(env, &reward_token).balance(&env.current_contract_address());
    if pool < tokens {
        return Err(Error::InsufficientTokenPool);
    }

    tx.stage_record(claimant, |record| {
        record.tokens_claimed = true;
        Ok(())
    })?;
    tx.pay(&reward_token, claimant, tokens);
    tx.commit()?;
    Ok(tokens)
}

/// Return `contributor`'s currency after a failed campaign. Returns the amount.
pub fn refund(env: &Env, contributor: &Address) -> Result<i128, Error> {
    let mut tx = Settlement::begin(env)?;
    tx.require_failed()?;

    let record = tx.contribution_of(contributor)?;
    if record.refunded {
        return Err(Error::AlreadyRefunded);
    }

    tx.stage_record(contributor, |record| {
        record.refunded = true;
        Ok(())
    })?;
    let currency = tx.config.currency.clone();
    tx.pay(&currency, contributor, record.amount);
    tx.commit()?;
    Ok(record.amount)
}

/// Pay the creator 98% and the admin 2% of `min(raised, goal)`.
pub fn withdraw_funds(env: &Env, caller: &Address) -> Result<FundsWithdrawn, Error> {
    let mut tx = Settlement::begin(env)?;
    tx.require_creator(caller)?;
    tx.require_succeeded()?;
    if tx.state.fee_withdrawn {
        return Err(Error::AlreadyWithdrawn);
    }

    let (creator_amount, fee) = math::success_split(tx.state.raised, tx.config.goal)?;
    tx.state.fee_withdrawn = true;

    let currency = tx.config.currency.clone();
    let creator = tx.config.creator.clone();
    let admin = tx.config.admin.clone();
    tx.pay(&currency, &creator, creator_amount);
    tx.pay(&currency, &admin, fee);
    tx.commit()?;

    Ok(FundsWithdrawn {
        creator,
        creator_amount,
        fee,
    })
}

/// Release the currency raised above the goal to the creator, fee-free.
pub fn withdraw_surplus(env: &Env, caller: &Address) -> Result<i128, Error> {
    let mut tx = Settlement::begin(env)?;
    tx.require_creator(caller)?;
    tx.require_succeeded()?;
    if tx.state.surplus_withdrawn {
        return Err(Error::SurplusAlreadyWithdrawn);
    }

    let amount = math::surplus(tx.state.raised, tx.config.goal);
    if amount == 0 {
        return Err(Error::NoSurplus);
    }
    tx.state.surplus_withdrawn = true;

    let currency = tx.config.currency.clone();
    let creator = tx.config.creator.clone();
    tx.pay(&currency, &creator, amount);
    tx.commit()?;
    Ok(amount)
}

/// Give the deposit back to the creator after success, along with the reward
/// tokens that no contributor is owed.
pub fn return_deposit(env: &Env) -> Result<DepositReturned, Error> {
    let mut tx = Settlement::begin(env)?;
    tx.require_succeeded()?;
    if tx.state.deposit_returned {
        return Err(Error::DepositAlreadyReturned);
    }
    tx.state.deposit_returned = true;

    let tokens_returned = math::unreserved_rewards(
        tx.state.raised,
        tx.config.token_rate,
        tx.config.token_pool,
    )?;
    let currency = tx.config.currency.clone();
    let reward_token = tx.config.reward_token.clone();
    let creator = tx.config.creator.clone();
    let amount = tx.config.deposit;
    tx.pay(&currency, &creator, amount);
    tx.pay(&reward_token, &creator, tokens_returned);
    tx.commit()?;

    Ok(DepositReturned {
        creator,
        amount,
        tokens_returned,
    })
}

/// Split the deposit between admin and creator after failure, and hand the
/// unused reward pool back to the creator.
pub fn reclaim_deposit_on_failure(env: &Env) -> Result<DepositSplit, Error> {
    let mut tx = Settlement::begin(env)?;
    tx.require_failed()?;
    if tx.state.deposit_returned {
        return Err(Error::DepositAlreadyReturned);
    }
    tx.state.deposit_returned = true;

    let (admin_share, creator_share) = math::deposit_split(tx.config.deposit);
    let currency = tx.config.currency.clone();
    let reward_token = tx.config.reward_token.clone();
    let creator = tx.config.creator.clone();
    let admin = tx.config.admin.clone();
    let tokens_returned =
        token::Client::new(env, &reward_token).balance(&env.current_contract_address());

    tx.pay(&currency, &admin, admin_share);
    tx.pay(&currency, &creator, creator_share);
    tx.pay(&reward_token, &creator, tokens_returned);
    tx.commit()?;

    Ok(DepositSplit {
        admin_share,
        creator_share,
        tokens_returned,
    })
}

/// Persist the phase resolution if the deadline has passed.
pub fn finalize(env: &Env) -> Result<Phase, Error> {
    let tx = Settlement::begin(env)?;
    let state = tx.commit()?;
    Ok(state.phase)
}

/// Phase at the current ledger time, without writing anything.
pub fn current_phase(env: &Env) -> Result<Phase, Error> {
    let config = storage::load_config(env)?;
    let state = storage::load_state(env)?;
    Ok(resolve_phase(&config, &state, env.ledger().timestamp()))
}
