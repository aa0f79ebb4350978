//! # Events
//!
//! Every committed operation publishes one event. The first topic is a short
//! symbol naming the operation; contributor-scoped events carry the
//! contributor address as the second topic. The gateway indexer decodes
//! these by topic name.
//!
//! | Topic        | Data               |
//! |--------------|--------------------|
//! | `opened`     | [`CampaignOpened`] |
//! | `contrib`    | [`Contributed`]    |
//! | `resolved`   | [`PhaseResolved`]  |
//! | `claimed`    | [`TokensClaimed`]  |
//! | `refunded`   | [`Refunded`]       |
//! | `withdrawn`  | [`FundsWithdrawn`] |
//! | `surplus`    | [`SurplusWithdrawn`] |
//! | `dep_ret`    | [`DepositReturned`] |
//! | `dep_split`  | [`DepositSplit`]   |

use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::types::Phase;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignOpened {
    pub creator: Address,
    pub admin: Address,
    pub goal: i128,
    pub token_rate: i128,
    pub deposit: i128,
    pub deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contributed {
    pub contributor: Address,
    pub amount: i128,
    pub raised: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseResolved {
    pub phase: Phase,
    pub raised: i128,
    pub goal: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokensClaimed {
    pub claimant: Address,
    pub tokens: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Refunded {
    pub contributor: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundsWithdrawn {
    pub creator: Address,
    pub creator_amount: i128,
    pub fee: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SurplusWithdrawn {
    pub creator: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositReturned {
    pub creator: Address,
    pub amount: i128,
    /// Reward tokens beyond what contributors can claim.
    pub tokens_returned: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositSplit {
    pub admin_share: i128,
    pub creator_share: i128,
    /// Unused reward tokens sent back to the creator.
    pub tokens_returned: i128,
}

pub fn emit_opened(env: &Env, data: CampaignOpened) {
    env.events().publish((symbol_short!("opened"),), data);
}

pub fn emit_contributed(env: &Env, data: Contributed) {
    env.events()
        .publish((symbol_short!("contrib"), data.contributor.clone()), data);
}

pub fn emit_phase_resolved(env: &Env, data: PhaseResolved) {
    env.events().publish((symbol_short!("resolved"),), data);
}

pub fn emit_tokens_claimed(env: &Env, data: TokensClaimed) {
    env.events()
        .publish((symbol_short!("claimed"), data.claimant.clone()), data);
}

pub fn emit_refunded(env: &Env, data: Refunded) {
    env.events()
        .publish((symbol_short!("refunded"), data.contributor.clone()), data);
}

pub fn emit_funds_withdrawn(env: &Env, data: FundsWithdrawn) {
    env.events().publish((symbol_short!("withdrawn"),), data);
}

pub fn emit_surplus_withdrawn(env: &Env, data: SurplusWithdrawn) {
    env.events().publish((symbol_short!("surplus"),), data);
}

pub fn emit_deposit_returned(env: &Env, data: DepositReturned) {
    env.events().publish((symbol_short!("dep_ret"),), data);
}

pub fn emit_deposit_split(env: &Env, data: DepositSplit) {
    env.events().publish((symbol_short!("dep_split"),), data);
}
