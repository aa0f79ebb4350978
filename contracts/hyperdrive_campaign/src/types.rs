//! # Types
//!
//! Shared data structures used across all modules of the campaign contract.
//!
//! ## Config / State split
//!
//! The campaign singleton is stored as two separate instance entries:
//!
//! - [`CampaignConfig`]: written once by `init`; never mutated.
//! - [`CampaignState`]: written by every committed settlement operation.
//!
//! The public API exposes the reconstructed [`Campaign`] struct.
//!
//! ## Phase
//!
//! [`Phase`] only moves forward:
//!
//! ```text
//! Funding ──► Succeeded
//!     └─────► Failed
//! ```
//!
//! The stored value is a cache of the phase derived from the ledger clock;
//! see [`crate::settlement::resolve_phase`].

use soroban_sdk::{contracttype, Address};

/// Lifecycle stage of the campaign.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Phase {
    /// Accepting contributions; `now < deadline`.
    Funding = 0,
    /// Deadline passed with `raised >= goal`.
    Succeeded = 1,
    /// Deadline passed with `raised < goal`.
    Failed = 2,
}

impl Phase {
    pub fn is_resolved(self) -> bool {
        self != Phase::Funding
    }
}

/// Immutable campaign configuration, written once by `init`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignConfig {
    pub creator: Address,
    pub admin: Address,
    pub currency: Address,
    pub reward_token: Address,
    pub goal: i128,
    pub token_rate: i128,
    pub deposit: i128,
    pub token_pool: i128,
    pub created_at: u64,
    pub deadline: u64,
}

/// Mutable campaign state.
///
/// Kept small so that the write performed by every contribution is cheap.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignState {
    pub raised: i128,
    pub phase: Phase,
    pub contributors: u32,
    pub fee_withdrawn: bool,
    pub deposit_returned: bool,
    pub surplus_withdrawn: bool,
}

impl CampaignState {
    pub fn opened() -> Self {
        CampaignState {
            raised: 0,
            phase: Phase::Funding,
            contributors: 0,
            fee_withdrawn: false,
            deposit_returned: false,
            surplus_withdrawn: false,
        }
    }
}

/// Full view of a campaign, reconstructed from config and state.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Campaign {
    /// Receives the success payout, the deposit and any surplus.
    pub creator: Address,
    /// Receives the 2% success fee and half the deposit on failure.
    pub admin: Address,
    /// Token the campaign raises funds in.
    pub currency: Address,
    /// Token paid to contributors on success.
    pub reward_token: Address,
    /// Funding target in the currency's smallest unit.
    pub goal: i128,
    /// Reward units per currency unit contributed.
    pub token_rate: i128,
    /// Good-faith bond posted by the creator (2% of goal).
    pub deposit: i128,
    /// Reward tokens pulled from the creator at `init`.
    pub token_pool: i128,
    pub created_at: u64,
    /// Ledger timestamp at which funding closes.
    pub deadline: u64,
    /// Sum of all contribution records.
    pub raised: i128,
    /// Stored phase; may still read `Funding` after the deadline until the
    /// first settlement call persists the resolution.
    pub phase: Phase,
    /// Number of distinct contributor records.
    pub contributors: u32,
    pub fee_withdrawn: bool,
    pub deposit_returned: bool,
    pub surplus_withdrawn: bool,
}

impl Campaign {
    pub fn from_parts(config: CampaignConfig, state: CampaignState) -> Self {
        Campaign {
            creator: config.creator,
            admin: config.admin,
            currency: config.currency,
            reward_token: config.reward_token,
            goal: config.goal,
            token_rate: config.token_rate,
            deposit: config.deposit,
            token_pool: config.token_pool,
            created_at: config.created_at,
            deadline: config.deadline,
            raised: state.raised,
            phase: state.phase,
            contributors: state.contributors,
            fee_withdrawn: state.fee_withdrawn,
            deposit_returned: state.deposit_returned,
            surplus_withdrawn: state.surplus_withdrawn,
        }
    }
}

/// Per-contributor record, keyed by contributor address.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContributionRecord {
    /// Total currency contributed.
    pub amount: i128,
    pub tokens_claimed: bool,
    pub refunded: bool,
}

/// A single outbound transfer staged by a settlement operation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub token: Address,
    pub to: Address,
    pub amount: i128,
}
