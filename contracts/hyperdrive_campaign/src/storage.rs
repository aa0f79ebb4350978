//! # Storage
//!
//! Typed helpers over Soroban's two storage tiers used by the campaign:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key      | Type             | Description                      |
//! |----------|------------------|----------------------------------|
//! | `Config` | `CampaignConfig` | Immutable campaign configuration |
//! | `State`  | `CampaignState`  | Mutable campaign state           |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key          | Type                 | Description               |
//! |--------------|----------------------|---------------------------|
//! | `Box(addr)`  | `ContributionRecord` | One record per contributor |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days
//! remaining. Record access goes through [`crate::ledger`].

use soroban_sdk::{contracttype, Address, Env};

use crate::types::{Campaign, CampaignConfig, CampaignState};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

pub(crate) const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
pub(crate) const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

/// All contract storage keys.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Immutable campaign configuration (Instance).
    Config,
    /// Mutable campaign state (Instance).
    State,
    /// Contribution record keyed by contributor (Persistent).
    Box(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

/// Write the config and the opening state for a freshly deployed campaign.
pub fn save_campaign(env: &Env, config: &CampaignConfig, state: &CampaignState) {
    env.storage().instance().set(&DataKey::Config, config);
    env.storage().instance().set(&DataKey::State, state);
    bump_instance(env);
}

pub fn load_config(env: &Env) -> Result<CampaignConfig, Error> {
    let config = env
        .storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)?;
    bump_instance(env);
    Ok(config)
}

pub fn load_state(env: &Env) -> Result<CampaignState, Error> {
    let state = env
        .storage()
        .instance()
        .get(&DataKey::State)
        .ok_or(Error::NotInitialized)?;
    bump_instance(env);
    Ok(state)
}

/// Save only the mutable state.
pub fn save_state(env: &Env, state: &CampaignState) {
    env.storage().instance().set(&DataKey::State, state);
    bump_instance(env);
}

pub fn load_campaign(env: &Env) -> Result<Campaign, Error> {
    Ok(Campaign::from_parts(load_config(env)?, load_state(env)?))
}
