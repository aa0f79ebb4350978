//! # Ledger Store
//!
//! Durable per-contributor [`ContributionRecord`]s ("boxes") keyed by the
//! contributor's address. Only the settlement engine writes here.

use soroban_sdk::{Address, Env};

use crate::storage::{DataKey, PERSISTENT_BUMP_AMOUNT, PERSISTENT_LIFETIME_THRESHOLD};
use crate::types::ContributionRecord;
use crate::Error;

fn bump(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

/// Look up the record for `owner`.
pub fn get(env: &Env, owner: &Address) -> Option<ContributionRecord> {
    let key = DataKey::Box(owner.clone());
    let record = env.storage().persistent().get(&key);
    if record.is_some() {
        bump(env, &key);
    }
    record
}

/// Load the record for `owner` (or a zeroed one), apply `mutator` to a copy
/// and write it back only if the mutator succeeds.
///
/// Returns the written record and whether it was created by this call.
pub fn upsert<F>(env: &Env, owner: &Address, mutator: F) -> Result<(ContributionRecord, bool), Error>
where
    F: FnOnce(&mut ContributionRecord) -> Result<(), Error>,
{
    let key = DataKey::Box(owner.clone());
    let existing: Option<ContributionRecord> = env.storage().persistent().get(&key);
    let created = existing.is_none();

    let mut record = existing.unwrap_or_default();
    mutator(&mut record)?;

    env.storage().persistent().set(&key, &record);
    bump(env, &key);
    Ok((record, created))
}
