//! Unsigned operation bundles for clients to sign.
//!
//! A bundle is an ordered list of legs. Each leg is serialized as JSON in
//! field declaration order and base64-encoded (standard alphabet). The group
//! id is the hex SHA-256 over the encoded legs in order; legs sharing a group
//! id must be signed and submitted together.
//!
//! | Bundle            | Legs                                 |
//! |-------------------|--------------------------------------|
//! | init              | `call init`                          |
//! | contribution      | `payment` then `call contribute`     |
//! | claim tokens      | `call claim_tokens`                  |
//! | refund            | `call refund`                        |

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::campaign::Project;
use crate::errors::{GatewayError, Result};

const STRKEY_LEN: usize = 56;

/// An argument of a contract call leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Arg {
    Address(String),
    /// Decimal text; JSON numbers cannot carry the full i128 range.
    I128(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Leg {
    /// Authorizes the `transfer(from, to, amount)` of `token` that the
    /// following call performs.
    Payment {
        token: String,
        from: String,
        to: String,
        amount: String,
    },
    /// Invokes `function` on `contract`, signed by `signer`.
    Call {
        contract: String,
        function: String,
        signer: String,
        args: Vec<Arg>,
    },
}

impl Leg {
    fn kind(&self) -> &'static str {
        match self {
            Leg::Payment { .. } => "payment",
            Leg::Call { .. } => "call",
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EncodedLeg {
    pub kind: &'static str,
    pub encoded: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub group_id: String,
    pub network_passphrase: String,
    pub legs: Vec<EncodedLeg>,
    pub message: String,
}

fn assemble(network_passphrase: &str, legs: &[Leg], message: &str) -> Result<Bundle> {
    let mut hasher = Sha256::new();
    let mut encoded = Vec::with_capacity(legs.len());
    for leg in legs {
        let e = leg.encode()?;
        hasher.update(e.as_bytes());
        encoded.push(EncodedLeg {
            kind: leg.kind(),
            encoded: e,
        });
    }

    Ok(Bundle {
        group_id: hex::encode(hasher.finalize()),
        network_passphrase: network_passphrase.to_string(),
        legs: encoded,
        message: message.to_string(),
    })
}

fn call(contract: &str, function: &str, signer: &str, args: Vec<Arg>) -> Leg {
    Leg::Call {
        contract: contract.to_string(),
        function: function.to_string(),
        signer: signer.to_string(),
        args,
    }
}

fn address(a: &str) -> Arg {
    Arg::Address(a.to_string())
}

fn int(n: impl Into<i128>) -> Arg {
    Arg::I128(n.into().to_string())
}

// ─────────────────────────────────────────────────────────
// Strkey shape checks
// ─────────────────────────────────────────────────────────

fn check_strkey(addr: &str, prefix: char, what: &str) -> Result<()> {
    let shaped = addr.len() == STRKEY_LEN
        && addr.starts_with(prefix)
        && addr
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c));
    if shaped {
        Ok(())
    } else {
        Err(GatewayError::BadRequest(format!("{addr:?} is not a valid {what} address")))
    }
}

/// An account address (`G...`).
pub fn check_account(addr: &str) -> Result<()> {
    check_strkey(addr, 'G', "account")
}

/// A contract address (`C...`).
pub fn check_contract(addr: &str) -> Result<()> {
    check_strkey(addr, 'C', "contract")
}

// ─────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────

/// Deploy-time `init` for `project`'s campaign contract. The creator signs;
/// the call pulls the deposit and reward pool itself.
pub fn build_init(
    network_passphrase: &str,
    contract: &str,
    project: &Project,
    admin: &str,
    currency: &str,
) -> Result<Bundle> {
    check_contract(contract)?;
    let leg = call(
        contract,
        "init",
        &project.creator,
        vec![
            address(&project.creator),
            address(admin),
            address(currency),
            address(&project.reward_token),
            int(project.goal),
            int(project.token_rate),
            int(project.token_pool),
        ],
    );
    assemble(
        network_passphrase,
        &[leg],
        "Sign to open the campaign; this posts the deposit and the reward pool",
    )
}

/// Payment authorization followed by the `contribute` call.
pub fn build_contribution(
    network_passphrase: &str,
    contract: &str,
    currency: &str,
    from: &str,
    amount: i64,
) -> Result<Bundle> {
    check_account(from)?;
    if amount <= 0 {
        return Err(GatewayError::BadRequest("amount must be positive".into()));
    }

    let legs = [
        Leg::Payment {
            token: currency.to_string(),
            from: from.to_string(),
            to: contract.to_string(),
            amount: amount.to_string(),
        },
        call(contract, "contribute", from, vec![address(from), int(amount)]),
    ];
    assemble(
        network_passphrase,
        &legs,
        "Sign both legs together; they are submitted as one group",
    )
}

pub fn build_claim_tokens(network_passphrase: &str, contract: &str, claimant: &str) -> Result<Bundle> {
    check_account(claimant)?;
    let leg = call(contract, "claim_tokens", claimant, vec![address(claimant)]);
    assemble(network_passphrase, &[leg], "Sign to claim your reward tokens")
}

pub fn build_refund(network_passphrase: &str, contract: &str, contributor: &str) -> Result<Bundle> {
    check_account(contributor)?;
    let leg = call(contract, "refund", contributor, vec![address(contributor)]);
    assemble(network_passphrase, &[leg], "Sign to get your contribution back")
}
