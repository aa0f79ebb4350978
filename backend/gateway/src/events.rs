//! Canonical event types emitted by the campaign contract.
//!
//! These mirror the topics published by `contracts/hyperdrive_campaign/src/events.rs`.

use serde::{Deserialize, Serialize};

/// All recognised event kinds from the campaign contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The campaign was initialised (`opened` topic).
    CampaignOpened,
    /// A contribution was credited (`contrib` topic).
    Contributed,
    /// The phase was resolved and persisted (`resolved` topic).
    PhaseResolved,
    /// Reward tokens were paid to a contributor (`claimed` topic).
    TokensClaimed,
    /// A contributor was refunded (`refunded` topic).
    Refunded,
    /// The creator and admin were paid out (`withdrawn` topic).
    FundsWithdrawn,
    /// The surplus above goal went to the creator (`surplus` topic).
    SurplusWithdrawn,
    /// The deposit went back to the creator (`dep_ret` topic).
    DepositReturned,
    /// The deposit was split after failure (`dep_split` topic).
    DepositSplit,
    /// An event from this contract that we don't recognise yet.
    Unknown,
}

impl EventKind {
    /// Parse the leading topic symbol string produced by Soroban into an [`EventKind`].
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "opened" => Self::CampaignOpened,
            "contrib" => Self::Contributed,
            "resolved" => Self::PhaseResolved,
            "claimed" => Self::TokensClaimed,
            "refunded" => Self::Refunded,
            "withdrawn" => Self::FundsWithdrawn,
            "surplus" => Self::SurplusWithdrawn,
            "dep_ret" => Self::DepositReturned,
            "dep_split" => Self::DepositSplit,
            _ => Self::Unknown,
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CampaignOpened => "campaign_opened",
            Self::Contributed => "contributed",
            Self::PhaseResolved => "phase_resolved",
            Self::TokensClaimed => "tokens_claimed",
            Self::Refunded => "refunded",
            Self::FundsWithdrawn => "funds_withdrawn",
            Self::SurplusWithdrawn => "surplus_withdrawn",
            Self::DepositReturned => "deposit_returned",
            Self::DepositSplit => "deposit_split",
            Self::Unknown => "unknown",
        }
    }
}

/// A fully decoded campaign event, ready to be stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignEvent {
    /// RPC event id; unique per event, used to make inserts idempotent.
    pub event_id: String,
    pub event_type: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub phase: Option<String>,
    pub deadline: Option<i64>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub phase: Option<String>,
    pub deadline: Option<i64>,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        serde_json::from_value(serde_json::Value::String(self.event_type.clone()))
            .unwrap_or(EventKind::Unknown)
    }

    /// The stored amount as an integer. Amounts are i128 on chain.
    pub fn amount_i128(&self) -> Option<i128> {
        self.amount.as_deref().and_then(|a| a.parse().ok())
    }
}
