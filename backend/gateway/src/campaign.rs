//! Project listings and the gateway's read-only view of a campaign.
//!
//! The contract is the only authority on phase and balances. The summary
//! here is folded from indexed events and is used to show progress and to
//! turn away requests that the contract would certainly reject.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bundle::{check_account, check_contract};
use crate::errors::{GatewayError, Result};
use crate::events::{EventKind, EventRecord};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub creator: String,
    pub category: String,
    pub goal: i64,
    pub token_rate: i64,
    pub token_pool: i64,
    pub reward_token: String,
    pub description: String,
    pub problem: String,
    pub solution: String,
    pub business_model: String,
    pub investment_ask: String,
    pub incentive_pool: String,
    pub contact_email: String,
    pub project_link: String,
    pub contract_id: Option<String>,
    pub created_at: i64,
}

impl Project {
    /// The deployed campaign contract, or 409 if there is none yet.
    pub fn deployed(&self) -> Result<&str> {
        self.contract_id
            .as_deref()
            .ok_or(GatewayError::NotDeployed(self.id))
    }
}

/// Body of `POST /projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub creator: String,
    #[serde(default)]
    pub category: String,
    pub goal: i64,
    pub token_rate: i64,
    pub token_pool: i64,
    pub reward_token: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub business_model: String,
    #[serde(default)]
    pub investment_ask: String,
    #[serde(default)]
    pub incentive_pool: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub project_link: String,
}

impl NewProject {
    /// Reject listings whose `init` the contract would refuse. `currency` is
    /// the token campaigns raise funds in.
    pub fn validate(&self, currency: &str) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::BadRequest("name must not be empty".into()));
        }
        if self.goal <= 0 {
            return Err(GatewayError::BadRequest("goal must be positive".into()));
        }
        if self.token_rate <= 0 {
            return Err(GatewayError::BadRequest("token_rate must be positive".into()));
        }
        if self.token_pool < 0 {
            return Err(GatewayError::BadRequest("token_pool must not be negative".into()));
        }
        if self.reward_token == currency {
            return Err(GatewayError::BadRequest(
                "reward_token must differ from the campaign currency".into(),
            ));
        }
        let covers_goal = self
            .goal
            .checked_mul(self.token_rate)
            .is_some_and(|owed| owed <= self.token_pool);
        if !covers_goal {
            return Err(GatewayError::BadRequest(
                "token_pool must cover goal * token_rate".into(),
            ));
        }
        check_account(&self.creator)?;
        check_contract(&self.reward_token)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Funding,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "funding" => Some(Self::Funding),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Mirror of the contract's phase resolution.
///
/// A resolution seen on chain is final. Before the campaign is opened there
/// is no deadline and it counts as funding.
pub fn project_phase(
    resolved: Option<Phase>,
    raised: i128,
    goal: i128,
    deadline: Option<i64>,
    now: i64,
) -> Phase {
    if let Some(phase) = resolved {
        if phase != Phase::Funding {
            return phase;
        }
    }
    match deadline {
        Some(deadline) if now >= deadline => {
            if raised >= goal {
                Phase::Succeeded
            } else {
                Phase::Failed
            }
        }
        _ => Phase::Funding,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub project_id: i64,
    pub contract_id: Option<String>,
    pub goal: String,
    pub raised: String,
    pub contributors: usize,
    pub deadline: Option<i64>,
    pub phase: Phase,
    pub tokens_claimed: String,
    pub refunded: String,
    pub funds_withdrawn: bool,
    pub surplus_withdrawn: bool,
    pub deposit_settled: bool,
}

/// Fold the indexed events of `project`'s contract into a summary at `now`.
pub fn summarize(project: &Project, events: &[EventRecord], now: i64) -> CampaignSummary {
    let mut goal = i128::from(project.goal);
    let mut deadline = None;
    let mut raised: i128 = 0;
    let mut contributors = HashSet::new();
    let mut resolved = None;
    let mut tokens_claimed: i128 = 0;
    let mut refunded: i128 = 0;
    let mut funds_withdrawn = false;
    let mut surplus_withdrawn = false;
    let mut deposit_settled = false;

    for event in events {
        let amount = event.amount_i128().unwrap_or(0);
        match event.kind() {
            EventKind::CampaignOpened => {
                if amount > 0 {
                    goal = amount;
                }
                deadline = event.deadline;
            }
            EventKind::Contributed => {
                raised = raised.saturating_add(amount);
                if let Some(actor) = &event.actor {
                    contributors.insert(actor.clone());
                }
            }
            EventKind::PhaseResolved => {
                resolved = event.phase.as_deref().and_then(Phase::from_name);
            }
            EventKind::TokensClaimed => tokens_claimed = tokens_claimed.saturating_add(amount),
            EventKind::Refunded => refunded = refunded.saturating_add(amount),
            EventKind::FundsWithdrawn => funds_withdrawn = true,
            EventKind::SurplusWithdrawn => surplus_withdrawn = true,
            EventKind::DepositReturned | EventKind::DepositSplit => deposit_settled = true,
            EventKind::Unknown => {}
        }
    }

    CampaignSummary {
        project_id: project.id,
        contract_id: project.contract_id.clone(),
        goal: goal.to_string(),
        raised: raised.to_string(),
        contributors: contributors.len(),
        deadline,
        phase: project_phase(resolved, raised, goal, deadline, now),
        tokens_claimed: tokens_claimed.to_string(),
        refunded: refunded.to_string(),
        funds_withdrawn,
        surplus_withdrawn,
        deposit_settled,
    }
}

/// Turn away a contribution the reward pool could no longer back.
pub fn ensure_reward_capacity(
    project: &Project,
    summary: &CampaignSummary,
    amount: i64,
) -> Result<()> {
    let raised: i128 = summary.raised.parse().unwrap_or(0);
    let covered = raised
        .checked_add(i128::from(amount))
        .and_then(|total| total.checked_mul(i128::from(project.token_rate)))
        .is_some_and(|owed| owed <= i128::from(project.token_pool));
    if covered {
        Ok(())
    } else {
        Err(GatewayError::BadRequest(format!(
            "cannot contribute {amount}: the reward pool cannot back it"
        )))
    }
}

/// Turn away an action the contract would reject in the current phase.
pub fn ensure_phase(summary: &CampaignSummary, expected: Phase, action: &str) -> Result<()> {
    if summary.phase == expected {
        return Ok(());
    }
    let reason = match (expected, summary.phase) {
        (Phase::Funding, _) => "the funding deadline has passed",
        (_, Phase::Funding) => "the campaign is still funding",
        (Phase::Succeeded, _) => "the campaign did not reach its goal",
        (Phase::Failed, _) => "the campaign reached its goal",
    };
    Err(GatewayError::BadRequest(format!("cannot {action}: {reason}")))
}
