//! Soroban RPC client: polls `getEvents`, decodes campaign events and relays
//! signed envelopes through `sendTransaction`.
//!
//! ## Resilience
//!
//! * `getEvents` applies exponential back-off when the RPC returns an error or
//!   rate-limit response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * `sendTransaction` is never retried. A resubmitted envelope is either a
//!   duplicate or a second, separately signed action.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{GatewayError, Result};
use crate::events::{CampaignEvent, EventKind};
use crate::rejection;

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

/// `getEvents` accepts at most this many contract ids per filter.
const CONTRACTS_PER_FILTER: usize = 5;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawEvent {
    /// XDR-encoded topic list
    pub topic: Vec<String>,
    /// XDR-encoded event value / data
    pub value: Value,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SendResult {
    pub status: String,
    pub hash: Option<String>,
    #[serde(rename = "errorResultXdr")]
    pub error_result_xdr: Option<String>,
    #[serde(rename = "diagnosticEventsXdr", default)]
    pub diagnostic_events: Vec<String>,
}

/// What the RPC said about a submitted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Accepted for inclusion; confirmation is the caller's concern.
    Pending { hash: String },
    /// Already seen by the network.
    Duplicate { hash: String },
    /// The node is congested; the caller may resubmit later.
    TryAgainLater { hash: Option<String> },
}

// ─────────────────────────────────────────────────────────
// getEvents
// ─────────────────────────────────────────────────────────

/// Fetch a page of events for `contract_ids` from the RPC.
///
/// * `start_ledger`: the ledger sequence to scan from (inclusive).
/// * `cursor`      : optional opaque pagination cursor from a previous response.
/// * `limit`       : maximum number of events to return.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_ids: &[String],
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let params = build_params(contract_ids, start_ledger, cursor, limit);

        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getEvents",
                "params": params,
            }))
            .send()
            .await;

        match response {
            Err(e) => {
                warn!("RPC request failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            Ok(resp) => {
                if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    warn!("Rate-limited by RPC (will retry in {backoff}s)");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let body: RpcResponse<EventsResult> = resp.json().await?;

                if let Some(err) = body.error {
                    if is_hard_error(err.code) {
                        return Err(GatewayError::EventParse(format!(
                            "RPC hard error {}: {}",
                            err.code, err.message
                        )));
                    }
                    warn!(
                        "RPC soft error (will retry in {backoff}s): {} {}",
                        err.code, err.message
                    );
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let result = body.result.ok_or_else(|| {
                    GatewayError::EventParse("Empty result from getEvents".to_string())
                })?;

                debug!(
                    "Fetched {} events (latest_ledger={:?})",
                    result.events.len(),
                    result.latest_ledger
                );

                return Ok((result.events, result.cursor, result.latest_ledger));
            }
        }
    }
}

/// Malformed request or unknown method: retrying cannot help.
fn is_hard_error(code: i64) -> bool {
    code == -32600 || code == -32601 || code == -32602
}

fn build_params(contract_ids: &[String], start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let filters: Vec<Value> = contract_ids
        .chunks(CONTRACTS_PER_FILTER)
        .map(|chunk| {
            json!({
                "type": "contract",
                "contractIds": chunk,
            })
        })
        .collect();

    let mut params = json!({
        "filters": filters,
        "pagination": {
            "limit": limit
        }
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }

    params
}

// ─────────────────────────────────────────────────────────
// sendTransaction
// ─────────────────────────────────────────────────────────

/// Forward a signed envelope to the network.
///
/// A contract error found in the RPC's diagnostics becomes
/// [`GatewayError::Rejected`]; any other refusal is a bad request.
pub async fn send_transaction(client: &Client, rpc_url: &str, envelope: &str) -> Result<SubmitOutcome> {
    let body: RpcResponse<SendResult> = client
        .post(rpc_url)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendTransaction",
            "params": { "transaction": envelope },
        }))
        .send()
        .await?
        .json()
        .await?;

    interpret_send(body)
}

fn interpret_send(body: RpcResponse<SendResult>) -> Result<SubmitOutcome> {
    if let Some(err) = body.error {
        let text = format!("{} {}", err.message, err.data.unwrap_or(Value::Null));
        return Err(rejected_or(&text, || {
            GatewayError::BadRequest(format!("RPC error {}: {}", err.code, err.message))
        }));
    }

    let result = body
        .result
        .ok_or_else(|| GatewayError::EventParse("Empty result from sendTransaction".to_string()))?;

    match result.status.as_str() {
        "PENDING" => Ok(SubmitOutcome::Pending {
            hash: result.hash.unwrap_or_default(),
        }),
        "DUPLICATE" => Ok(SubmitOutcome::Duplicate {
            hash: result.hash.unwrap_or_default(),
        }),
        "TRY_AGAIN_LATER" => Ok(SubmitOutcome::TryAgainLater { hash: result.hash }),
        status => {
            let mut text = result.diagnostic_events.join("\n");
            if let Some(xdr) = &result.error_result_xdr {
                text.push('\n');
                text.push_str(xdr);
            }
            Err(rejected_or(&text, || {
                GatewayError::BadRequest(format!("transaction rejected with status {status}"))
            }))
        }
    }
}

fn rejected_or<F: FnOnce() -> GatewayError>(text: &str, otherwise: F) -> GatewayError {
    match rejection::parse(text) {
        Some(found) => GatewayError::Rejected(found),
        None => otherwise(),
    }
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode a list of raw RPC events into [`CampaignEvent`] structs.
///
/// Events from failed calls and events without an id are dropped.
pub fn decode_events(raw: &[RawEvent]) -> Vec<CampaignEvent> {
    raw.iter().filter_map(decode_single).collect()
}

fn decode_single(raw: &RawEvent) -> Option<CampaignEvent> {
    if raw.in_successful_contract_call == Some(false) {
        return None;
    }
    let event_id = raw.id.clone()?;
    let contract_id = raw.contract_id.clone()?;

    let first_topic = raw.topic.first()?;
    let kind = EventKind::from_topic(&extract_symbol(first_topic));

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);

    // Contributor-scoped events carry the address as the second topic.
    let topic_actor = raw.topic.get(1).map(|t| extract_symbol(t));
    let data = decode_data(&raw.value, &kind);

    Some(CampaignEvent {
        event_id,
        event_type: kind.as_str().to_string(),
        actor: topic_actor.or(data.actor),
        amount: data.amount,
        phase: data.phase,
        deadline: data.deadline,
        ledger,
        timestamp,
        contract_id,
        tx_hash: raw.tx_hash.clone(),
    })
}

#[derive(Default)]
struct EventData {
    actor: Option<String>,
    amount: Option<String>,
    phase: Option<String>,
    deadline: Option<i64>,
}

/// Pull apart the JSON `value` blob that Soroban returns for event data.
fn decode_data(value: &Value, kind: &EventKind) -> EventData {
    match kind {
        EventKind::CampaignOpened => EventData {
            actor: extract_field(value, &["creator"]),
            amount: extract_field(value, &["goal"]),
            deadline: extract_field(value, &["deadline"]).and_then(|d| d.parse().ok()),
            ..EventData::default()
        },
        EventKind::Contributed => EventData {
            actor: extract_field(value, &["contributor"]),
            amount: extract_field(value, &["amount"]),
            ..EventData::default()
        },
        EventKind::PhaseResolved => EventData {
            amount: extract_field(value, &["raised"]),
            phase: value.get("phase").and_then(phase_name),
            ..EventData::default()
        },
        EventKind::TokensClaimed => EventData {
            actor: extract_field(value, &["claimant"]),
            amount: extract_field(value, &["tokens"]),
            ..EventData::default()
        },
        EventKind::Refunded => EventData {
            actor: extract_field(value, &["contributor"]),
            amount: extract_field(value, &["amount"]),
            ..EventData::default()
        },
        EventKind::FundsWithdrawn => EventData {
            actor: extract_field(value, &["creator"]),
            amount: extract_field(value, &["creator_amount"]),
            ..EventData::default()
        },
        EventKind::SurplusWithdrawn | EventKind::DepositReturned => EventData {
            actor: extract_field(value, &["creator"]),
            amount: extract_field(value, &["amount"]),
            ..EventData::default()
        },
        EventKind::DepositSplit => {
            let admin = extract_field(value, &["admin_share"]).and_then(|a| a.parse::<i128>().ok());
            let creator =
                extract_field(value, &["creator_share"]).and_then(|c| c.parse::<i128>().ok());
            EventData {
                amount: admin.zip(creator).map(|(a, c)| (a + c).to_string()),
                ..EventData::default()
            }
        }
        EventKind::Unknown => EventData::default(),
    }
}

/// The contract encodes `Phase` as its discriminant; accept names too.
fn phase_name(v: &Value) -> Option<String> {
    let raw = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => v.get("value").and_then(|x| x.as_u64()).map(|n| n.to_string())?,
    };
    match raw.as_str() {
        "0" | "Funding" | "funding" => Some("funding".to_string()),
        "1" | "Succeeded" | "succeeded" => Some("succeeded".to_string()),
        "2" | "Failed" | "failed" => Some("failed".to_string()),
        _ => None,
    }
}

fn extract_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(key) {
            let s = match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => v.get("value").and_then(|inner| match inner {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            };
            if s.is_some() {
                return s;
            }
        }
    }
    None
}

/// Extract a Soroban Symbol or Address from the XDR-decoded topic string.
/// The RPC may return `{"type":"symbol","value":"contrib"}` or just the raw string.
fn extract_symbol(raw: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        if let Some(s) = v.get("value").and_then(|x| x.as_str()) {
            return s.to_string();
        }
    }
    raw.to_string()
}

/// Parse an ISO-8601 timestamp string into a Unix epoch (seconds).
fn parse_iso_to_unix(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
