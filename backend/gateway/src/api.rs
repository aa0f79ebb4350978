//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bundle::{self, check_contract, Bundle};
use crate::campaign::{self, CampaignSummary, NewProject, Phase, Project};
use crate::config::Config;
use crate::db;
use crate::errors::{GatewayError, Result};
use crate::events::EventRecord;
use crate::rpc::{self, SubmitOutcome};

pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:id", get(get_project))
        .route("/projects/:id/contract", post(attach_contract))
        .route("/projects/:id/summary", get(get_summary))
        .route("/projects/:id/events", get(get_project_events))
        .route("/projects/:id/build_init", post(build_init))
        .route("/projects/:id/build_contribution", post(build_contribution))
        .route("/projects/:id/build_claim_tokens", post(build_claim_tokens))
        .route("/projects/:id/build_refund", post(build_refund))
        .route("/events", get(get_all_events))
        .route("/submit", post(submit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ProjectsResponse {
    pub count: usize,
    pub projects: Vec<Project>,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub project_id: i64,
    pub contract_id: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Deserialize)]
pub struct AttachContractRequest {
    pub contract_id: String,
}

#[derive(Deserialize)]
pub struct ContributionRequest {
    pub from_address: String,
    pub amount: i64,
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub signed_envelope: String,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /projects`
pub async fn list_projects(State(state): State<Arc<ApiState>>) -> Result<Json<ProjectsResponse>> {
    let projects = db::list_projects(&state.pool).await?;
    Ok(Json(ProjectsResponse {
        count: projects.len(),
        projects,
    }))
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    Json(new): Json<NewProject>,
) -> Result<Json<Project>> {
    new.validate(&state.config.currency_contract)?;
    let project = db::insert_project(&state.pool, &new, chrono::Utc::now().timestamp()).await?;
    info!("Listed project {} ({})", project.id, project.name);
    Ok(Json(project))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<Project>> {
    Ok(Json(db::get_project(&state.pool, id).await?))
}

/// `POST /projects/:id/contract`
///
/// Records where the project's campaign contract was deployed. The indexer
/// starts following it on its next poll.
pub async fn attach_contract(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(req): Json<AttachContractRequest>,
) -> Result<Json<Project>> {
    check_contract(&req.contract_id)?;
    let project = db::attach_contract(&state.pool, id, &req.contract_id).await?;
    info!("Project {id} deployed at {}", req.contract_id);
    Ok(Json(project))
}

/// `GET /projects/:id/summary`
pub async fn get_summary(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignSummary>> {
    let project = db::get_project(&state.pool, id).await?;
    Ok(Json(summary_of(&state.pool, &project).await?))
}

/// `GET /projects/:id/events`
///
/// Returns all indexed events of the project's campaign contract.
pub async fn get_project_events(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<EventsResponse>> {
    let project = db::get_project(&state.pool, id).await?;
    let contract_id = project.deployed()?.to_string();
    let events = db::get_events_for_contract(&state.pool, &contract_id).await?;
    Ok(Json(EventsResponse {
        project_id: id,
        contract_id,
        count: events.len(),
        events,
    }))
}

/// `GET /events`
///
/// Returns all indexed events across all campaigns.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> Result<Json<AllEventsResponse>> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}

/// `POST /projects/:id/build_init`
pub async fn build_init(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
) -> Result<Json<Bundle>> {
    let project = db::get_project(&state.pool, id).await?;
    let contract = project.deployed()?;
    let bundle = bundle::build_init(
        &state.config.network_passphrase,
        contract,
        &project,
        &state.config.admin_address,
        &state.config.currency_contract,
    )?;
    Ok(Json(bundle))
}

/// `POST /projects/:id/build_contribution`
pub async fn build_contribution(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(req): Json<ContributionRequest>,
) -> Result<Json<Bundle>> {
    let (project, summary) = deployed_campaign(&state.pool, id).await?;
    campaign::ensure_phase(&summary, Phase::Funding, "contribute")?;
    campaign::ensure_reward_capacity(&project, &summary, req.amount)?;
    let bundle = bundle::build_contribution(
        &state.config.network_passphrase,
        project.deployed()?,
        &state.config.currency_contract,
        &req.from_address,
        req.amount,
    )?;
    Ok(Json(bundle))
}

/// `POST /projects/:id/build_claim_tokens`
pub async fn build_claim_tokens(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<Bundle>> {
    let (project, summary) = deployed_campaign(&state.pool, id).await?;
    campaign::ensure_phase(&summary, Phase::Succeeded, "claim tokens")?;
    let bundle = bundle::build_claim_tokens(
        &state.config.network_passphrase,
        project.deployed()?,
        &req.address,
    )?;
    Ok(Json(bundle))
}

/// `POST /projects/:id/build_refund`
pub async fn build_refund(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<Bundle>> {
    let (project, summary) = deployed_campaign(&state.pool, id).await?;
    campaign::ensure_phase(&summary, Phase::Failed, "refund")?;
    let bundle = bundle::build_refund(
        &state.config.network_passphrase,
        project.deployed()?,
        &req.address,
    )?;
    Ok(Json(bundle))
}

/// `POST /submit`
///
/// Relays a signed envelope. The gateway never retries a submission.
pub async fn submit(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitOutcome>> {
    let envelope = req.signed_envelope.trim();
    if envelope.is_empty() || STANDARD.decode(envelope).is_err() {
        return Err(GatewayError::BadRequest(
            "signed_envelope must be base64 XDR".into(),
        ));
    }
    let outcome = rpc::send_transaction(&state.client, &state.config.rpc_url, envelope).await?;
    info!("Submitted envelope: {outcome:?}");
    Ok(Json(outcome))
}

// ─────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────

async fn summary_of(pool: &SqlitePool, project: &Project) -> Result<CampaignSummary> {
    let events = match &project.contract_id {
        Some(contract_id) => db::get_events_for_contract(pool, contract_id).await?,
        None => Vec::new(),
    };
    Ok(campaign::summarize(
        project,
        &events,
        chrono::Utc::now().timestamp(),
    ))
}

async fn deployed_campaign(pool: &SqlitePool, id: i64) -> Result<(Project, CampaignSummary)> {
    let project = db::get_project(pool, id).await?;
    project.deployed()?;
    let summary = summary_of(pool, &project).await?;
    Ok((project, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::campaign::tests::{CREATOR, CURRENCY, REWARD};
    use crate::events::CampaignEvent;

    const CAMPAIGN: &str = "CAS3J7GYLGXMF6TDJBBYYSE3HQ6BBSMLNUQ34T6TZMYMW2EVH34XOWMA";

    async fn state() -> Arc<ApiState> {
        let config = Config::from_lookup(|key| match key {
            "ADMIN_ADDRESS" => Some(CREATOR.to_string()),
            "CURRENCY_CONTRACT" => Some(CURRENCY.to_string()),
            _ => None,
        })
        .unwrap();
        Arc::new(ApiState {
            pool: db::init_pool("sqlite::memory:", 1).await.unwrap(),
            config,
            client: Client::new(),
        })
    }

    async fn call(state: &Arc<ApiState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(b) => request.body(Body::from(b.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn listing() -> Value {
        json!({
            "name": "Solar kiosks",
            "creator": CREATOR,
            "goal": 1000,
            "token_rate": 10,
            "token_pool": 20000,
            "reward_token": REWARD,
            "description": "Pay-as-you-go solar charging",
        })
    }

    async fn deployed_project(state: &Arc<ApiState>) -> i64 {
        let (_, project) = call(state, "POST", "/projects", Some(listing())).await;
        let id = project["id"].as_i64().unwrap();
        let (status, _) = call(
            state,
            "POST",
            &format!("/projects/{id}/contract"),
            Some(json!({ "contract_id": CAMPAIGN })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let state = state().await;
        let (status, body) = call(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn create_and_list_projects() {
        let state = state().await;
        let (status, project) = call(&state, "POST", "/projects", Some(listing())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(project["name"], "Solar kiosks");
        assert_eq!(project["contract_id"], Value::Null);

        let (_, list) = call(&state, "GET", "/projects", None).await;
        assert_eq!(list["count"], 1);

        let id = project["id"].as_i64().unwrap();
        let (status, fetched) = call(&state, "GET", &format!("/projects/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["description"], "Pay-as-you-go solar charging");
    }

    #[tokio::test]
    async fn invalid_listing_is_a_bad_request() {
        let state = state().await;
        let mut body = listing();
        body["goal"] = json!(0);
        let (status, error) = call(&state, "POST", "/projects", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("goal"));
    }

    #[tokio::test]
    async fn listing_paid_in_the_campaign_currency_is_a_bad_request() {
        let state = state().await;
        let mut body = listing();
        body["reward_token"] = json!(CURRENCY);
        let (status, error) = call(&state, "POST", "/projects", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("reward_token"));
    }

    #[tokio::test]
    async fn contribution_beyond_reward_pool_is_a_bad_request() {
        let state = state().await;
        let id = deployed_project(&state).await;
        let (status, error) = call(
            &state,
            "POST",
            &format!("/projects/{id}/build_contribution"),
            Some(json!({ "from_address": CREATOR, "amount": 2_001 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("reward pool"));
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let state = state().await;
        let (status, _) = call(&state, "GET", "/projects/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, "GET", "/projects/99/summary", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bundles_need_a_deployed_contract() {
        let state = state().await;
        let (_, project) = call(&state, "POST", "/projects", Some(listing())).await;
        let id = project["id"].as_i64().unwrap();

        let (status, _) = call(
            &state,
            "POST",
            &format!("/projects/{id}/build_contribution"),
            Some(json!({ "from_address": CREATOR, "amount": 60 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&state, "POST", &format!("/projects/{id}/build_init"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn init_bundle_is_one_call_leg() {
        let state = state().await;
        let id = deployed_project(&state).await;
        let (status, bundle) = call(&state, "POST", &format!("/projects/{id}/build_init"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bundle["legs"].as_array().unwrap().len(), 1);
        assert_eq!(bundle["legs"][0]["kind"], "call");
    }

    #[tokio::test]
    async fn contribution_bundle_while_funding() {
        let state = state().await;
        let id = deployed_project(&state).await;

        let (status, bundle) = call(
            &state,
            "POST",
            &format!("/projects/{id}/build_contribution"),
            Some(json!({ "from_address": CREATOR, "amount": 60 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let legs = bundle["legs"].as_array().unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0]["kind"], "payment");
        assert_eq!(legs[1]["kind"], "call");
        assert_eq!(bundle["group_id"].as_str().unwrap().len(), 64);

        // Claims and refunds make no sense before the deadline.
        let (status, error) = call(
            &state,
            "POST",
            &format!("/projects/{id}/build_refund"),
            Some(json!({ "address": CREATOR })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("still funding"));
    }

    #[tokio::test]
    async fn summary_and_events_follow_the_indexer() {
        let state = state().await;
        let id = deployed_project(&state).await;

        let event = |event_id: &str, event_type: &str, amount: &str, deadline: Option<i64>| CampaignEvent {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            actor: Some(CREATOR.to_string()),
            amount: Some(amount.to_string()),
            phase: None,
            deadline,
            ledger: 1,
            timestamp: 0,
            contract_id: CAMPAIGN.to_string(),
            tx_hash: None,
        };
        db::insert_events(
            &state.pool,
            &[
                event("e1", "campaign_opened", "1000", Some(1)),
                event("e2", "contributed", "200", None),
            ],
        )
        .await
        .unwrap();

        let (status, summary) = call(&state, "GET", &format!("/projects/{id}/summary"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["raised"], "200");
        assert_eq!(summary["contributors"], 1);
        // Deadline at t=1 is long gone and the goal was missed.
        assert_eq!(summary["phase"], "failed");

        let (status, error) = call(
            &state,
            "POST",
            &format!("/projects/{id}/build_contribution"),
            Some(json!({ "from_address": CREATOR, "amount": 60 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("deadline has passed"));

        let (status, _) = call(
            &state,
            "POST",
            &format!("/projects/{id}/build_refund"),
            Some(json!({ "address": CREATOR })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, events) = call(&state, "GET", &format!("/projects/{id}/events"), None).await;
        assert_eq!(events["count"], 2);
        let (_, all) = call(&state, "GET", "/events", None).await;
        assert_eq!(all["count"], 2);
    }

    #[tokio::test]
    async fn submit_rejects_non_base64_envelopes() {
        let state = state().await;
        let (status, _) = call(
            &state,
            "POST",
            "/submit",
            Some(json!({ "signed_envelope": "not base64!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
