//! Database layer: migrations, project listings, indexed events and cursor
//! management.

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::campaign::{NewProject, Project};
use crate::errors::{GatewayError, Result};
use crate::events::{CampaignEvent, EventRecord};

/// Establish a SQLite connection pool and run pending migrations.
///
/// `sqlite::memory:` databases are per connection; use `max_connections = 1`
/// for them.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Read the last-seen ledger from the cursor row.
/// Returns `0` when no cursor has been persisted yet.
pub async fn get_last_ledger(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_ledger FROM indexer_cursor WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

/// Persist the last-seen ledger (and optionally a pagination cursor string).
pub async fn save_cursor(
    pool: &SqlitePool,
    last_ledger: i64,
    last_cursor: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE indexer_cursor SET last_ledger = ?1, last_cursor = ?2 WHERE id = 1")
        .bind(last_ledger)
        .bind(last_cursor)
        .execute(pool)
        .await?;
    Ok(())
}

/// Read back the raw cursor string (used to resume pagination mid-ledger).
pub async fn get_cursor_string(pool: &SqlitePool) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(v,)| v))
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

const PROJECT_COLUMNS: &str = "id, name, creator, category, goal, token_rate, token_pool, \
     reward_token, description, problem, solution, business_model, investment_ask, \
     incentive_pool, contact_email, project_link, contract_id, created_at";

pub async fn insert_project(pool: &SqlitePool, new: &NewProject, created_at: i64) -> Result<Project> {
    let id = sqlx::query(
        r#"
        INSERT INTO projects
            (name, creator, category, goal, token_rate, token_pool, reward_token,
             description, problem, solution, business_model, investment_ask,
             incentive_pool, contact_email, project_link, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&new.name)
    .bind(&new.creator)
    .bind(&new.category)
    .bind(new.goal)
    .bind(new.token_rate)
    .bind(new.token_pool)
    .bind(&new.reward_token)
    .bind(&new.description)
    .bind(&new.problem)
    .bind(&new.solution)
    .bind(&new.business_model)
    .bind(&new.investment_ask)
    .bind(&new.incentive_pool)
    .bind(&new.contact_email)
    .bind(&new.project_link)
    .bind(created_at)
    .execute(pool)
    .await?
    .last_insert_rowid();

    get_project(pool, id).await
}

/// All projects, newest first.
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_project(pool: &SqlitePool, id: i64) -> Result<Project> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| GatewayError::NotFound(format!("project {id}")))
}

/// Link `id` to its deployed campaign contract. A project is deployed once
/// and a contract backs at most one project.
pub async fn attach_contract(pool: &SqlitePool, id: i64, contract_id: &str) -> Result<Project> {
    let project = get_project(pool, id).await?;
    if let Some(existing) = &project.contract_id {
        return Err(GatewayError::BadRequest(format!(
            "project {id} is already deployed at {existing}"
        )));
    }

    let taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM projects WHERE contract_id = ?1")
        .bind(contract_id)
        .fetch_optional(pool)
        .await?;
    if let Some((other,)) = taken {
        return Err(GatewayError::BadRequest(format!(
            "contract {contract_id} already backs project {other}"
        )));
    }

    sqlx::query("UPDATE projects SET contract_id = ?1 WHERE id = ?2")
        .bind(contract_id)
        .bind(id)
        .execute(pool)
        .await?;
    get_project(pool, id).await
}

/// Contract ids the indexer should follow.
pub async fn deployed_contract_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT contract_id FROM projects WHERE contract_id IS NOT NULL ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(c,)| c).collect())
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events. Events whose RPC id was already
/// stored are silently ignored to make the indexer idempotent.
pub async fn insert_events(pool: &SqlitePool, events: &[CampaignEvent]) -> Result<usize> {
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, event_type, actor, amount, phase, deadline, ledger, timestamp,
                 contract_id, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&ev.event_id)
        .bind(&ev.event_type)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.phase)
        .bind(ev.deadline)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.contract_id)
        .bind(&ev.tx_hash)
        .execute(pool)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

const EVENT_COLUMNS: &str = "id, event_id, event_type, actor, amount, phase, deadline, ledger, \
     timestamp, contract_id, tx_hash, created_at";

/// Fetch all events of one campaign contract, ordered by ledger ascending.
pub async fn get_events_for_contract(
    pool: &SqlitePool,
    contract_id: &str,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE contract_id = ?1 ORDER BY ledger ASC, id ASC"
    ))
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, ordered by ledger ascending.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events ORDER BY ledger ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
