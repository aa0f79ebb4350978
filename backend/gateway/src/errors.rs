//! Application-wide error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::rejection::Rejection;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event parse error: {0}")]
    EventParse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Project {0} has no deployed campaign contract")]
    NotDeployed(i64),

    #[error("Rejected by campaign contract: {} (code {})", .0.name, .0.code)]
    Rejected(Rejection),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotDeployed(_) => StatusCode::CONFLICT,
            Self::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        let body = match &self {
            Self::Rejected(rejection) => json!({
                "error": self.to_string(),
                "rejection": rejection,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rejection;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            GatewayError::NotFound("project 7".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::BadRequest("amount".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GatewayError::NotDeployed(3).status(), StatusCode::CONFLICT);

        let rejected = rejection::parse("HostError: Error(Contract, #7)").unwrap();
        assert_eq!(
            GatewayError::Rejected(rejected).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn infrastructure_errors_map_to_500() {
        assert_eq!(
            GatewayError::Config("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::EventParse("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
