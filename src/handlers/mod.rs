use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;

use crate::state::AppState;
use crate::utils::response::{error, success};

pub mod auth;
pub mod comments;
pub mod tickets;
pub mod uploads;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    db: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    if !state.health.check_db().await {
        tracing::error!("Health check failed: database unreachable");
        return error(
            "DATABASE_UNAVAILABLE",
            "Database connection failed",
            None,
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    let payload = HealthPayload {
        status: "ok",
        service: "helpdesk-api",
        db: "connected",
    };

    success(payload, "Health check successful")
}
