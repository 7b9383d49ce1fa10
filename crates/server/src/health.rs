use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::sessions::SessionRegistry;

#[derive(Clone)]
pub struct HealthState {
    quote_service: String,
    sessions: SessionRegistry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub quote_service: HealthCheck,
    pub checked_at: String,
}

pub fn router(quote_service: String, sessions: SessionRegistry) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { quote_service, sessions })
}

/// Liveness only: the quote backend is never called from here, so a slow or
/// failing provider does not flap the health endpoint.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let active_sessions = state.sessions.len().await;

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: format!("quotecraft-server running with {active_sessions} active session(s)"),
        },
        quote_service: HealthCheck {
            status: "configured",
            detail: state.quote_service.clone(),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
