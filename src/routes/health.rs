use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::health::HealthResponse, services::status_service, state::SharedState};

/// Return the current health of the engine and protocol layer.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(status_service::health_status(&state).await)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/health", get(health))
}
