use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Build the health payload from a live engine status probe.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.engine().status().await {
        Ok(status) => HealthResponse {
            status: "ok".to_string(),
            measured_fps: status.measured_fps,
            panel_count: status.panel_count,
            current_effect: status.current_effect,
            subscribers: state.subscriber_count(),
        },
        Err(err) => {
            warn!(error = %err, "engine did not answer status probe");
            HealthResponse::degraded(state.subscriber_count())
        }
    }
}
