use serde::Serialize;

/// Health response returned by the `/health` route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    pub measured_fps: f64,
    pub panel_count: usize,
    pub current_effect: Option<String>,
    pub subscribers: usize,
}

impl HealthResponse {
    /// Health payload for an engine that failed to answer.
    pub fn degraded(subscribers: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            measured_fps: 0.0,
            panel_count: 0,
            current_effect: None,
            subscribers,
        }
    }
}
