use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report degraded mode and the live session count, logging store connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.score_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "score store health check failed");
            }
        }
        None => warn!("score store unavailable (degraded mode)"),
    }

    let sessions = state.sessions().len();
    if state.is_degraded() {
        HealthResponse::degraded(sessions)
    } else {
        HealthResponse::ok(sessions)
    }
}
