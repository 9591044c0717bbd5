use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of live game sessions.
    pub sessions: usize,
}

impl HealthResponse {
    /// The score store is reachable.
    pub fn ok(sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            sessions,
        }
    }

    /// Gameplay works but scores, profiles and the leaderboard are unavailable.
    pub fn degraded(sessions: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            sessions,
        }
    }
}
