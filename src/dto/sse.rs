use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::GameMode;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `game`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether scores, profiles and the leaderboard are currently unavailable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after a registered player's score reached the store.
pub struct ScoreSavedEvent {
    pub mode: GameMode,
    pub score: u32,
    pub level: u8,
    /// The score became the player's best for the mode.
    pub new_best: bool,
}
