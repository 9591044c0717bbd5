use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::UpsertOutcome,
    dto::{
        game::GameSnapshot,
        sse::{ScoreSavedEvent, ServerEvent, SystemStatus},
    },
    state::{
        AppState,
        session::{SessionId, SessionSnapshot},
        state_machine::ScoreSubmission,
    },
};

const EVENT_SYSTEM_STATUS: &str = "system.status";
const EVENT_SCORE_SAVED: &str = "score.saved";
/// Event name of per-session snapshots.
pub const EVENT_GAME_SNAPSHOT: &str = "game.snapshot";
/// Event name of the first message on a public connection.
pub const EVENT_HANDSHAKE: &str = "handshake";

/// Broadcast that the score store became reachable or unreachable.
pub fn broadcast_system_status(state: &AppState, degraded: bool) {
    send_public_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// Broadcast that a registered player's score reached the store.
pub fn broadcast_score_saved(state: &AppState, submission: &ScoreSubmission, outcome: UpsertOutcome) {
    let payload = ScoreSavedEvent {
        mode: submission.mode,
        score: submission.score,
        level: submission.level,
        new_best: outcome.writes(),
    };
    send_public_event(state, EVENT_SCORE_SAVED, &payload);
}

/// Serialise a session snapshot for its per-game stream.
pub fn snapshot_event(session_id: SessionId, snapshot: &SessionSnapshot) -> Option<ServerEvent> {
    let view = GameSnapshot::new(session_id, snapshot);
    match ServerEvent::json(Some(EVENT_GAME_SNAPSHOT.to_string()), &view) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(%session_id, error = %err, "failed to serialize game snapshot");
            None
        }
    }
}

fn send_public_event(state: &AppState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
