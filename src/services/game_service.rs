use tokio::sync::watch;
use tracing::info;

use crate::{
    dto::game::{ActionResponse, GameSnapshot},
    error::ServiceError,
    services::session_worker,
    state::{
        SharedState,
        identity::PlayerIdentity,
        level::{LevelConfig, level_table},
        session::{SessionHandle, SessionId, SessionSnapshot},
        state_machine::{GameEvent, GameMode},
    },
};

/// Open a session for `player` and deal level 1 of `mode`.
pub async fn create_game(
    state: &SharedState,
    player: PlayerIdentity,
    mode: GameMode,
) -> Result<GameSnapshot, ServiceError> {
    let handle = session_worker::spawn(state, player);
    let session_id = handle.id();
    state.sessions().insert(session_id, handle.clone());

    let report = handle.dispatch(GameEvent::Start(mode)).await?;
    info!(%session_id, mode = mode.as_str(), "game session created");
    Ok(GameSnapshot::new(session_id, &report.snapshot))
}

/// Current view of a session.
pub fn get_game(
    state: &SharedState,
    player: &PlayerIdentity,
    session_id: SessionId,
) -> Result<GameSnapshot, ServiceError> {
    let handle = session_for(state, player, session_id)?;
    Ok(GameSnapshot::new(session_id, &handle.snapshot()))
}

/// Forward a player action to a session and report whether it applied.
///
/// Ignored actions are not errors: the response carries the reason and the
/// unchanged game.
pub async fn dispatch(
    state: &SharedState,
    player: &PlayerIdentity,
    session_id: SessionId,
    event: GameEvent,
) -> Result<ActionResponse, ServiceError> {
    let handle = session_for(state, player, session_id)?;
    let report = handle.dispatch(event).await?;

    Ok(ActionResponse {
        applied: report.rejection.is_none(),
        reason: report.rejection.map(|rejection| rejection.to_string()),
        game: GameSnapshot::new(session_id, &report.snapshot),
    })
}

/// Close a session. Its worker stops once in-flight requests finish.
pub fn delete_game(
    state: &SharedState,
    player: &PlayerIdentity,
    session_id: SessionId,
) -> Result<(), ServiceError> {
    session_for(state, player, session_id)?;
    state.sessions().remove(&session_id);
    info!(%session_id, "game session closed");
    Ok(())
}

/// Snapshot feed of a session, for its SSE stream.
pub fn subscribe(
    state: &SharedState,
    player: &PlayerIdentity,
    session_id: SessionId,
) -> Result<watch::Receiver<SessionSnapshot>, ServiceError> {
    session_for(state, player, session_id).map(|handle| handle.subscribe())
}

/// Level table of `mode`.
pub fn levels(mode: GameMode) -> Vec<LevelConfig> {
    level_table(mode)
}

fn session_for(
    state: &SharedState,
    player: &PlayerIdentity,
    session_id: SessionId,
) -> Result<SessionHandle, ServiceError> {
    let handle = state
        .sessions()
        .get(&session_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ServiceError::NotFound(format!("game session `{session_id}`")))?;

    if !player.may_act_on(handle.owner()) {
        return Err(ServiceError::Unauthorized(
            "game session belongs to another player".into(),
        ));
    }
    handle.touch();
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, state_machine::GameStatus},
    };

    #[tokio::test]
    async fn create_deals_level_one() {
        let state = AppState::new(AppConfig::default());
        let game = create_game(&state, PlayerIdentity::Anonymous, GameMode::MoveLimit)
            .await
            .unwrap();

        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.level, 1);
        assert_eq!(game.cards.len(), 12);
        assert_eq!(game.max_moves, Some(17));
        assert_eq!(state.sessions().len(), 1);
    }

    #[tokio::test]
    async fn ignored_actions_carry_a_reason() {
        let state = AppState::new(AppConfig::default());
        let game = create_game(&state, PlayerIdentity::Anonymous, GameMode::Classic)
            .await
            .unwrap();

        let response = dispatch(
            &state,
            &PlayerIdentity::Anonymous,
            game.session_id,
            GameEvent::Flip("missing".into()),
        )
        .await
        .unwrap();

        assert!(!response.applied);
        assert!(response.reason.is_some());
        assert_eq!(response.game.version, game.version);
    }

    #[tokio::test]
    async fn sessions_are_private_to_their_owner() {
        let state = AppState::new(AppConfig::default());
        let owner = PlayerIdentity::Registered("u1".into());
        let game = create_game(&state, owner.clone(), GameMode::Classic)
            .await
            .unwrap();

        let intruder = PlayerIdentity::Registered("u2".into());
        assert!(matches!(
            get_game(&state, &intruder, game.session_id),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(get_game(&state, &owner, game.session_id).is_ok());
    }

    #[tokio::test]
    async fn deleted_sessions_are_gone() {
        let state = AppState::new(AppConfig::default());
        let game = create_game(&state, PlayerIdentity::Anonymous, GameMode::Lives)
            .await
            .unwrap();

        delete_game(&state, &PlayerIdentity::Anonymous, game.session_id).unwrap();

        assert!(matches!(
            get_game(&state, &PlayerIdentity::Anonymous, game.session_id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            delete_game(&state, &PlayerIdentity::Anonymous, game.session_id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn levels_cover_the_table() {
        let table = levels(GameMode::Lives);
        assert_eq!(table.len(), 8);
        assert_eq!(table[7].lives, Some(1));
    }
}
