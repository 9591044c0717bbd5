use std::time::SystemTime;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    dao::models::{ScoreEntity, UpsertOutcome},
    error::ServiceError,
    services::sse_events,
    state::{AppState, SharedState, identity::PlayerIdentity, state_machine::ScoreSubmission},
};

/// Store a finished run as the player's best score for its mode.
///
/// Guests and anonymous players are skipped and yield `Ok(None)`.
pub async fn persist_score(
    state: &AppState,
    player: &PlayerIdentity,
    submission: ScoreSubmission,
) -> Result<Option<UpsertOutcome>, ServiceError> {
    let Some(user_id) = player.persistence_key() else {
        debug!(
            score = submission.score,
            mode = submission.mode.as_str(),
            "score kept local for guest player"
        );
        return Ok(None);
    };

    let store = state.require_score_store().await?;
    let entity = ScoreEntity {
        user_id: user_id.to_owned(),
        mode: submission.mode,
        score: submission.score,
        level: submission.level,
        played_at: SystemTime::now(),
    };

    let outcome = timeout(state.config().persist_timeout, store.upsert_best_score(entity))
        .await
        .map_err(|_| ServiceError::Timeout)??;

    info!(
        user_id,
        score = submission.score,
        level = submission.level,
        mode = submission.mode.as_str(),
        ?outcome,
        "score persisted"
    );
    sse_events::broadcast_score_saved(state, &submission, outcome);
    Ok(Some(outcome))
}

/// Persist in the background; failures are logged and never reach gameplay.
pub fn spawn_persist(state: SharedState, player: PlayerIdentity, submission: ScoreSubmission) {
    tokio::spawn(async move {
        if let Err(err) = persist_score(&state, &player, submission).await {
            warn!(
                error = %err,
                score = submission.score,
                mode = submission.mode.as_str(),
                "failed to persist score"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::future::{self, BoxFuture};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{LeaderboardRowEntity, ProfileEntity},
            score_store::{MemoryScoreStore, ScoreStore},
            storage::StorageResult,
        },
        state::state_machine::GameMode,
    };

    fn submission(score: u32) -> ScoreSubmission {
        ScoreSubmission {
            score,
            mode: GameMode::Classic,
            level: 3,
        }
    }

    async fn ready_state() -> (SharedState, MemoryScoreStore) {
        let state = AppState::new(AppConfig::default());
        let store = MemoryScoreStore::new();
        state.install_score_store(Arc::new(store.clone())).await;
        (state, store)
    }

    #[tokio::test]
    async fn registered_scores_keep_the_best() {
        let (state, store) = ready_state().await;
        let player = PlayerIdentity::Registered("u1".into());

        let first = persist_score(&state, &player, submission(600)).await.unwrap();
        let lower = persist_score(&state, &player, submission(200)).await.unwrap();

        assert_eq!(first, Some(UpsertOutcome::Inserted));
        assert_eq!(lower, Some(UpsertOutcome::Kept { best: 600 }));
        let rows = store.top_scores(GameMode::Classic, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 600);
    }

    #[tokio::test]
    async fn guests_are_not_persisted() {
        let (state, store) = ready_state().await;
        let player = PlayerIdentity::Guest("guest-1".into());

        let outcome = persist_score(&state, &player, submission(600)).await.unwrap();

        assert_eq!(outcome, None);
        assert!(store.top_scores(GameMode::Classic, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn degraded_mode_rejects_persistence() {
        let state = AppState::new(AppConfig::default());
        let player = PlayerIdentity::Registered("u1".into());
        assert!(matches!(
            persist_score(&state, &player, submission(100)).await,
            Err(ServiceError::Degraded)
        ));
    }

    struct StalledStore;

    fn stalled<T: Send + 'static>() -> BoxFuture<'static, StorageResult<T>> {
        Box::pin(future::pending::<StorageResult<T>>())
    }

    impl ScoreStore for StalledStore {
        fn upsert_best_score(&self, _: ScoreEntity) -> BoxFuture<'static, StorageResult<UpsertOutcome>> {
            stalled()
        }

        fn top_scores(
            &self,
            _: GameMode,
            _: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
            stalled()
        }

        fn save_profile(&self, _: ProfileEntity) -> BoxFuture<'static, StorageResult<ProfileEntity>> {
            stalled()
        }

        fn find_profile(&self, _: String) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
            stalled()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(StorageResult::Ok(())))
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(StorageResult::Ok(())))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let state = AppState::new(AppConfig::default());
        state.install_score_store(Arc::new(StalledStore)).await;
        let player = PlayerIdentity::Registered("u1".into());

        let started = tokio::time::Instant::now();
        let result = persist_score(&state, &player, submission(100)).await;

        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
