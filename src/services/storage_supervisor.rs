use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{score_store::ScoreStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the score store and keep the shared state in degraded mode while
/// it is unreachable. Gameplay never waits on this loop.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ScoreStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_score_store(store.clone()).await;
                info!("score store connected; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;

                state.clear_score_store().await;
                warn!("exhausted score store reconnect attempts; reconnecting from scratch");
            }
            Err(err) => warn!(error = %err, "score store connection attempt failed"),
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll the store until it stays unreachable through every reconnect attempt.
async fn watch_health(state: &SharedState, store: &dyn ScoreStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("score store healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
            }
            Err(err) => {
                warn!(error = %err, "score store health check failed; entering degraded mode");
                state.update_degraded(true);
                if !reconnect(store).await {
                    return;
                }
                info!("score store reconnected after health check failure");
                state.update_degraded(false);
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(store: &dyn ScoreStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "score store reconnect attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicU32, Ordering},
    };

    use futures::future::{self, BoxFuture};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{LeaderboardRowEntity, ProfileEntity, ScoreEntity, UpsertOutcome},
            score_store::MemoryScoreStore,
            storage::StorageResult,
        },
        state::{AppState, state_machine::GameMode},
    };

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_store_connects() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let mut degraded = state.degraded_watcher();

        tokio::spawn(run(state.clone(), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(StorageError::unavailable("not yet".into(), io::Error::other("refused")))
                } else {
                    Ok(Arc::new(MemoryScoreStore::new()) as Arc<dyn ScoreStore>)
                }
            }
        }));

        degraded.wait_for(|value| !*value).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(state.score_store().await.is_some());
    }

    /// Healthy until the first poll, then unreachable for good.
    struct FlakyStore {
        checks: AtomicU32,
    }

    impl ScoreStore for FlakyStore {
        fn upsert_best_score(&self, _: ScoreEntity) -> BoxFuture<'static, StorageResult<UpsertOutcome>> {
            Box::pin(future::ready(StorageResult::Ok(UpsertOutcome::Inserted)))
        }

        fn top_scores(
            &self,
            _: GameMode,
            _: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
            Box::pin(future::ready(StorageResult::Ok(Vec::new())))
        }

        fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<ProfileEntity>> {
            Box::pin(future::ready(StorageResult::Ok(profile)))
        }

        fn find_profile(&self, _: String) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
            Box::pin(future::ready(StorageResult::Ok(None)))
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let result: StorageResult<()> = if self.checks.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(())
            } else {
                Err(StorageError::unavailable("ping failed".into(), io::Error::other("connection reset")))
            };
            Box::pin(future::ready(result))
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(future::ready(StorageResult::Err(StorageError::unavailable(
                "reconnect failed".into(),
                io::Error::other("connection refused"),
            ))))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_health_checks_enter_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let mut degraded = state.degraded_watcher();

        tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(FlakyStore {
                checks: AtomicU32::new(0),
            }) as Arc<dyn ScoreStore>)
        }));

        degraded.wait_for(|value| !*value).await.unwrap();
        degraded.wait_for(|value| *value).await.unwrap();
        assert!(state.is_degraded());
    }
}
