//! Process-local store used in tests and when no database is configured.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::{
    dao::{
        models::{LeaderboardRowEntity, ProfileEntity, ScoreEntity, UpsertOutcome},
        score_store::ScoreStore,
        storage::{StorageError, StorageResult},
    },
    state::state_machine::GameMode,
};

/// Score store kept in process memory; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryScoreStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    scores: DashMap<(String, GameMode), ScoreEntity>,
    profiles: DashMap<String, ProfileEntity>,
    /// username -> owning user id
    usernames: DashMap<String, String>,
}

impl MemoryScoreStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn record_score(&self, score: ScoreEntity) -> UpsertOutcome {
        match self.inner.scores.entry((score.user_id.clone(), score.mode)) {
            Entry::Occupied(mut existing) => {
                let outcome = UpsertOutcome::decide(Some(existing.get().score), score.score);
                if outcome.writes() {
                    existing.insert(score);
                }
                outcome
            }
            Entry::Vacant(slot) => {
                slot.insert(score);
                UpsertOutcome::Inserted
            }
        }
    }

    fn ranked(&self, mode: GameMode, limit: usize) -> Vec<LeaderboardRowEntity> {
        let mut rows: Vec<LeaderboardRowEntity> = self
            .inner
            .scores
            .iter()
            .filter(|entry| entry.mode == mode)
            .map(|entry| LeaderboardRowEntity {
                user_id: entry.user_id.clone(),
                username: self
                    .inner
                    .profiles
                    .get(&entry.user_id)
                    .map(|profile| profile.username.clone()),
                score: entry.score,
                level: entry.level,
                played_at: entry.played_at,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.played_at.cmp(&b.played_at))
        });
        rows.truncate(limit);
        rows
    }

    fn store_profile(&self, profile: ProfileEntity) -> StorageResult<ProfileEntity> {
        match self.inner.usernames.entry(profile.username.clone()) {
            Entry::Occupied(owner) if owner.get() != &profile.user_id => {
                return Err(StorageError::conflict(format!(
                    "username `{}` is already taken",
                    profile.username
                )));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(profile.user_id.clone());
            }
        }

        let previous = self
            .inner
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        if let Some(previous) = previous.filter(|previous| previous.username != profile.username) {
            self.inner
                .usernames
                .remove_if(&previous.username, |_, owner| owner == &profile.user_id);
        }

        Ok(profile)
    }
}

impl ScoreStore for MemoryScoreStore {
    fn upsert_best_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<UpsertOutcome>> {
        let outcome = self.record_score(score);
        Box::pin(async move { Ok(outcome) })
    }

    fn top_scores(
        &self,
        mode: GameMode,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let rows = self.ranked(mode, limit);
        Box::pin(async move { Ok(rows) })
    }

    fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<ProfileEntity>> {
        let result = self.store_profile(profile);
        Box::pin(async move { result })
    }

    fn find_profile(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let profile = self.inner.profiles.get(&user_id).map(|entry| entry.clone());
        Box::pin(async move { Ok(profile) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn score(user_id: &str, mode: GameMode, score: u32, level: u8) -> ScoreEntity {
        ScoreEntity {
            user_id: user_id.into(),
            mode,
            score,
            level,
            played_at: SystemTime::UNIX_EPOCH + Duration::from_secs(u64::from(score)),
        }
    }

    fn profile(user_id: &str, username: &str) -> ProfileEntity {
        ProfileEntity {
            user_id: user_id.into(),
            username: username.into(),
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn keeps_best_score_per_mode() {
        let store = MemoryScoreStore::new();
        let first = store
            .upsert_best_score(score("u1", GameMode::Classic, 600, 1))
            .await
            .unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);

        let lower = store
            .upsert_best_score(score("u1", GameMode::Classic, 200, 3))
            .await
            .unwrap();
        assert_eq!(lower, UpsertOutcome::Kept { best: 600 });

        let higher = store
            .upsert_best_score(score("u1", GameMode::Classic, 2_200, 2))
            .await
            .unwrap();
        assert_eq!(higher, UpsertOutcome::Improved { previous: 600 });

        let other_mode = store
            .upsert_best_score(score("u1", GameMode::Lives, 100, 1))
            .await
            .unwrap();
        assert_eq!(other_mode, UpsertOutcome::Inserted);

        let rows = store.top_scores(GameMode::Classic, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].score, rows[0].level), (2_200, 2));
    }

    #[tokio::test]
    async fn top_scores_are_ordered_limited_and_joined() {
        let store = MemoryScoreStore::new();
        for (user, points) in [("a", 300), ("b", 900), ("c", 600), ("d", 100)] {
            store
                .upsert_best_score(score(user, GameMode::MoveLimit, points, 1))
                .await
                .unwrap();
        }
        store.save_profile(profile("b", "Bee")).await.unwrap();

        let rows = store.top_scores(GameMode::MoveLimit, 3).await.unwrap();
        let users: Vec<&str> = rows.iter().map(|row| row.user_id.as_str()).collect();
        assert_eq!(users, vec!["b", "c", "a"]);
        assert_eq!(rows[0].username.as_deref(), Some("Bee"));
        assert_eq!(rows[1].username, None);
    }

    #[tokio::test]
    async fn usernames_are_unique_across_users() {
        let store = MemoryScoreStore::new();
        store.save_profile(profile("u1", "Neo")).await.unwrap();

        let err = store.save_profile(profile("u2", "Neo"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));

        // Same owner may save again, and renaming frees the old name.
        store.save_profile(profile("u1", "Neo")).await.unwrap();
        store.save_profile(profile("u1", "Trinity")).await.unwrap();
        store.save_profile(profile("u2", "Neo")).await.unwrap();

        let found = store.find_profile("u1".into()).await.unwrap().unwrap();
        assert_eq!(found.username, "Trinity");
    }
}
