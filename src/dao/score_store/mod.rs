/// Process-local backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// PostgREST backend.
#[cfg(feature = "rest-store")]
pub mod rest;

use futures::future::BoxFuture;

use crate::dao::{
    models::{LeaderboardRowEntity, ProfileEntity, ScoreEntity, UpsertOutcome},
    storage::StorageResult,
};
use crate::state::state_machine::GameMode;

pub use memory::MemoryScoreStore;

/// Abstraction over the persistence layer for best scores and player profiles.
pub trait ScoreStore: Send + Sync {
    /// Keep the best score per (user, mode); level and timestamp follow the score
    /// only when it improves.
    fn upsert_best_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<UpsertOutcome>>;
    /// Best scores of `mode` in descending order, one row per user, at most `limit` rows.
    fn top_scores(
        &self,
        mode: GameMode,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>>;
    /// Create or replace the profile of `profile.user_id`.
    ///
    /// Fails with [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
    /// when another user already holds the username.
    fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<ProfileEntity>>;
    /// Profile of `user_id`, if one was saved.
    fn find_profile(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
