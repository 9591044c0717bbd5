use std::{collections::HashMap, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::Error as MongoError,
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::connect_database,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoProfileDocument, MongoScoreDocument, doc_id, improvable_score_filter},
};
use crate::{
    dao::{
        models::{LeaderboardRowEntity, ProfileEntity, ScoreEntity, UpsertOutcome},
        score_store::ScoreStore,
        storage::StorageResult,
    },
    state::state_machine::GameMode,
};

const SCORE_COLLECTION_NAME: &str = "scores";
const PROFILE_COLLECTION_NAME: &str = "profiles";
/// Conditional write attempts before a duplicate key is read as "kept".
const UPSERT_ATTEMPTS: usize = 2;

/// Score store persisting to one `scores` and one `profiles` collection.
#[derive(Clone)]
pub struct MongoScoreStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = connect_database(&self.config).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoScoreStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = connect_database(&config).await?;

        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let scores = self.score_collection().await;
        let rank_index = IndexModel::builder()
            .keys(doc! {"mode": 1, "score": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("score_mode_rank_idx".to_owned()))
                    .build(),
            )
            .build();

        scores
            .create_index(rank_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION_NAME,
                index: "mode,score",
                source,
            })?;

        let profiles = self.profile_collection().await;
        let username_index = IndexModel::builder()
            .keys(doc! {"username": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("profile_username_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        profiles
            .create_index(username_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PROFILE_COLLECTION_NAME,
                index: "username",
                source,
            })?;

        Ok(())
    }

    async fn score_collection(&self) -> Collection<MongoScoreDocument> {
        let database = self.inner.database.read().await;
        database.collection::<MongoScoreDocument>(SCORE_COLLECTION_NAME)
    }

    async fn profile_collection(&self) -> Collection<MongoProfileDocument> {
        let database = self.inner.database.read().await;
        database.collection::<MongoProfileDocument>(PROFILE_COLLECTION_NAME)
    }

    /// Replace the stored best only when `score` beats it, in one server-side
    /// write. A duplicate key means a document with a score at least as high
    /// already exists, or a concurrent first insert won; the write is retried
    /// once so the latter case still compares against the winner.
    async fn upsert_best_score(&self, score: ScoreEntity) -> MongoResult<UpsertOutcome> {
        let document = MongoScoreDocument::from(score);
        let collection = self.score_collection().await;
        let save_error = |source: MongoError| MongoDaoError::SaveScore {
            id: document.id.clone(),
            source,
        };

        for _ in 0..UPSERT_ATTEMPTS {
            let result = collection
                .find_one_and_replace(
                    improvable_score_filter(&document.id, document.score),
                    &document,
                )
                .upsert(true)
                .return_document(ReturnDocument::Before)
                .await;

            match result {
                Ok(previous) => return Ok(replaced_outcome(previous.as_ref())),
                Err(err) if is_duplicate_key(&err) => continue,
                Err(err) => return Err(save_error(err)),
            }
        }

        let stored = collection
            .find_one(doc_id(&document.id))
            .await
            .map_err(|source| MongoDaoError::LoadScore {
                id: document.id.clone(),
                source,
            })?;
        Ok(UpsertOutcome::Kept {
            best: stored.map_or(document.score, |doc| doc.score),
        })
    }

    async fn top_scores(&self, mode: GameMode, limit: usize) -> MongoResult<Vec<LeaderboardRowEntity>> {
        let list_error = |source: MongoError| MongoDaoError::ListScores {
            mode: mode.as_str(),
            source,
        };

        let documents: Vec<MongoScoreDocument> = self
            .score_collection()
            .await
            .find(doc! { "mode": mode.as_str() })
            .sort(doc! { "score": -1, "played_at": 1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;

        let user_ids: Vec<String> = documents.iter().map(|doc| doc.user_id.clone()).collect();
        let profiles: Vec<MongoProfileDocument> = self
            .profile_collection()
            .await
            .find(doc! { "_id": { "$in": user_ids } })
            .await
            .map_err(|source| MongoDaoError::LoadProfiles { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadProfiles { source })?;

        let mut usernames: HashMap<String, String> = profiles
            .into_iter()
            .map(|profile| (profile.id, profile.username))
            .collect();

        Ok(documents
            .into_iter()
            .map(|doc| LeaderboardRowEntity {
                username: usernames.remove(&doc.user_id),
                user_id: doc.user_id,
                score: doc.score,
                level: doc.level,
                played_at: doc.played_at.to_system_time(),
            })
            .collect())
    }

    async fn save_profile(&self, profile: ProfileEntity) -> MongoResult<ProfileEntity> {
        let document = MongoProfileDocument::from(profile.clone());
        self.profile_collection()
            .await
            .replace_one(doc_id(&document.id), &document)
            .upsert(true)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::UsernameTaken {
                        username: document.username.clone(),
                    }
                } else {
                    MongoDaoError::SaveProfile {
                        user_id: document.id.clone(),
                        source,
                    }
                }
            })?;

        Ok(profile)
    }

    async fn find_profile(&self, user_id: String) -> MongoResult<Option<ProfileEntity>> {
        let document = self
            .profile_collection()
            .await
            .find_one(doc_id(&user_id))
            .await
            .map_err(|source| MongoDaoError::LoadProfiles { source })?;

        Ok(document.map(Into::into))
    }
}

impl ScoreStore for MongoScoreStore {
    fn upsert_best_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<UpsertOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_best_score(score).await.map_err(Into::into) })
    }

    fn top_scores(
        &self,
        mode: GameMode,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.top_scores(mode, limit).await.map_err(Into::into) })
    }

    fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<ProfileEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_profile(profile).await.map_err(Into::into) })
    }

    fn find_profile(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<ProfileEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_profile(user_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

/// Outcome of a conditional replace given the document it matched, if any.
/// An unmatched upsert inserted the first document for this player and mode.
fn replaced_outcome(previous: Option<&MongoScoreDocument>) -> UpsertOutcome {
    match previous {
        Some(previous) => UpsertOutcome::Improved {
            previous: previous.score,
        },
        None => UpsertOutcome::Inserted,
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn stored(score: u32) -> MongoScoreDocument {
        MongoScoreDocument::from(ScoreEntity {
            user_id: "u1".into(),
            mode: GameMode::Classic,
            score,
            level: 2,
            played_at: SystemTime::UNIX_EPOCH,
        })
    }

    #[test]
    fn matched_document_means_improved() {
        assert_eq!(
            replaced_outcome(Some(&stored(100))),
            UpsertOutcome::Improved { previous: 100 }
        );
        assert_eq!(replaced_outcome(None), UpsertOutcome::Inserted);
    }
}
