use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::{
    config::RestConfig,
    error::{RestDaoError, RestResult},
    models::{
        PROFILES_TABLE, RestLeaderboardRow, RestProfileRow, RestScoreInsert, RestScoreRow,
        RestScoreUpdate, RowId, SCORES_TABLE, format_timestamp, mode_column,
    },
};
use crate::{
    dao::{
        models::{LeaderboardRowEntity, ProfileEntity, ScoreEntity, UpsertOutcome},
        score_store::ScoreStore,
        storage::StorageResult,
    },
    state::state_machine::GameMode,
};

/// Rows scanned per leaderboard read, leaving room for duplicate rows per player.
const LEADERBOARD_SCAN_LIMIT: usize = 1_000;

/// Score store talking to `scores` and `profiles` tables over HTTP.
#[derive(Clone)]
pub struct RestScoreStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
}

impl RestScoreStore {
    /// Build the HTTP client and check the gateway answers.
    pub async fn connect(config: RestConfig) -> RestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RestDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::<str>::from(config.api_key),
        };

        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
    }

    async fn send(&self, table: &str, builder: reqwest::RequestBuilder) -> RestResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: table.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(RestDaoError::RequestStatus {
                path: table.to_string(),
                status: response.status(),
            })
        }
    }

    async fn fetch<T>(&self, table: &str, builder: reqwest::RequestBuilder) -> RestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.send(table, builder)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|source| RestDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })
    }

    async fn ping(&self) -> RestResult<()> {
        let builder = self
            .request(Method::GET, PROFILES_TABLE)
            .query(&[("select", "id"), ("limit", "1")]);
        self.send(PROFILES_TABLE, builder).await.map(|_| ())
    }

    async fn upsert_best_score(&self, score: ScoreEntity) -> RestResult<UpsertOutcome> {
        let mode = mode_column(score.mode);
        let lookup = self.request(Method::GET, SCORES_TABLE).query(&[
            ("select", "id,score".to_string()),
            ("user_id", format!("eq.{}", score.user_id)),
            ("mode", format!("eq.{mode}")),
            ("order", "score.desc".to_string()),
        ]);
        let existing: Vec<RestScoreRow> = self.fetch(SCORES_TABLE, lookup).await?;
        let plan = plan_score_write(existing, score.score);

        if !plan.duplicates.is_empty() {
            warn!(
                user_id = %score.user_id,
                mode,
                count = plan.duplicates.len(),
                "removing duplicate score rows"
            );
            let ids: Vec<String> = plan.duplicates.iter().map(ToString::to_string).collect();
            let cleanup = self
                .request(Method::DELETE, SCORES_TABLE)
                .query(&[("id", format!("in.({})", ids.join(",")))]);
            self.send(SCORES_TABLE, cleanup).await?;
        }

        let played_at = format_timestamp(score.played_at)?;
        let write = match (plan.outcome, plan.target) {
            (UpsertOutcome::Inserted, _) => self
                .request(Method::POST, SCORES_TABLE)
                .header("Prefer", "return=minimal")
                .json(&RestScoreInsert {
                    user_id: &score.user_id,
                    mode,
                    score: score.score,
                    level: score.level,
                    played_at,
                }),
            (UpsertOutcome::Improved { .. }, Some(target)) => self
                .request(Method::PATCH, SCORES_TABLE)
                .query(&[("id", format!("eq.{target}"))])
                .header("Prefer", "return=minimal")
                .json(&RestScoreUpdate {
                    score: score.score,
                    level: score.level,
                    played_at,
                }),
            _ => return Ok(plan.outcome),
        };
        self.send(SCORES_TABLE, write).await?;

        Ok(plan.outcome)
    }

    async fn top_scores(&self, mode: GameMode, limit: usize) -> RestResult<Vec<LeaderboardRowEntity>> {
        let builder = self.request(Method::GET, SCORES_TABLE).query(&[
            ("select", "user_id,score,level,played_at,profiles(username)".to_string()),
            ("mode", format!("eq.{}", mode_column(mode))),
            ("order", "score.desc,played_at.asc".to_string()),
            ("limit", LEADERBOARD_SCAN_LIMIT.max(limit).to_string()),
        ]);
        let rows: Vec<RestLeaderboardRow> = self.fetch(SCORES_TABLE, builder).await?;

        first_per_user(rows.into_iter().map(LeaderboardRowEntity::try_from), limit)
    }

    async fn save_profile(&self, profile: ProfileEntity) -> RestResult<ProfileEntity> {
        let row = RestProfileRow::from_entity(&profile)?;
        let builder = self
            .request(Method::POST, PROFILES_TABLE)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);

        match self.send(PROFILES_TABLE, builder).await {
            Ok(_) => Ok(profile),
            Err(RestDaoError::RequestStatus {
                status: StatusCode::CONFLICT,
                ..
            }) => Err(RestDaoError::UsernameTaken {
                username: profile.username,
            }),
            Err(err) => Err(err),
        }
    }

    async fn find_profile(&self, user_id: String) -> RestResult<Option<ProfileEntity>> {
        let builder = self.request(Method::GET, PROFILES_TABLE).query(&[
            ("select", "id,username,created_at".to_string()),
            ("id", format!("eq.{user_id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<RestProfileRow> = self.fetch(PROFILES_TABLE, builder).await?;

        rows.into_iter()
            .next()
            .map(ProfileEntity::try_from)
            .transpose()
    }
}

/// Writes needed to record a candidate score over the rows already stored for
/// one player and mode.
#[derive(Debug, PartialEq, Eq)]
struct ScoreWritePlan {
    outcome: UpsertOutcome,
    /// Rows beyond the best one, deleted before writing.
    duplicates: Vec<RowId>,
    /// Row patched when the candidate improves on it.
    target: Option<RowId>,
}

fn plan_score_write(mut existing: Vec<RestScoreRow>, candidate: u32) -> ScoreWritePlan {
    existing.sort_by(|a, b| b.score.cmp(&a.score));
    let mut rows = existing.into_iter();
    let best = rows.next();

    ScoreWritePlan {
        outcome: UpsertOutcome::decide(best.as_ref().map(|row| row.score), candidate),
        duplicates: rows.map(|row| row.id).collect(),
        target: best.map(|row| row.id),
    }
}

/// Keep the first row seen per player, in order, until `limit` players are
/// collected. Rows arrive best first, so that row is the player's best.
fn first_per_user<I>(rows: I, limit: usize) -> RestResult<Vec<LeaderboardRowEntity>>
where
    I: IntoIterator<Item = RestResult<LeaderboardRowEntity>>,
{
    let mut best_per_user: IndexMap<String, LeaderboardRowEntity> = IndexMap::new();
    for row in rows {
        if best_per_user.len() == limit {
            break;
        }
        let entity = row?;
        best_per_user.entry(entity.user_id.clone()).or_insert(entity);
    }

    Ok(best_per_user.into_values().collect())
}

impl ScoreStore for RestScoreStore {
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        // Plain HTTP: a reconnect is another round trip.
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
