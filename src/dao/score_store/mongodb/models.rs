use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{
    dao::models::{ProfileEntity, ScoreEntity},
    state::state_machine::GameMode,
};

/// One document per (user, mode); the `_id` encodes both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub mode: GameMode,
    pub score: u32,
    pub level: u8,
    pub played_at: DateTime,
}

impl From<ScoreEntity> for MongoScoreDocument {
    fn from(value: ScoreEntity) -> Self {
        Self {
            id: score_doc_id(&value.user_id, value.mode),
            user_id: value.user_id,
            mode: value.mode,
            score: value.score,
            level: value.level,
            played_at: DateTime::from_system_time(value.played_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProfileDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub created_at: DateTime,
}

impl From<ProfileEntity> for MongoProfileDocument {
    fn from(value: ProfileEntity) -> Self {
        Self {
            id: value.user_id,
            username: value.username,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoProfileDocument> for ProfileEntity {
    fn from(value: MongoProfileDocument) -> Self {
        Self {
            user_id: value.id,
            username: value.username,
            created_at: value.created_at.to_system_time(),
        }
    }
}

pub fn score_doc_id(user_id: &str, mode: GameMode) -> String {
    format!("{user_id}:{}", mode.as_str())
}

pub fn doc_id(id: &str) -> Document {
    doc! { "_id": id }
}

/// Matches the score document `id` only while its stored score is below
/// `score`, so concurrent writers can never lower the best.
pub fn improvable_score_filter(id: &str, score: u32) -> Document {
    doc! { "_id": id, "score": { "$lt": i64::from(score) } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_ids_are_scoped_by_mode() {
        assert_eq!(score_doc_id("abc", GameMode::MoveLimit), "abc:move_limit");
        assert_ne!(
            score_doc_id("abc", GameMode::Classic),
            score_doc_id("abc", GameMode::Lives)
        );
    }

    #[test]
    fn improvable_filter_requires_a_lower_stored_score() {
        let filter = improvable_score_filter("abc:classic", 600);
        assert_eq!(filter.get_str("_id").unwrap(), "abc:classic");
        let score = filter.get_document("score").unwrap();
        assert_eq!(score.get_i64("$lt").unwrap(), 600);
    }
}
