use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::error::{RestDaoError, RestResult};
use crate::{
    dao::models::{LeaderboardRowEntity, ProfileEntity},
    state::state_machine::GameMode,
};

pub const SCORES_TABLE: &str = "scores";
pub const PROFILES_TABLE: &str = "profiles";

/// Primary key of a score row; the column may be numeric or a uuid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Number(id) => write!(f, "{id}"),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RestScoreRow {
    pub id: RowId,
    pub score: u32,
}

#[derive(Debug, Serialize)]
pub struct RestScoreInsert<'a> {
    pub user_id: &'a str,
    pub mode: &'static str,
    pub score: u32,
    pub level: u8,
    pub played_at: String,
}

#[derive(Debug, Serialize)]
pub struct RestScoreUpdate {
    pub score: u32,
    pub level: u8,
    pub played_at: String,
}

#[derive(Debug, Deserialize)]
pub struct RestLeaderboardRow {
    pub user_id: String,
    pub score: u32,
    pub level: u8,
    pub played_at: String,
    #[serde(default)]
    pub profiles: Option<RestProfileName>,
}

#[derive(Debug, Deserialize)]
pub struct RestProfileName {
    pub username: Option<String>,
}

impl TryFrom<RestLeaderboardRow> for LeaderboardRowEntity {
    type Error = RestDaoError;

    fn try_from(value: RestLeaderboardRow) -> RestResult<Self> {
        Ok(Self {
            played_at: parse_timestamp(&value.played_at)?,
            username: value.profiles.and_then(|profile| profile.username),
            user_id: value.user_id,
            score: value.score,
            level: value.level,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestProfileRow {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

impl RestProfileRow {
    pub fn from_entity(entity: &ProfileEntity) -> RestResult<Self> {
        Ok(Self {
            id: entity.user_id.clone(),
            username: entity.username.clone(),
            created_at: format_timestamp(entity.created_at)?,
        })
    }
}

impl TryFrom<RestProfileRow> for ProfileEntity {
    type Error = RestDaoError;

    fn try_from(value: RestProfileRow) -> RestResult<Self> {
        Ok(Self {
            created_at: parse_timestamp(&value.created_at)?,
            user_id: value.id,
            username: value.username,
        })
    }
}

/// Mode name stored in the `scores.mode` column. Existing tables use the
/// historical `time_limit` name for the move limit mode.
pub fn mode_column(mode: GameMode) -> &'static str {
    match mode {
        GameMode::MoveLimit => "time_limit",
        other => other.as_str(),
    }
}

pub fn format_timestamp(time: SystemTime) -> RestResult<String> {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .map_err(|source| RestDaoError::FormatTimestamp { source })
}

pub fn parse_timestamp(value: &str) -> RestResult<SystemTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(SystemTime::from)
        .map_err(|source| RestDaoError::InvalidTimestamp {
            value: value.to_owned(),
            source,
        })
}
