use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{dao::models::LeaderboardRowEntity, dto::format_system_time, state::state_machine::GameMode};

/// Shown for scores whose owner never picked a display name.
pub const UNKNOWN_USERNAME: &str = "Unknown_Operative";

/// Leaderboard query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Mode to rank. Defaults to classic.
    #[serde(default)]
    pub mode: GameMode,
    /// Number of entries, clamped to the configured maximum.
    pub limit: Option<usize>,
}

/// One ranked player.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub username: String,
    pub score: u32,
    pub level: u8,
    /// RFC 3339 timestamp of the best run.
    pub played_at: String,
}

impl LeaderboardEntry {
    /// Rank a stored row, substituting a placeholder for missing names.
    pub fn ranked(rank: usize, row: LeaderboardRowEntity) -> Self {
        Self {
            rank,
            username: row
                .username
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_USERNAME.to_string()),
            score: row.score,
            level: row.level,
            played_at: format_system_time(row.played_at),
        }
    }
}

/// Best scores of a mode, best first.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub mode: GameMode,
    pub entries: Vec<LeaderboardEntry>,
}
