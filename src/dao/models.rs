use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::state::state_machine::GameMode;

/// Best score of a player in one mode. At most one record exists per (user, mode).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Identifier of the registered player.
    pub user_id: String,
    /// Mode the score was earned in.
    pub mode: GameMode,
    /// Cumulative score of the run.
    pub score: u32,
    /// Level reached when the score was recorded.
    pub level: u8,
    /// When the score was recorded.
    pub played_at: SystemTime,
}

/// Display name chosen by a registered player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntity {
    /// Identifier of the registered player.
    pub user_id: String,
    /// Unique display name.
    pub username: String,
    /// When the profile was first created.
    pub created_at: SystemTime,
}

/// Score row joined with the owner's display name, as read for the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRowEntity {
    /// Identifier of the player owning the score.
    pub user_id: String,
    /// Display name, when the player created a profile.
    pub username: Option<String>,
    /// Best score.
    pub score: u32,
    /// Level reached.
    pub level: u8,
    /// When the score was recorded.
    pub played_at: SystemTime,
}

/// What a best-score upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed; the score was inserted.
    Inserted,
    /// The new score beat the stored one and replaced it.
    Improved {
        /// Score that was replaced.
        previous: u32,
    },
    /// The stored score was at least as high; nothing changed.
    Kept {
        /// Score still stored.
        best: u32,
    },
}

impl UpsertOutcome {
    /// Decide what to do with `candidate` given the currently stored best.
    pub fn decide(existing: Option<u32>, candidate: u32) -> Self {
        match existing {
            None => UpsertOutcome::Inserted,
            Some(best) if candidate > best => UpsertOutcome::Improved { previous: best },
            Some(best) => UpsertOutcome::Kept { best },
        }
    }

    /// Whether the stored record must be written.
    pub fn writes(self) -> bool {
        !matches!(self, UpsertOutcome::Kept { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_the_maximum() {
        assert_eq!(UpsertOutcome::decide(None, 0), UpsertOutcome::Inserted);
        assert_eq!(
            UpsertOutcome::decide(Some(300), 400),
            UpsertOutcome::Improved { previous: 300 }
        );
        assert_eq!(
            UpsertOutcome::decide(Some(300), 300),
            UpsertOutcome::Kept { best: 300 }
        );
        assert!(!UpsertOutcome::decide(Some(500), 100).writes());
    }
}
