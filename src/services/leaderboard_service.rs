use indexmap::{IndexMap, map::Entry};

use crate::{
    dao::models::LeaderboardRowEntity,
    dto::leaderboard::{LeaderboardEntry, LeaderboardResponse},
    error::ServiceError,
    state::{SharedState, state_machine::GameMode},
};

/// Best players of `mode`, best first, at most `limit` (clamped) entries.
pub async fn leaderboard(
    state: &SharedState,
    mode: GameMode,
    limit: Option<usize>,
) -> Result<LeaderboardResponse, ServiceError> {
    let limit = state.config().leaderboard_limit(limit);
    let store = state.require_score_store().await?;
    let rows = store.top_scores(mode, limit).await?;

    Ok(LeaderboardResponse {
        mode,
        entries: rank_rows(rows, limit),
    })
}

/// One entry per user (their highest row), ordered by score then by who got
/// there first, numbered from 1.
fn rank_rows(rows: Vec<LeaderboardRowEntity>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut best: IndexMap<String, LeaderboardRowEntity> = IndexMap::with_capacity(rows.len());
    for row in rows {
        match best.entry(row.user_id.clone()) {
            Entry::Occupied(mut slot) => {
                if row.score > slot.get().score {
                    slot.insert(row);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }

    let mut ranked: Vec<LeaderboardRowEntity> = best.into_values().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.played_at.cmp(&b.played_at)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry::ranked(index + 1, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, SystemTime},
    };

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{ProfileEntity, ScoreEntity},
            score_store::{MemoryScoreStore, ScoreStore},
        },
        dto::leaderboard::UNKNOWN_USERNAME,
        state::AppState,
    };

    fn row(user: &str, name: Option<&str>, score: u32, at: u64) -> LeaderboardRowEntity {
        LeaderboardRowEntity {
            user_id: user.into(),
            username: name.map(Into::into),
            score,
            level: 2,
            played_at: SystemTime::UNIX_EPOCH + Duration::from_secs(at),
        }
    }

    #[test]
    fn duplicates_collapse_to_best_row() {
        let entries = rank_rows(
            vec![
                row("a", Some("Ada"), 300, 1),
                row("b", None, 500, 2),
                row("a", Some("Ada"), 900, 3),
                row("c", Some("Cy"), 500, 1),
            ],
            10,
        );

        let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["Ada", "Cy", UNKNOWN_USERNAME]);
        assert_eq!(entries[0].score, 900);
        assert_eq!(
            entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
            [1, 2, 3]
        );
    }

    #[test]
    fn truncates_after_dedup() {
        let entries = rank_rows(
            vec![row("a", None, 10, 0), row("a", None, 20, 0), row("b", None, 5, 0)],
            2,
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].score, 5);
    }

    #[tokio::test]
    async fn reads_from_the_installed_store() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryScoreStore::new();
        state.install_score_store(Arc::new(store.clone())).await;

        store
            .save_profile(ProfileEntity {
                user_id: "u1".into(),
                username: "Neo".into(),
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        for (user, score) in [("u1", 700), ("u2", 400)] {
            store
                .upsert_best_score(ScoreEntity {
                    user_id: user.into(),
                    mode: GameMode::Lives,
                    score,
                    level: 3,
                    played_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }

        let board = leaderboard(&state, GameMode::Lives, Some(0)).await.unwrap();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].username, "Neo");

        let classic = leaderboard(&state, GameMode::Classic, None).await.unwrap();
        assert!(classic.entries.is_empty());
    }

    #[tokio::test]
    async fn degraded_mode_is_reported() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            leaderboard(&state, GameMode::Classic, None).await,
            Err(ServiceError::Degraded)
        ));
    }
}
