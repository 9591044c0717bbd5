//! Level configuration table: board size, pair count and per-mode budgets.

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::GameMode;

/// Highest playable level; completing it ends the run.
pub const MAX_LEVEL: u8 = 8;

/// Lives granted at the start of each level in lives mode.
const LIVES_BY_LEVEL: [u8; MAX_LEVEL as usize] = [5, 5, 4, 4, 3, 3, 2, 1];

struct GridSpec {
    cols: u8,
    rows: u8,
    pairs: u8,
}

const GRID_BY_LEVEL: [GridSpec; MAX_LEVEL as usize] = [
    GridSpec { cols: 3, rows: 4, pairs: 6 },
    GridSpec { cols: 4, rows: 4, pairs: 8 },
    GridSpec { cols: 5, rows: 4, pairs: 10 },
    GridSpec { cols: 6, rows: 4, pairs: 12 },
    GridSpec { cols: 6, rows: 5, pairs: 15 },
    GridSpec { cols: 6, rows: 6, pairs: 18 },
    GridSpec { cols: 7, rows: 6, pairs: 21 },
    GridSpec { cols: 8, rows: 6, pairs: 24 },
];

/// Derived configuration for a single level, recomputed whenever a board is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LevelConfig {
    /// Level number after clamping into `1..=MAX_LEVEL`.
    pub level: u8,
    /// Number of grid columns.
    pub grid_cols: u8,
    /// Number of grid rows.
    pub grid_rows: u8,
    /// Number of symbol pairs dealt on the board.
    pub pair_count: u8,
    /// Maximum moves allowed (move limit mode only).
    pub move_limit: Option<u32>,
    /// Lives granted for the level (lives mode only).
    pub lives: Option<u8>,
}

impl LevelConfig {
    /// Total number of cards on the board.
    pub fn card_count(&self) -> usize {
        usize::from(self.pair_count) * 2
    }
}

/// Compute the configuration of `level` under `mode`.
///
/// Levels above [`MAX_LEVEL`] resolve to the last level and level 0 resolves to
/// level 1, so callers can never fall off the table.
pub fn level_config(level: u8, mode: GameMode) -> LevelConfig {
    let level = level.clamp(1, MAX_LEVEL);
    let index = usize::from(level - 1);
    let grid = &GRID_BY_LEVEL[index];

    let (move_limit, lives) = match mode {
        GameMode::Classic => (None, None),
        GameMode::MoveLimit => (Some(move_limit(grid.pairs, level)), None),
        GameMode::Lives => (None, Some(LIVES_BY_LEVEL[index])),
    };

    LevelConfig {
        level,
        grid_cols: grid.cols,
        grid_rows: grid.rows,
        pair_count: grid.pairs,
        move_limit,
        lives,
    }
}

/// Every level of the table for `mode`, in play order.
pub fn level_table(mode: GameMode) -> Vec<LevelConfig> {
    (1..=MAX_LEVEL).map(|level| level_config(level, mode)).collect()
}

/// `floor(pairs * 2 * (1.5 - level * 0.05))` computed exactly as
/// `pairs * 2 * (30 - level) / 20`, so no level rounds down a whole move early.
fn move_limit(pairs: u8, level: u8) -> u32 {
    let slack_twentieths = 30 - u32::from(level);
    u32::from(pairs) * 2 * slack_twentieths / 20
}
