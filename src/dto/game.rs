use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_card_id,
    state::{
        deck::Card,
        level::{LevelConfig, level_config},
        session::{SessionId, SessionSnapshot},
        state_machine::{GameMode, GameState, GameStatus},
    },
};

/// Payload used to start a run, either when opening a session or on an idle one.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartGameRequest {
    /// Ruleset of the run. Defaults to classic.
    #[serde(default)]
    pub mode: GameMode,
}

/// Card the player wants to turn face up.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FlipRequest {
    pub card_id: String,
}

impl Validate for FlipRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_card_id(&self.card_id) {
            errors.add("card_id", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Query selecting a game mode.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModeQuery {
    /// Ruleset to describe. Defaults to classic.
    #[serde(default)]
    pub mode: GameMode,
}

/// A card as shown to the player. Face-down cards hide their symbol.
#[derive(Debug, Serialize, ToSchema)]
pub struct CardView {
    pub id: String,
    pub symbol: Option<String>,
    pub is_flipped: bool,
    pub is_matched: bool,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        let visible = card.is_flipped || card.is_matched;
        Self {
            id: card.id.clone(),
            symbol: visible.then(|| card.symbol.to_string()),
            is_flipped: card.is_flipped,
            is_matched: card.is_matched,
        }
    }
}

/// Public view of a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSnapshot {
    pub session_id: Uuid,
    /// Incremented on every applied transition.
    pub version: u64,
    pub status: GameStatus,
    pub mode: GameMode,
    pub level: u8,
    pub score: u32,
    pub moves: u32,
    /// Remaining lives (lives mode only).
    pub lives: Option<u8>,
    pub max_lives: Option<u8>,
    /// Move budget of the level (move limit mode only).
    pub max_moves: Option<u32>,
    /// Ids of the face-up cards waiting to be compared.
    pub pending: Vec<String>,
    pub matched_pairs: usize,
    /// Board layout of the current level; absent while idle.
    pub board: Option<LevelConfig>,
    pub cards: Vec<CardView>,
}

impl GameSnapshot {
    /// Build the public view of a session snapshot.
    pub fn new(session_id: SessionId, snapshot: &SessionSnapshot) -> Self {
        let state: &GameState = &snapshot.state;
        let active = state.status != GameStatus::Idle;
        let lives_mode = active && state.mode == GameMode::Lives;
        let move_limit_mode = active && state.mode == GameMode::MoveLimit;

        Self {
            session_id,
            version: snapshot.version,
            status: state.status,
            mode: state.mode,
            level: state.level,
            score: state.score,
            moves: state.moves,
            lives: lives_mode.then_some(state.lives),
            max_lives: lives_mode.then_some(state.max_lives),
            max_moves: move_limit_mode.then_some(state.max_moves),
            pending: state
                .flipped
                .iter()
                .filter_map(|&index| state.cards.get(index))
                .map(|card| card.id.clone())
                .collect(),
            matched_pairs: state.matched.len() / 2,
            board: active.then(|| level_config(state.level, state.mode)),
            cards: state.cards.iter().map(CardView::from).collect(),
        }
    }
}

/// Result of a player action.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Whether the action changed the game.
    pub applied: bool,
    /// Why the action was ignored, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub game: GameSnapshot,
}
