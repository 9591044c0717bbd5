use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    deck::{Card, generate_deck},
    level::{LevelConfig, MAX_LEVEL, level_config},
};

/// Points awarded for a matched pair, multiplied by the current level.
pub const POINTS_PER_PAIR: u32 = 100;
/// Delay between the second card turning face up and the pair being compared.
pub const DEFAULT_RESOLVE_DELAY: Duration = Duration::from_millis(1_000);
/// Delay between a cleared board and the next level being dealt.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(1_500);

/// Ruleset variant selected when a run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// No move limit and no lives.
    #[default]
    Classic,
    /// Each level must be cleared within a bounded number of moves.
    #[serde(alias = "time_limit")]
    MoveLimit,
    /// Each mismatch costs a life.
    Lives,
}

impl GameMode {
    /// Every mode, in menu order.
    pub const ALL: [GameMode; 3] = [GameMode::Classic, GameMode::MoveLimit, GameMode::Lives];

    /// Stable wire name of the mode, also used as a storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::MoveLimit => "move_limit",
            GameMode::Lives => "lives",
        }
    }
}

/// High-level status of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// No board is dealt.
    #[default]
    Idle,
    /// A board is in play.
    Playing,
    /// The final level was cleared.
    Won,
    /// Lives or moves ran out before the board was cleared.
    Lost,
}

/// Aggregate state of a run. Mutated only by [`GameStateMachine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameState {
    /// Cards of the current board, in grid order.
    pub cards: Vec<Card>,
    /// Positions turned face up and waiting to be compared (never more than two).
    pub flipped: Vec<usize>,
    /// Positions belonging to confirmed pairs.
    pub matched: Vec<usize>,
    /// Resolved pair attempts on the current board.
    pub moves: u32,
    /// Cumulative score across levels.
    pub score: u32,
    /// Current level.
    pub level: u8,
    /// Remaining lives (lives mode only).
    pub lives: u8,
    /// Lives granted at the start of the level.
    pub max_lives: u8,
    /// Move budget of the level (move limit mode only).
    pub max_moves: u32,
    /// Status of the run.
    pub status: GameStatus,
    /// Active ruleset.
    pub mode: GameMode,
}

impl GameState {
    fn dealt(mode: GameMode, config: LevelConfig, cards: Vec<Card>, score: u32) -> Self {
        let lives = config.lives.unwrap_or(0);
        Self {
            cards,
            flipped: Vec::with_capacity(2),
            matched: Vec::new(),
            moves: 0,
            score,
            level: config.level,
            lives,
            max_lives: lives,
            max_moves: config.move_limit.unwrap_or(0),
            status: GameStatus::Playing,
            mode,
        }
    }

    /// Whether every card of a dealt board has been matched.
    pub fn is_board_cleared(&self) -> bool {
        !self.cards.is_empty() && self.matched.len() == self.cards.len()
    }
}

/// Identifier of a scheduled event; a fired token is only honoured while it is
/// still the machine's scheduled slot.
pub type TimerToken = Uuid;

/// Transitions that are triggered by the clock rather than by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEvent {
    /// Compare the two pending cards.
    ResolvePending,
    /// Deal the next level after a cleared board.
    AdvanceLevel,
}

/// A timed event the runtime must deliver back through [`GameStateMachine::fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// Token to hand back when the delay elapses.
    pub token: TimerToken,
    /// Event that fires.
    pub event: TimedEvent,
    /// Delay before firing.
    pub delay: Duration,
}

/// Score to hand to the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSubmission {
    /// Cumulative score of the run.
    pub score: u32,
    /// Mode the score was earned in.
    pub mode: GameMode,
    /// Level reached.
    pub level: u8,
}

/// Side effects requested by a transition; the machine never performs I/O itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver the event after its delay.
    Schedule(ScheduledEvent),
    /// Drop a previously scheduled event.
    Cancel(TimerToken),
    /// Save the score externally (fire and forget).
    PersistScore(ScoreSubmission),
}

/// Player intents accepted by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Deal level 1 in the given mode.
    Start(GameMode),
    /// Turn the card with this id face up.
    Flip(String),
    /// Re-deal the current level, keeping the score.
    Restart,
    /// Discard the run and return to idle.
    Quit,
    /// Save the score, then quit.
    EndGame,
}

impl GameEvent {
    fn name(&self) -> &'static str {
        match self {
            GameEvent::Start(_) => "start",
            GameEvent::Flip(_) => "flip",
            GameEvent::Restart => "restart",
            GameEvent::Quit => "quit",
            GameEvent::EndGame => "end_game",
        }
    }
}

/// Reason an action was ignored. Rejections never change the state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The action is not valid in the current status.
    #[error("`{event}` is not accepted while {status:?}")]
    WrongStatus {
        /// Name of the rejected action.
        event: &'static str,
        /// Status the run was in.
        status: GameStatus,
    },
    /// Two cards are already face up and waiting.
    #[error("two cards are already pending")]
    PairPending,
    /// No card on the board carries this id.
    #[error("unknown card `{0}`")]
    UnknownCard(String),
    /// The card is already face up.
    #[error("card `{0}` is already face up")]
    AlreadyFlipped(String),
    /// The card belongs to a confirmed pair.
    #[error("card `{0}` is already matched")]
    AlreadyMatched(String),
    /// The timer was cancelled or superseded before it fired.
    #[error("timer {0} is no longer scheduled")]
    StaleTimer(TimerToken),
}

/// Result of feeding an action or timer into the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The state changed; the runtime must carry out the effects in order.
    Applied(Vec<Effect>),
    /// Nothing changed.
    Rejected(Rejection),
}

impl Outcome {
    /// Whether the state changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// Effects to execute (empty for rejections).
    pub fn effects(&self) -> &[Effect] {
        match self {
            Outcome::Applied(effects) => effects,
            Outcome::Rejected(_) => &[],
        }
    }
}

/// Delays used when scheduling timed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Delay before two pending cards are compared.
    pub resolve_delay: Duration,
    /// Delay before the next level is dealt.
    pub advance_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            resolve_delay: DEFAULT_RESOLVE_DELAY,
            advance_delay: DEFAULT_ADVANCE_DELAY,
        }
    }
}

/// Reducer owning one run of the game.
///
/// Every applied transition bumps [`version`](Self::version); rejected ones
/// leave the machine untouched. At most one timed event is scheduled at a time.
#[derive(Debug)]
pub struct GameStateMachine {
    state: GameState,
    version: u64,
    scheduled: Option<ScheduledEvent>,
    timings: Timings,
    rng: StdRng,
}

impl GameStateMachine {
    /// Create an idle machine dealing boards from OS entropy.
    pub fn new(timings: Timings) -> Self {
        Self::with_rng(timings, StdRng::from_os_rng())
    }

    /// Create an idle machine with a reproducible deal sequence.
    pub fn with_seed(timings: Timings, seed: u64) -> Self {
        Self::with_rng(timings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(timings: Timings, rng: StdRng) -> Self {
        Self {
            state: GameState::default(),
            version: 0,
            scheduled: None,
            timings,
            rng,
        }
    }

    /// Current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Number of applied transitions so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The timed event currently waiting to fire, if any.
    pub fn scheduled(&self) -> Option<&ScheduledEvent> {
        self.scheduled.as_ref()
    }

    /// Apply a player action.
    pub fn apply(&mut self, event: GameEvent) -> Outcome {
        let name = event.name();
        let result = match event {
            GameEvent::Start(mode) => self.start(mode, name),
            GameEvent::Flip(card_id) => self.flip(card_id, name),
            GameEvent::Restart => self.restart(name),
            GameEvent::Quit => Ok(self.quit()),
            GameEvent::EndGame => self.end_game(name),
        };
        self.finish(result)
    }

    /// Deliver a timed event whose delay elapsed.
    pub fn fire(&mut self, token: TimerToken) -> Outcome {
        let result = match self.scheduled {
            Some(scheduled) if scheduled.token == token => {
                self.scheduled = None;
                match scheduled.event {
                    TimedEvent::ResolvePending => Ok(self.resolve_pending()),
                    TimedEvent::AdvanceLevel => Ok(self.advance_level()),
                }
            }
            _ => Err(Rejection::StaleTimer(token)),
        };
        self.finish(result)
    }

    fn finish(&mut self, result: Result<Vec<Effect>, Rejection>) -> Outcome {
        match result {
            Ok(effects) => {
                self.version += 1;
                Outcome::Applied(effects)
            }
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }

    fn start(&mut self, mode: GameMode, event: &'static str) -> Result<Vec<Effect>, Rejection> {
        self.require_status(event, |status| status == GameStatus::Idle)?;
        let effects = self.cancel_scheduled();
        self.state = self.deal(mode, 1, 0);
        Ok(effects)
    }

    fn flip(&mut self, card_id: String, event: &'static str) -> Result<Vec<Effect>, Rejection> {
        self.require_status(event, |status| status == GameStatus::Playing)?;
        if self.state.flipped.len() >= 2 {
            return Err(Rejection::PairPending);
        }

        let Some(index) = self.state.cards.iter().position(|card| card.id == card_id) else {
            return Err(Rejection::UnknownCard(card_id));
        };
        let card = &mut self.state.cards[index];
        if card.is_matched {
            return Err(Rejection::AlreadyMatched(card_id));
        }
        if card.is_flipped {
            return Err(Rejection::AlreadyFlipped(card_id));
        }

        card.is_flipped = true;
        self.state.flipped.push(index);

        if self.state.flipped.len() == 2 {
            let delay = self.timings.resolve_delay;
            Ok(self.schedule(TimedEvent::ResolvePending, delay))
        } else {
            Ok(Vec::new())
        }
    }

    fn resolve_pending(&mut self) -> Vec<Effect> {
        let [first, second] = match self.state.flipped[..] {
            [first, second] => [first, second],
            _ => return Vec::new(),
        };
        self.state.flipped.clear();
        self.state.moves += 1;

        let is_match = self.state.cards[first].symbol == self.state.cards[second].symbol;
        if is_match {
            for index in [first, second] {
                let card = &mut self.state.cards[index];
                card.is_matched = true;
                card.is_flipped = true;
            }
            self.state.matched.extend([first, second]);
            self.state.score += POINTS_PER_PAIR * u32::from(self.state.level);
        } else {
            for index in [first, second] {
                self.state.cards[index].is_flipped = false;
            }
            if self.state.mode == GameMode::Lives {
                self.state.lives = self.state.lives.saturating_sub(1);
                if self.state.lives == 0 {
                    self.state.status = GameStatus::Lost;
                }
            }
        }

        let cleared = self.state.is_board_cleared();
        if self.state.mode == GameMode::MoveLimit
            && !cleared
            && self.state.moves >= self.state.max_moves
        {
            self.state.status = GameStatus::Lost;
        }

        if cleared && self.state.status == GameStatus::Playing {
            self.complete_level()
        } else {
            Vec::new()
        }
    }

    fn complete_level(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::PersistScore(self.submission())];
        if self.state.level < MAX_LEVEL {
            let delay = self.timings.advance_delay;
            effects.extend(self.schedule(TimedEvent::AdvanceLevel, delay));
        } else {
            self.state.status = GameStatus::Won;
        }
        effects
    }

    fn advance_level(&mut self) -> Vec<Effect> {
        if self.state.status != GameStatus::Playing || !self.state.is_board_cleared() {
            return Vec::new();
        }
        let next = (self.state.level + 1).min(MAX_LEVEL);
        self.state = self.deal(self.state.mode, next, self.state.score);
        Vec::new()
    }

    fn restart(&mut self, event: &'static str) -> Result<Vec<Effect>, Rejection> {
        self.require_status(event, |status| status != GameStatus::Idle)?;
        let effects = self.cancel_scheduled();
        self.state = self.deal(self.state.mode, self.state.level, self.state.score);
        Ok(effects)
    }

    fn quit(&mut self) -> Vec<Effect> {
        let effects = self.cancel_scheduled();
        self.state = GameState::default();
        effects
    }

    fn end_game(&mut self, event: &'static str) -> Result<Vec<Effect>, Rejection> {
        self.require_status(event, |status| status != GameStatus::Idle)?;
        let mut effects = Vec::new();
        if self.state.score > 0 {
            effects.push(Effect::PersistScore(self.submission()));
        }
        effects.extend(self.quit());
        Ok(effects)
    }

    fn deal(&mut self, mode: GameMode, level: u8, score: u32) -> GameState {
        let config = level_config(level, mode);
        let cards = generate_deck(usize::from(config.pair_count), &mut self.rng);
        GameState::dealt(mode, config, cards, score)
    }

    fn submission(&self) -> ScoreSubmission {
        ScoreSubmission {
            score: self.state.score,
            mode: self.state.mode,
            level: self.state.level,
        }
    }

    fn schedule(&mut self, event: TimedEvent, delay: Duration) -> Vec<Effect> {
        let mut effects = self.cancel_scheduled();
        let scheduled = ScheduledEvent {
            token: Uuid::new_v4(),
            event,
            delay,
        };
        self.scheduled = Some(scheduled);
        effects.push(Effect::Schedule(scheduled));
        effects
    }

    fn cancel_scheduled(&mut self) -> Vec<Effect> {
        self.scheduled
            .take()
            .map(|scheduled| Effect::Cancel(scheduled.token))
            .into_iter()
            .collect()
    }

    fn require_status(
        &self,
        event: &'static str,
        allowed: impl Fn(GameStatus) -> bool,
    ) -> Result<(), Rejection> {
        if allowed(self.state.status) {
            Ok(())
        } else {
            Err(Rejection::WrongStatus {
                event,
                status: self.state.status,
            })
        }
    }
}
