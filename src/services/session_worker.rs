//! Actor owning one [`GameStateMachine`]. Player actions and elapsed timers
//! are processed strictly one at a time; every applied transition publishes
//! a new snapshot.

use std::sync::{Arc, Weak};

use tokio::{
    sync::{mpsc, watch},
    task::AbortHandle,
    time::sleep,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    services::score_service,
    state::{
        AppState, SharedState,
        identity::PlayerIdentity,
        session::{DispatchReport, SessionCommand, SessionHandle, SessionId, SessionSnapshot},
        state_machine::{
            Effect, GameStateMachine, Outcome, Rejection, ScheduledEvent, ScoreSubmission,
            TimerToken,
        },
    },
};

/// Spawn a session owned by `owner` with the configured timings.
pub fn spawn(state: &SharedState, owner: PlayerIdentity) -> SessionHandle {
    let machine = GameStateMachine::new(state.config().timings);
    spawn_with_machine(state, owner, machine)
}

/// Spawn a session around an existing machine (seeded decks in tests).
pub fn spawn_with_machine(
    state: &SharedState,
    owner: PlayerIdentity,
    machine: GameStateMachine,
) -> SessionHandle {
    let id = Uuid::new_v4();
    let (commands_tx, commands_rx) = mpsc::channel(state.config().session_queue_capacity.max(1));
    let (snapshots_tx, snapshots_rx) = watch::channel(snapshot_of(&machine));

    let worker = SessionWorker {
        id,
        owner: owner.clone(),
        machine,
        commands: commands_tx.downgrade(),
        snapshots: snapshots_tx,
        timer: None,
        app: Arc::downgrade(state),
    };
    tokio::spawn(worker.run(commands_rx));

    SessionHandle::new(id, owner, commands_tx, snapshots_rx)
}

fn snapshot_of(machine: &GameStateMachine) -> SessionSnapshot {
    SessionSnapshot {
        version: machine.version(),
        state: machine.state().clone(),
    }
}

struct PendingTimer {
    token: TimerToken,
    task: AbortHandle,
}

struct SessionWorker {
    id: SessionId,
    owner: PlayerIdentity,
    machine: GameStateMachine,
    /// Weak so that timers never keep a dropped session alive.
    commands: mpsc::WeakSender<SessionCommand>,
    snapshots: watch::Sender<SessionSnapshot>,
    timer: Option<PendingTimer>,
    app: Weak<AppState>,
}

impl SessionWorker {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        debug!(session_id = %self.id, "session worker started");

        while let Some(command) = commands.recv().await {
            match command {
                SessionCommand::Dispatch { event, reply } => {
                    let outcome = self.machine.apply(event);
                    let rejection = self.settle(outcome);
                    // the caller may have given up waiting
                    let _ = reply.send(DispatchReport {
                        rejection,
                        snapshot: snapshot_of(&self.machine),
                    });
                }
                SessionCommand::Timer(token) => {
                    if self.timer.as_ref().is_some_and(|timer| timer.token == token) {
                        self.timer = None;
                    }
                    let outcome = self.machine.fire(token);
                    self.settle(outcome);
                }
            }
        }

        debug!(session_id = %self.id, "session worker stopped");
    }

    /// Run the effects of an applied transition and publish the new state.
    fn settle(&mut self, outcome: Outcome) -> Option<Rejection> {
        match outcome {
            Outcome::Applied(effects) => {
                for effect in effects {
                    self.execute(effect);
                }
                self.snapshots.send_replace(snapshot_of(&self.machine));
                None
            }
            Outcome::Rejected(rejection) => {
                debug!(session_id = %self.id, reason = %rejection, "action ignored");
                Some(rejection)
            }
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Schedule(scheduled) => self.schedule(scheduled),
            Effect::Cancel(token) => self.cancel(token),
            Effect::PersistScore(submission) => self.persist(submission),
        }
    }

    fn schedule(&mut self, scheduled: ScheduledEvent) {
        if let Some(previous) = self.timer.take() {
            previous.task.abort();
        }

        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            sleep(scheduled.delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(SessionCommand::Timer(scheduled.token)).await;
            }
        });

        self.timer = Some(PendingTimer {
            token: scheduled.token,
            task: task.abort_handle(),
        });
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(timer) = self.timer.take_if(|timer| timer.token == token) {
            timer.task.abort();
        }
    }

    fn persist(&self, submission: ScoreSubmission) {
        let Some(app) = self.app.upgrade() else {
            return;
        };
        info!(
            session_id = %self.id,
            score = submission.score,
            level = submission.level,
            mode = submission.mode.as_str(),
            "run finished; saving score"
        );
        score_service::spawn_persist(app, self.owner.clone(), submission);
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{Instant, timeout};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::score_store::{MemoryScoreStore, ScoreStore},
        state::state_machine::{GameEvent, GameMode, GameState, GameStatus, Timings},
    };

    const WAIT: Duration = Duration::from_secs(30);

    fn pairs(state: &GameState) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (i, card) in state.cards.iter().enumerate() {
            if let Some(other) = state.cards[i + 1..]
                .iter()
                .find(|other| other.symbol == card.symbol)
            {
                pairs.push((card.id.clone(), other.id.clone()));
            }
        }
        pairs
    }

    fn mismatch(state: &GameState) -> (String, String) {
        let first = &state.cards[0];
        let other = state
            .cards
            .iter()
            .find(|card| card.symbol != first.symbol)
            .expect("a level always holds two symbols");
        (first.id.clone(), other.id.clone())
    }

    async fn wait_until(
        handle: &SessionHandle,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut snapshots = handle.subscribe();
        let snapshot = timeout(WAIT, snapshots.wait_for(predicate))
            .await
            .expect("condition reached in time")
            .expect("session still running")
            .clone();
        snapshot
    }

    fn seeded(state: &SharedState, owner: PlayerIdentity) -> SessionHandle {
        spawn_with_machine(state, owner, GameStateMachine::with_seed(Timings::default(), 11))
    }

    #[tokio::test(start_paused = true)]
    async fn mismatch_resolves_after_delay() {
        let state = AppState::new(AppConfig::default());
        let handle = seeded(&state, PlayerIdentity::Anonymous);
        handle.dispatch(GameEvent::Start(GameMode::Lives)).await.unwrap();

        let (a, b) = mismatch(&handle.snapshot().state);
        handle.dispatch(GameEvent::Flip(a)).await.unwrap();
        let flipped = handle.dispatch(GameEvent::Flip(b)).await.unwrap();
        assert_eq!(flipped.snapshot.state.flipped.len(), 2);
        let started = Instant::now();

        let resolved = wait_until(&handle, |s| s.state.flipped.is_empty()).await;

        assert!(started.elapsed() >= Duration::from_millis(1_000));
        assert_eq!(resolved.state.lives, 4);
        assert_eq!(resolved.state.moves, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_board_advances_and_persists() {
        let state = AppState::new(AppConfig::default());
        let store = MemoryScoreStore::new();
        state.install_score_store(Arc::new(store.clone())).await;
        let mut events = state.public_sse().subscribe();

        let handle = seeded(&state, PlayerIdentity::Registered("u1".into()));
        handle.dispatch(GameEvent::Start(GameMode::Classic)).await.unwrap();

        for (a, b) in pairs(&handle.snapshot().state) {
            handle.dispatch(GameEvent::Flip(a)).await.unwrap();
            handle.dispatch(GameEvent::Flip(b)).await.unwrap();
            wait_until(&handle, |s| s.state.flipped.is_empty()).await;
        }
        let cleared = Instant::now();

        let next = wait_until(&handle, |s| s.state.level == 2).await;
        assert!(cleared.elapsed() >= Duration::from_millis(1_500));
        assert_eq!(next.state.score, 600);
        assert_eq!(next.state.status, GameStatus::Playing);

        let saved = timeout(WAIT, events.recv()).await.unwrap().unwrap();
        assert_eq!(saved.event.as_deref(), Some("score.saved"));
        let rows = store.top_scores(GameMode::Classic, 10).await.unwrap();
        assert_eq!(rows[0].score, 600);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_pending_resolution() {
        let state = AppState::new(AppConfig::default());
        let handle = seeded(&state, PlayerIdentity::Anonymous);
        handle.dispatch(GameEvent::Start(GameMode::Classic)).await.unwrap();

        let (a, b) = mismatch(&handle.snapshot().state);
        handle.dispatch(GameEvent::Flip(a)).await.unwrap();
        handle.dispatch(GameEvent::Flip(b)).await.unwrap();
        let restarted = handle.dispatch(GameEvent::Restart).await.unwrap();
        assert!(restarted.rejection.is_none());

        sleep(Duration::from_secs(5)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.version, restarted.snapshot.version);
        assert_eq!(snapshot.state.moves, 0);
    }

    #[tokio::test]
    async fn rejections_leave_the_snapshot_untouched() {
        let state = AppState::new(AppConfig::default());
        let handle = seeded(&state, PlayerIdentity::Anonymous);

        let report = handle
            .dispatch(GameEvent::Flip("card-0-a".into()))
            .await
            .unwrap();

        assert!(report.rejection.is_some());
        assert_eq!(report.snapshot.version, 0);
    }

    #[tokio::test]
    async fn worker_stops_with_its_last_handle() {
        let state = AppState::new(AppConfig::default());
        let handle = seeded(&state, PlayerIdentity::Anonymous);
        let mut snapshots = handle.subscribe();

        drop(handle);

        assert!(snapshots.changed().await.is_err());
    }
}
