//! Handle side of a game session. The owning worker lives in
//! [`crate::services::session_worker`].

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::Instant,
};
use uuid::Uuid;

use crate::state::{
    identity::PlayerIdentity,
    state_machine::{GameEvent, GameState, Rejection, TimerToken},
};

/// Identifier of a game session.
pub type SessionId = Uuid;

/// Versioned copy of a session's state. Observers drop snapshots older than
/// the last version they rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Number of applied transitions.
    pub version: u64,
    /// State after that transition.
    pub state: GameState,
}

/// Messages processed one at a time by a session worker.
#[derive(Debug)]
pub enum SessionCommand {
    /// A player action; the worker answers on `reply`.
    Dispatch {
        /// Action to apply.
        event: GameEvent,
        /// Receives the result once the action has been processed.
        reply: oneshot::Sender<DispatchReport>,
    },
    /// A scheduled delay elapsed.
    Timer(TimerToken),
}

/// Result of a dispatched action.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Why the action was ignored, when it was.
    pub rejection: Option<Rejection>,
    /// State after processing the action.
    pub snapshot: SessionSnapshot,
}

/// The session worker has stopped.
#[derive(Debug, Error)]
#[error("session {0} is closed")]
pub struct SessionClosed(pub SessionId);

/// Cheap, clonable handle to a running session.
///
/// The worker stops once every handle is dropped. Clones share one
/// last-activity clock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    owner: PlayerIdentity,
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    last_active: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    /// Wrap the channels of a freshly spawned worker.
    pub fn new(
        id: SessionId,
        owner: PlayerIdentity,
        commands: mpsc::Sender<SessionCommand>,
        snapshots: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            id,
            owner,
            commands,
            snapshots,
            last_active: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Identity that opened the session.
    pub fn owner(&self) -> &PlayerIdentity {
        &self.owner
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Record player activity on this session.
    pub fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self, now: Instant) -> Duration {
        let last_active = *self.last_active.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last_active)
    }

    /// Queue an action and wait until the worker processed it.
    pub async fn dispatch(&self, event: GameEvent) -> Result<DispatchReport, SessionClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionCommand::Dispatch { event, reply })
            .await
            .map_err(|_| SessionClosed(self.id))?;
        response.await.map_err(|_| SessionClosed(self.id))
    }
}
