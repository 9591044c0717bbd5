pub mod deck;
/// Caller identity resolved from request headers.
pub mod identity;
pub mod level;
/// Handles to running game sessions.
pub mod session;
mod sse;
/// Pure game rules.
pub mod state_machine;

use std::sync::Arc;

use axum::http::HeaderMap;
use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::score_store::ScoreStore,
    error::ServiceError,
    services::sse_events,
};

pub use self::sse::SseHub;
use self::{
    identity::PlayerIdentity,
    session::{SessionHandle, SessionId},
};

/// Application state shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

const PUBLIC_SSE_CAPACITY: usize = 64;

/// Central application state: configuration, the score store and live sessions.
pub struct AppState {
    config: AppConfig,
    score_store: RwLock<Option<Arc<dyn ScoreStore>>>,
    sessions: DashMap<SessionId, SessionHandle>,
    public_sse: SseHub,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a score store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            score_store: RwLock::new(None),
            sessions: DashMap::new(),
            public_sse: SseHub::new(PUBLIC_SSE_CAPACITY),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current score store, if one is installed.
    pub async fn score_store(&self) -> Option<Arc<dyn ScoreStore>> {
        let guard = self.score_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current score store, or [`ServiceError::Degraded`] while none is reachable.
    pub async fn require_score_store(&self) -> Result<Arc<dyn ScoreStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.score_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new score store implementation and leave degraded mode.
    pub async fn install_score_store(&self, store: Arc<dyn ScoreStore>) {
        {
            let mut guard = self.score_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current score store and enter degraded mode.
    pub async fn clear_score_store(&self) {
        {
            let mut guard = self.score_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, broadcasting on the public stream when it changes.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });

        if changed {
            sse_events::broadcast_system_status(self, value);
        }
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Registry of live game sessions keyed by their identifier.
    pub fn sessions(&self) -> &DashMap<SessionId, SessionHandle> {
        &self.sessions
    }

    /// Resolve the caller's identity from request headers.
    pub fn identify(&self, headers: &HeaderMap) -> PlayerIdentity {
        PlayerIdentity::from_headers(headers, &self.config.guest_prefix)
    }
}
