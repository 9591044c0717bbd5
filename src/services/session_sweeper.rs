//! Periodic eviction of game sessions nobody has touched for a while.

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::{AppState, SharedState};

/// Sweep idle sessions until the application state is dropped.
pub async fn run(state: SharedState) {
    let weak = Arc::downgrade(&state);
    let period = state.config().session_sweep_interval;
    drop(state);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(state) = weak.upgrade() else {
            break;
        };
        let evicted = sweep(&state, Instant::now());
        if evicted > 0 {
            info!(
                evicted,
                remaining = state.sessions().len(),
                "closed idle game sessions"
            );
        }
    }

    debug!("session sweeper stopped");
}

/// Drop every session idle for at least the configured TTL and return how
/// many were removed. Dropping the last handle stops the session worker.
pub fn sweep(state: &AppState, now: Instant) -> usize {
    let ttl = state.config().session_idle_ttl;
    let before = state.sessions().len();
    state
        .sessions()
        .retain(|_, handle| handle.idle_for(now) < ttl);
    before.saturating_sub(state.sessions().len())
}
