use std::convert::Infallible;

use axum::{Router, extract::FromRequestParts, http::request::Parts};

use crate::state::{SharedState, identity::PlayerIdentity};

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Session lifecycle and player actions.
pub mod game;
/// Health probe.
pub mod health;
/// Ranked best scores.
pub mod leaderboard;
/// Player profiles.
pub mod profile;
/// Server-Sent Events streams.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(game::router())
        .merge(leaderboard::router())
        .merge(profile::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Caller identity read from the `x-player-id` header.
pub struct Player(pub PlayerIdentity);

impl FromRequestParts<SharedState> for Player {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Player(state.identify(&parts.headers)))
    }
}
