use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::profile::{ProfileResponse, UpsertProfileRequest},
    error::AppError,
    routes::Player,
    services::profile_service,
    state::SharedState,
};

/// Configure the profile routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/profiles", post(save_profile))
        .route("/profiles/me", get(my_profile))
}

/// Pick or change the caller's display name.
#[utoipa::path(
    post,
    path = "/profiles",
    tag = "profile",
    request_body = UpsertProfileRequest,
    params(("x-player-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Invalid username"),
        (status = 401, description = "No player id supplied"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn save_profile(
    State(state): State<SharedState>,
    Player(player): Player,
    Valid(Json(payload)): Valid<Json<UpsertProfileRequest>>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = profile_service::save_profile(&state, &player, payload).await?;
    Ok(Json(profile))
}

/// The caller's stored profile.
#[utoipa::path(
    get,
    path = "/profiles/me",
    tag = "profile",
    params(("x-player-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 200, description = "Stored profile", body = ProfileResponse),
        (status = 404, description = "No stored profile")
    )
)]
pub async fn my_profile(
    State(state): State<SharedState>,
    Player(player): Player,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(profile_service::my_profile(&state, &player).await?))
}
