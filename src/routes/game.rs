use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{ActionResponse, FlipRequest, GameSnapshot, ModeQuery, StartGameRequest},
    error::AppError,
    routes::Player,
    services::game_service,
    state::{
        SharedState, identity::PlayerIdentity, level::LevelConfig, state_machine::GameEvent,
    },
};

/// Routes handling game sessions and the level table.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/flip", post(flip_card))
        .route("/games/{id}/restart", post(restart_level))
        .route("/games/{id}/quit", post(quit_game))
        .route("/games/{id}/end", post(end_game))
        .route("/levels", get(levels))
}

/// Open a session and deal level 1.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = StartGameRequest,
    params(("x-player-id" = Option<String>, Header, description = "Caller user id")),
    responses(
        (status = 201, description = "Session created", body = GameSnapshot)
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Player(player): Player,
    payload: Option<Json<StartGameRequest>>,
) -> Result<(StatusCode, Json<GameSnapshot>), AppError> {
    let mode = payload.map(|Json(request)| request.mode).unwrap_or_default();
    let game = game_service::create_game(&state, player, mode).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// Current view of a session.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session state", body = GameSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(game_service::get_game(&state, &player, id)?))
}

/// Close a session.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, &player, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a new run on an idle session.
#[utoipa::path(
    post,
    path = "/games/{id}/start",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = StartGameRequest,
    responses((status = 200, description = "Action processed", body = ActionResponse))
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
    payload: Option<Json<StartGameRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let mode = payload.map(|Json(request)| request.mode).unwrap_or_default();
    act(&state, &player, id, GameEvent::Start(mode)).await
}

/// Turn a card face up.
#[utoipa::path(
    post,
    path = "/games/{id}/flip",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = FlipRequest,
    responses(
        (status = 200, description = "Action processed", body = ActionResponse),
        (status = 400, description = "Malformed card id")
    )
)]
pub async fn flip_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
    Valid(Json(payload)): Valid<Json<FlipRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    act(&state, &player, id, GameEvent::Flip(payload.card_id)).await
}

/// Re-deal the current level, keeping the score.
#[utoipa::path(
    post,
    path = "/games/{id}/restart",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Action processed", body = ActionResponse))
)]
pub async fn restart_level(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
) -> Result<Json<ActionResponse>, AppError> {
    act(&state, &player, id, GameEvent::Restart).await
}

/// Abandon the run without saving.
#[utoipa::path(
    post,
    path = "/games/{id}/quit",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Action processed", body = ActionResponse))
)]
pub async fn quit_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
) -> Result<Json<ActionResponse>, AppError> {
    act(&state, &player, id, GameEvent::Quit).await
}

/// Save the score of the run, then quit.
#[utoipa::path(
    post,
    path = "/games/{id}/end",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Action processed", body = ActionResponse))
)]
pub async fn end_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
) -> Result<Json<ActionResponse>, AppError> {
    act(&state, &player, id, GameEvent::EndGame).await
}

/// Level table of a mode.
#[utoipa::path(
    get,
    path = "/levels",
    tag = "game",
    params(ModeQuery),
    responses((status = 200, description = "Levels in play order", body = [LevelConfig]))
)]
pub async fn levels(Query(query): Query<ModeQuery>) -> Json<Vec<LevelConfig>> {
    Json(game_service::levels(query.mode))
}

async fn act(
    state: &SharedState,
    player: &PlayerIdentity,
    id: Uuid,
    event: GameEvent,
) -> Result<Json<ActionResponse>, AppError> {
    let response = game_service::dispatch(state, player, id, event).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{app, json, request, send};

    #[tokio::test]
    async fn create_then_flip() {
        let (_, app) = app().await;

        let created = send(&app, request("POST", "/games", Some("u1"), Some(json!({"mode": "lives"})))).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let game = json(created).await;
        assert_eq!(game["mode"], "lives");
        assert_eq!(game["lives"], 5);
        assert!(game["cards"][0]["symbol"].is_null());

        let id = game["session_id"].as_str().unwrap().to_owned();
        let card = game["cards"][0]["id"].as_str().unwrap().to_owned();
        let flipped = send(
            &app,
            request("POST", &format!("/games/{id}/flip"), Some("u1"), Some(json!({"card_id": card}))),
        )
        .await;
        assert_eq!(flipped.status(), StatusCode::OK);
        let body = json(flipped).await;
        assert_eq!(body["applied"], true);
        assert_eq!(body["game"]["pending"], json!([card]));
        assert!(body["game"]["cards"][0]["symbol"].is_string());
    }

    #[tokio::test]
    async fn empty_body_defaults_to_classic() {
        let (_, app) = app().await;
        let created = send(&app, request("POST", "/games", None, None)).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json(created).await["mode"], "classic");
    }

    #[tokio::test]
    async fn rejected_actions_are_reported_not_failed() {
        let (_, app) = app().await;
        let game = json(send(&app, request("POST", "/games", None, None)).await).await;
        let id = game["session_id"].as_str().unwrap();

        let response = send(
            &app,
            request("POST", &format!("/games/{id}/start"), None, Some(json!({"mode": "classic"}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["applied"], false);
        assert!(body["reason"].is_string());
    }

    #[tokio::test]
    async fn invalid_card_ids_are_bad_requests() {
        let (_, app) = app().await;
        let game = json(send(&app, request("POST", "/games", None, None)).await).await;
        let id = game["session_id"].as_str().unwrap();

        let response = send(
            &app,
            request("POST", &format!("/games/{id}/flip"), None, Some(json!({"card_id": ""}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn foreign_sessions_are_unauthorized() {
        let (_, app) = app().await;
        let game = json(send(&app, request("POST", "/games", Some("u1"), None)).await).await;
        let id = game["session_id"].as_str().unwrap();

        let response = send(&app, request("GET", &format!("/games/{id}"), Some("u2"), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_then_not_found() {
        let (state, app) = app().await;
        let game = json(send(&app, request("POST", "/games", None, None)).await).await;
        let id = game["session_id"].as_str().unwrap();

        let deleted = send(&app, request("DELETE", &format!("/games/{id}"), None, None)).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        assert!(state.sessions().is_empty());

        let missing = send(&app, request("POST", &format!("/games/{id}/quit"), None, None)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn level_table_per_mode() {
        let (_, app) = app().await;
        let response = send(&app, request("GET", "/levels?mode=move_limit", None, None)).await;
        let levels = json(response).await;
        assert_eq!(levels.as_array().unwrap().len(), 8);
        assert_eq!(levels[0]["move_limit"], 17);
        assert!(levels[0]["lives"].is_null());
    }
}
