use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    routes::Player,
    services::{
        game_service,
        sse_service,
    },
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream score saves and storage status changes to connected frontends.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe_public(&state);
    info!(
        subscribers = state.public_sse().subscriber_count(),
        "New public SSE connection"
    );
    sse_service::to_sse_stream(receiver, sse_service::public_handshake(&state))
}

#[utoipa::path(
    get,
    path = "/games/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Snapshot stream of one session", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream every state change of a session, starting with its current state.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Player(player): Player,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let snapshots = game_service::subscribe(&state, &player, id)?;
    info!(session_id = %id, "New game SSE connection");
    Ok(sse_service::session_stream(id, snapshots))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/games/{id}/events", get(game_stream))
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header};
    use futures::StreamExt;

    use crate::routes::test_support::{app, json, request, send};

    #[tokio::test]
    async fn game_stream_starts_with_current_snapshot() {
        let (_, app) = app().await;
        let game = json(send(&app, request("POST", "/games", None, None)).await).await;
        let id = game["session_id"].as_str().unwrap();

        let response = send(&app, request("GET", &format!("/games/{id}/events"), None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.starts_with("event: game.snapshot\n"));
        assert!(text.contains(&format!(r#""session_id":"{id}""#)));
    }

    #[tokio::test]
    async fn unknown_game_stream_is_not_found() {
        let (_, app) = app().await;
        let response = send(
            &app,
            request("GET", &format!("/games/{}/events", uuid::Uuid::nil()), None, None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
