use utoipa::OpenApi;

/// Aggregated OpenAPI document for Memory Match Back.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::delete_game,
        crate::routes::game::start_game,
        crate::routes::game::flip_card,
        crate::routes::game::restart_level,
        crate::routes::game::quit_game,
        crate::routes::game::end_game,
        crate::routes::game::levels,
        crate::routes::leaderboard::leaderboard,
        crate::routes::profile::save_profile,
        crate::routes::profile::my_profile,
        crate::routes::sse::public_stream,
        crate::routes::sse::game_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::StartGameRequest,
            crate::dto::game::FlipRequest,
            crate::dto::game::CardView,
            crate::dto::game::GameSnapshot,
            crate::dto::game::ActionResponse,
            crate::dto::leaderboard::LeaderboardEntry,
            crate::dto::leaderboard::LeaderboardResponse,
            crate::dto::profile::UpsertProfileRequest,
            crate::dto::profile::ProfileResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ScoreSavedEvent,
            crate::state::level::LevelConfig,
            crate::state::state_machine::GameMode,
            crate::state::state_machine::GameStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game sessions and player actions"),
        (name = "leaderboard", description = "Best scores per mode"),
        (name = "profile", description = "Player display names"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/games",
            "/games/{id}",
            "/games/{id}/flip",
            "/games/{id}/events",
            "/levels",
            "/leaderboard",
            "/profiles",
            "/profiles/me",
            "/sse/public",
            "/healthcheck",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
