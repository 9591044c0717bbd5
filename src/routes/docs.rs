use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const SWAGGER_PATH: &str = "/docs";
const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Serve the Swagger UI and the raw OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let ui: Router<SharedState> = SwaggerUi::new(SWAGGER_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into();

    ui.with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::OPENAPI_PATH;
    use crate::routes::test_support::{app, json, request, send};

    #[tokio::test]
    async fn serves_the_openapi_document() {
        let (_, app) = app().await;
        let response = send(&app, request("GET", OPENAPI_PATH, None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json(response).await;
        assert!(doc["paths"]["/leaderboard"]["get"].is_object());
    }
}
