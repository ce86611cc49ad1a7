use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::generate::generate_card,
        crate::handlers::quota::get_quota,
        crate::handlers::cards::history,
        crate::handlers::cards::latest,
        crate::handlers::cards::download_image,
        crate::handlers::cards::download_html,
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
    ),
    components(
        schemas(
            crate::models::GenerateCardRequest,
            crate::models::GenerateCardResponse,
            crate::models::CardHistoryEntry,
            crate::models::QuotaResponse,
            crate::models::SummaryStyle,
            crate::models::Orientation,
        )
    ),
    tags(
        (name = "cards", description = "Summary card generation and history"),
        (name = "quota", description = "Point balance"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "Summary Card API",
        version = "0.1.0",
        description = "Turns pasted articles into shareable summary card images"
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
