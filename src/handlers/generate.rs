use axum::{extract::State, response::Json};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{
    errors::Result,
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{GenerateCardRequest, GenerateCardResponse},
    services::generator::GenerationRequest,
};

/// Runs the full generation pipeline for one request. Costs one point unless
/// the request is rejected before the deduct, or a summarize/render failure
/// triggers the refund.
#[utoipa::path(
    post,
    path = "/api/v1/cards/generate",
    request_body = GenerateCardRequest,
    responses(
        (status = 200, description = "Card generated (persisted or returned inline)", body = GenerateCardResponse),
        (status = 400, description = "Empty article text"),
        (status = 401, description = "Missing or invalid token"),
        (status = 402, description = "Insufficient points"),
        (status = 502, description = "Summarization or render collaborator failed"),
        (status = 504, description = "Render timed out")
    ),
    tag = "cards"
)]
pub async fn generate_card(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<GenerateCardRequest>,
) -> Result<Json<GenerateCardResponse>> {
    let request = GenerationRequest {
        article_text: payload.article_text,
        style: payload.style,
    };

    let card = state.generator.generate(&user.id, &request).await?;

    let response = match card.saved {
        Some(ref saved) => GenerateCardResponse {
            remaining_points: card.remaining_points,
            orientation: card.orientation,
            saved: true,
            summary_html: card.summary_html,
            record_id: Some(saved.record_id),
            image_url: Some(saved.image_url.clone()),
            html_url: Some(saved.html_url.clone()),
            image_data: None,
            warning: None,
        },
        None => GenerateCardResponse {
            remaining_points: card.remaining_points,
            orientation: card.orientation,
            saved: false,
            summary_html: card.summary_html,
            record_id: None,
            image_url: None,
            html_url: None,
            // The artifact is handed back inline so the user is not denied
            // their card just because the save step failed.
            image_data: Some(BASE64.encode(&card.png)),
            warning: card.persist_error,
        },
    };

    Ok(Json(response))
}
