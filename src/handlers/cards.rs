use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::{CardHistoryEntry, CardRecord},
    storage::Storage,
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/cards/history",
    params(
        ("limit" = Option<i64>, Query, description = "Page size, 1-100, default 20"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Most recent cards first", body = [CardHistoryEntry]),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "cards"
)]
pub async fn history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CardHistoryEntry>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let records = state.database.list_cards(&user.id, limit, offset).await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/cards/latest",
    responses(
        (status = 200, description = "Newest card", body = CardHistoryEntry),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No cards yet")
    ),
    tag = "cards"
)]
pub async fn latest(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CardHistoryEntry>> {
    let record = state
        .database
        .latest_card(&user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/cards/{id}/image",
    params(("id" = Uuid, Path, description = "Card record id")),
    responses(
        (status = 200, description = "PNG bytes", body = Vec<u8>, content_type = "image/png"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Card belongs to another user"),
        (status = 404, description = "Unknown card")
    ),
    tag = "cards"
)]
pub async fn download_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Uuid>,
) -> Result<Response> {
    let record = owned_record(&state, &user, card_id).await?;
    let bytes = state.storage.retrieve(&record.image_key).await?;

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"article-summary-{}.png\"",
                record.orientation
            ),
        ),
    ];

    Ok((headers, bytes).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/cards/{id}/html",
    params(("id" = Uuid, Path, description = "Card record id")),
    responses(
        (status = 200, description = "HTML source of the card", body = String, content_type = "text/html"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Card belongs to another user"),
        (status = 404, description = "Unknown card")
    ),
    tag = "cards"
)]
pub async fn download_html(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Uuid>,
) -> Result<Response> {
    let record = owned_record(&state, &user, card_id).await?;
    let bytes = state.storage.retrieve(&record.html_key).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"article-summary-{}.html\"",
                record.orientation
            ),
        ),
    ];

    Ok((headers, bytes).into_response())
}

async fn owned_record(
    state: &AppState,
    user: &AuthenticatedUser,
    card_id: Uuid,
) -> Result<CardRecord> {
    let record = state
        .database
        .get_card(card_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if record.user_id != user.id {
        return Err(AppError::Forbidden);
    }

    Ok(record)
}
