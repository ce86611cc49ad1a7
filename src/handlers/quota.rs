use axum::{extract::State, response::Json};

use crate::{
    errors::Result,
    handlers::AppState,
    middleware::auth::AuthenticatedUser,
    models::QuotaResponse,
    services::ledger::QuotaLedger,
};

#[utoipa::path(
    get,
    path = "/api/v1/quota",
    responses(
        (status = 200, description = "Current point balance", body = QuotaResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "quota"
)]
pub async fn get_quota(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<QuotaResponse>> {
    let account = state.ledger.account(&user.id).await?;

    Ok(Json(account.into()))
}
