use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::AppState;

/// Identity established by the external provider. The id is opaque to this
/// service; it is only ever used as a key.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

/// Claims of the identity provider's access token. Providers put more in
/// here; only what the service needs is deserialized.
#[derive(Debug, Deserialize)]
struct IdentityClaims {
    sub: String,
    email: Option<String>,
    #[allow(dead_code)]
    exp: i64,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok());

        let Some(token) = auth_header.and_then(|header| header.strip_prefix("Bearer ")) else {
            return Err(unauthorized("Authentication required"));
        };

        let mut validation = Validation::new(Algorithm::HS256);
        // The provider scopes `aud` per project; the shared secret is the
        // trust anchor here.
        validation.validate_aud = false;

        let claims = decode::<IdentityClaims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|_| unauthorized("Invalid or expired token"))?
        .claims;

        Ok(AuthenticatedUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": message, "status": 401})),
    )
        .into_response()
}
