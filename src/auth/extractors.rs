use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::auth::jwt::JwtKeys;
use crate::error::AuthError;
use crate::state::AppState;

/// Extracts and validates the bearer token, yielding the subject email.
///
/// Handlers re-fetch the user record themselves; possession of a valid,
/// unexpired token is the only thing this proves.
pub struct AuthSubject(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthSubject {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(AuthError::InvalidToken)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token)?;
        Ok(AuthSubject(claims.sub))
    }
}
