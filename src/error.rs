use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the credential and session core.
///
/// Callers pattern-match on the variant; the HTTP boundary maps each kind to
/// a status code and a stable `error` identifier in the response body.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is deactivated")]
    AccountDisabled,
    #[error("invalid session or token")]
    InvalidToken,
    #[error("session or token expired")]
    TokenExpired,
    #[error("user not found")]
    NotFound,
    #[error("no valid fields to update")]
    NoValidFields,
    #[error("{0}")]
    Validation(String),
    #[error("password hashing failed")]
    Hashing(#[source] argon2::password_hash::Error),
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("storage failure")]
    Storage(#[source] sqlx::Error),
}

impl AuthError {
    /// Stable machine-readable identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::NotFound => "not_found",
            AuthError::NoValidFields => "no_valid_fields",
            AuthError::Validation(_) => "invalid_request",
            AuthError::Hashing(_) | AuthError::Signing(_) => "internal",
            AuthError::Storage(_) => "storage_failure",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicateEmail
            | AuthError::NoValidFields
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::InvalidToken
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        // The only UNIQUE constraints in the schema are users.email and the
        // session token, so a unique violation is a duplicate registration.
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return AuthError::DuplicateEmail;
            }
        }
        AuthError::Storage(e)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
