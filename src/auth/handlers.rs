use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest, UserProfile,
};
use crate::auth::extractors::AuthSubject;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo;
use crate::auth::repo_types::{ProfileChanges, User};
use crate::auth::services;
use crate::error::AuthError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile).put(update_profile))
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if !services::is_valid_email(email) {
        return Err(AuthError::Validation("invalid email address".into()));
    }
    if password.len() < 8 {
        return Err(AuthError::Validation("password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let email = services::normalize_email(&payload.email);
    validate_credentials(&email, &payload.password)?;

    let user = services::register_user(&state.db, &email, &payload.password, &payload.name, None)
        .await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(&user.email)?;
    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer",
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let user = services::authenticate(&state.db, &payload.email, &payload.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(&user.email)?;
    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer",
        user: PublicUser::from(&user),
    }))
}

/// The token itself proved identity; the record is re-fetched so a deleted
/// user does not keep resolving until expiry.
async fn fetch_subject(state: &AppState, email: &str) -> Result<User, AuthError> {
    repo::find_by_email(&state.db, email)
        .await?
        .ok_or(AuthError::NotFound)
}

#[instrument(skip(state, subject))]
async fn me(
    State(state): State<AppState>,
    subject: AuthSubject,
) -> Result<Json<UserProfile>, AuthError> {
    let user = fetch_subject(&state, &subject.0).await?;
    Ok(Json(UserProfile::from(user)))
}

/// Stateless tokens cannot be revoked server-side; the client discards the
/// token and it dies at its natural expiry.
async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Successfully logged out",
    })
}

#[instrument(skip(state, subject))]
async fn get_profile(
    State(state): State<AppState>,
    subject: AuthSubject,
) -> Result<Json<UserProfile>, AuthError> {
    let user = fetch_subject(&state, &subject.0).await?;
    Ok(Json(UserProfile::from(user)))
}

#[instrument(skip(state, subject, changes))]
async fn update_profile(
    State(state): State<AppState>,
    subject: AuthSubject,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<UserProfile>, AuthError> {
    let user = fetch_subject(&state, &subject.0).await?;
    let updated = services::update_profile(&state.db, &user, &changes).await?;
    Ok(Json(UserProfile::from(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_serialization() {
        let user = PublicUser {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
            is_active: true,
        };
        let response = AuthResponse {
            access_token: "abc".into(),
            token_type: "bearer",
            user,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"token_type\":\"bearer\""));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn profile_changes_ignores_unknown_fields() {
        let changes: ProfileChanges =
            serde_json::from_str(r#"{"email": "x", "full_name": "New Name"}"#).unwrap();
        assert_eq!(changes.full_name.as_deref(), Some("New Name"));
        assert!(changes.phone_number.is_none());

        let only_disallowed: ProfileChanges =
            serde_json::from_str(r#"{"email": "x", "is_active": false}"#).unwrap();
        assert!(only_disallowed.is_empty());
    }
}
