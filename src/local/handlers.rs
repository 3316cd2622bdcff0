use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Json, Router,
};
use time::Duration;
use tracing::instrument;

use crate::auth::repo_types::ProfileChanges;
use crate::auth::services;
use crate::error::AuthError;
use crate::state::AppState;

use super::dto::{
    LocalUser, LoginRequest, LoginResponse, LogoutRequest, MessageResponse, ProfileResponse,
    RegisterRequest, RegisterResponse, SessionTokenQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/users/profile", put(update_profile))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AuthError> {
    if !services::is_valid_email(payload.email.trim()) {
        return Err(AuthError::Validation("invalid email address".into()));
    }
    if payload.password.len() < 8 {
        return Err(AuthError::Validation("password too short".into()));
    }

    let user = services::register_user(
        &state.db,
        &payload.email,
        &payload.password,
        &payload.full_name,
        payload.phone_number.as_deref(),
    )
    .await?;

    Ok(Json(RegisterResponse {
        message: "User registered successfully",
        user: LocalUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let user = services::authenticate(&state.db, &payload.email, &payload.password).await?;

    let ttl = Duration::days(state.config.token.session_ttl_days);
    let session = services::open_session(&state.db, &user, ttl).await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        session_token: session.session_token,
        user: LocalUser::from(user),
    }))
}

#[instrument(skip(state, query))]
async fn me(
    State(state): State<AppState>,
    Query(query): Query<SessionTokenQuery>,
) -> Result<Json<LocalUser>, AuthError> {
    let user = services::resolve_session(&state.db, &query.session_token).await?;
    Ok(Json(LocalUser::from(user)))
}

#[instrument(skip(state, payload))]
async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::close_session(&state.db, &payload.session_token).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

#[instrument(skip(state, query, changes))]
async fn update_profile(
    State(state): State<AppState>,
    Query(query): Query<SessionTokenQuery>,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<ProfileResponse>, AuthError> {
    let user = services::resolve_session(&state.db, &query.session_token).await?;
    services::update_profile(&state.db, &user, &changes).await?;

    // Re-resolve so the response reflects a session that is still live.
    let fresh = services::resolve_session(&state.db, &query.session_token).await?;
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user: LocalUser::from(fresh),
    }))
}
