use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;

/// Routes for the local (opaque session token) shape.
pub fn router() -> Router<AppState> {
    handlers::routes()
}
