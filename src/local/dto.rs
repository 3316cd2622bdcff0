use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Request body for user registration (local shape).
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session token passed as a query parameter by the on-device client.
#[derive(Debug, Deserialize)]
pub struct SessionTokenQuery {
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_token: String,
}

/// User payload returned by the local endpoints.
#[derive(Debug, Serialize)]
pub struct LocalUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub profile_picture_path: Option<String>,
}

impl From<User> for LocalUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone_number: user.phone_number,
            profile_picture_path: user.profile_picture_path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: LocalUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub session_token: String,
    pub user: LocalUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: LocalUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
