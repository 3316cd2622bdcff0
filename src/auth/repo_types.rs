use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                              // unique user ID, immutable
    pub email: String,                         // unique, stored lowercase
    #[serde(skip_serializing)]
    pub password_hash: String,                 // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub phone_number: Option<String>,
    pub profile_picture_path: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Profile fields a user may change about themselves.
///
/// Anything outside this set (email, password hash, active flag) is ignored
/// by deserialization, so a request carrying only disallowed keys arrives
/// here empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_path: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone_number.is_none()
            && self.profile_picture_path.is_none()
    }
}
