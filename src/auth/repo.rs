use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{ProfileChanges, User};
use crate::error::AuthError;

/// Find a user by (normalized) email.
pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, AuthError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, full_name, phone_number,
               profile_picture_path, is_active, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_id(db: &SqlitePool, user_id: Uuid) -> Result<Option<User>, AuthError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, full_name, phone_number,
               profile_picture_path, is_active, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub phone_number: Option<&'a str>,
}

/// Create a new user with an already-hashed password.
///
/// Uniqueness of the email is enforced by the store itself; a concurrent
/// second writer gets `DuplicateEmail` from the constraint, not from a
/// read-then-write race.
pub async fn create(db: &SqlitePool, new: NewUser<'_>) -> Result<User, AuthError> {
    let now = OffsetDateTime::now_utc();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, phone_number, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id, email, password_hash, full_name, phone_number,
                  profile_picture_path, is_active, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.full_name)
    .bind(new.phone_number)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Apply whitelisted profile changes plus a refreshed `updated_at` as one
/// UPDATE statement.
pub async fn update_profile(
    db: &SqlitePool,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> Result<User, AuthError> {
    if changes.is_empty() {
        return Err(AuthError::NoValidFields);
    }

    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE users SET ");
    let mut fields = builder.separated(", ");
    if let Some(full_name) = &changes.full_name {
        fields.push("full_name = ");
        fields.push_bind_unseparated(full_name);
    }
    if let Some(phone_number) = &changes.phone_number {
        fields.push("phone_number = ");
        fields.push_bind_unseparated(phone_number);
    }
    if let Some(path) = &changes.profile_picture_path {
        fields.push("profile_picture_path = ");
        fields.push_bind_unseparated(path);
    }
    fields.push("updated_at = ");
    fields.push_bind_unseparated(OffsetDateTime::now_utc());
    builder.push(" WHERE id = ");
    builder.push_bind(user_id);

    let result = builder.build().execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(AuthError::NotFound);
    }

    find_by_id(db, user_id).await?.ok_or(AuthError::NotFound)
}

/// Administrative switch for the account's active flag.
pub async fn set_active(db: &SqlitePool, user_id: Uuid, active: bool) -> Result<(), AuthError> {
    let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(OffsetDateTime::now_utc())
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AuthError::NotFound);
    }
    Ok(())
}
