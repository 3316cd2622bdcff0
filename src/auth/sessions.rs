use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::{FromRow, SqlitePool};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

/// Length of an opaque session token, ~256 bits of alphanumeric entropy.
pub const SESSION_TOKEN_LEN: usize = 43;

/// Session record in the database, keyed by its opaque token.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_token: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Generate an unguessable fixed-length session token from the OS RNG.
pub fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

impl Session {
    /// Replace any existing sessions for the user with a single fresh one.
    ///
    /// Delete and insert run in one transaction: a concurrent resolver sees
    /// either the old session or the new one, never neither or both.
    pub async fn replace_for_user(
        db: &SqlitePool,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<Session, AuthError> {
        let token = generate_token();
        let now = OffsetDateTime::now_utc();

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO user_sessions (id, user_id, session_token, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, session_token, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&token)
        .bind(now + ttl)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(user_id = %user_id, "session replaced");
        Ok(session)
    }

    pub async fn find_by_token(
        db: &SqlitePool,
        token: &str,
    ) -> Result<Option<Session>, AuthError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, session_token, expires_at, created_at
            FROM user_sessions
            WHERE session_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }

    /// Delete a session by its token. Returns how many rows were removed.
    pub async fn delete_by_token(db: &SqlitePool, token: &str) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE session_token = ?")
            .bind(token)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{self, NewUser};
    use crate::state::test_state;

    #[test]
    fn generated_tokens_are_fixed_length_and_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_eq!(first.len(), SESSION_TOKEN_LEN);
        assert_eq!(second.len(), SESSION_TOKEN_LEN);
        assert_ne!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn replace_keeps_a_single_session_per_user() {
        let state = test_state().await;
        let user = repo::create(
            &state.db,
            NewUser {
                email: "bob@x.com",
                password_hash: "hash",
                full_name: "Bob",
                phone_number: None,
            },
        )
        .await
        .expect("create user");

        let first = Session::replace_for_user(&state.db, user.id, Duration::days(30))
            .await
            .expect("first session");
        let second = Session::replace_for_user(&state.db, user.id, Duration::days(30))
            .await
            .expect("second session");
        assert_ne!(first.session_token, second.session_token);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(&state.db)
            .await
            .expect("count sessions");
        assert_eq!(count, 1);

        assert!(Session::find_by_token(&state.db, &first.session_token)
            .await
            .expect("lookup")
            .is_none());
        assert!(Session::find_by_token(&state.db, &second.session_token)
            .await
            .expect("lookup")
            .is_some());
    }
}
