use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::password;
use crate::auth::repo::{self, NewUser};
use crate::auth::repo_types::{ProfileChanges, User};
use crate::auth::sessions::Session;
use crate::error::AuthError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are compared case-insensitively; every store access goes through
/// this normalization.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a new user from plaintext credentials.
pub async fn register_user(
    db: &SqlitePool,
    email: &str,
    plain_password: &str,
    full_name: &str,
    phone_number: Option<&str>,
) -> Result<User, AuthError> {
    let email = normalize_email(email);
    let password_hash = password::hash_password(plain_password)?;
    let user = repo::create(
        db,
        NewUser {
            email: &email,
            password_hash: &password_hash,
            full_name,
            phone_number,
        },
    )
    .await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Verify credentials and return the account.
///
/// Unknown email and wrong password are indistinguishable to the caller; the
/// disabled-account check only runs after the password has been verified.
pub async fn authenticate(db: &SqlitePool, email: &str, plain_password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email);
    let user = match repo::find_by_email(db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login with unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !password::verify_password(plain_password, &user.password_hash) {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(AuthError::AccountDisabled);
    }

    info!(user_id = %user.id, "user authenticated");
    Ok(user)
}

/// Mint an opaque session for the user, replacing any previous one.
pub async fn open_session(db: &SqlitePool, user: &User, ttl: Duration) -> Result<Session, AuthError> {
    Session::replace_for_user(db, user.id, ttl).await
}

/// Map a presented session token back to its user.
///
/// The sole authority for "is this caller this user" in the stateful shape:
/// unknown tokens are rejected, expired rows are lazily purged, and the
/// owning account must still be active.
pub async fn resolve_session(db: &SqlitePool, token: &str) -> Result<User, AuthError> {
    let session = Session::find_by_token(db, token)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if session.is_expired(OffsetDateTime::now_utc()) {
        // Best effort: a failed purge must not mask the expiry itself.
        if let Err(e) = Session::delete_by_token(db, token).await {
            warn!(error = ?e, "failed to purge expired session");
        }
        return Err(AuthError::TokenExpired);
    }

    let user = repo::find_by_id(db, session.user_id)
        .await?
        .ok_or(AuthError::NotFound)?;
    if !user.is_active {
        return Err(AuthError::AccountDisabled);
    }
    Ok(user)
}

/// Drop the session row for the token. Unknown tokens are a no-op: logout is
/// idempotent.
pub async fn close_session(db: &SqlitePool, token: &str) -> Result<(), AuthError> {
    let removed = Session::delete_by_token(db, token).await?;
    if removed > 0 {
        info!("session closed");
    }
    Ok(())
}

/// Apply profile changes for an identity already produced by a resolver.
pub async fn update_profile(
    db: &SqlitePool,
    user: &User,
    changes: &ProfileChanges,
) -> Result<User, AuthError> {
    let updated = repo::update_profile(db, user.id, changes).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    const PW: &str = "pw123-long-enough";

    async fn register_alice(db: &SqlitePool) -> User {
        register_user(db, "alice@x.com", PW, "Alice", None)
            .await
            .expect("register")
    }

    #[test]
    fn email_validation_and_normalization() {
        assert!(is_valid_email("alice@x.com"));
        assert!(!is_valid_email("alice@x"));
        assert!(!is_valid_email("not-an-email"));
        assert_eq!(normalize_email("  Alice@X.Com "), "alice@x.com");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = test_state().await;
        register_alice(&state.db).await;

        let err = authenticate(&state.db, "alice@x.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = authenticate(&state.db, "stranger@x.com", PW)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_matches_email_case_insensitively() {
        let state = test_state().await;
        let registered = register_alice(&state.db).await;
        let user = authenticate(&state.db, " ALICE@X.COM ", PW)
            .await
            .expect("authenticate");
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let state = test_state().await;
        let user = register_alice(&state.db).await;
        repo::set_active(&state.db, user.id, false)
            .await
            .expect("disable");

        let err = authenticate(&state.db, "alice@x.com", PW).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn second_login_invalidates_the_first_session() {
        let state = test_state().await;
        let user = register_alice(&state.db).await;
        let ttl = Duration::days(30);

        let first = open_session(&state.db, &user, ttl).await.expect("first");
        let second = open_session(&state.db, &user, ttl).await.expect("second");

        let err = resolve_session(&state.db, &first.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        let resolved = resolve_session(&state.db, &second.session_token)
            .await
            .expect("resolve");
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.full_name, "Alice");
    }

    #[tokio::test]
    async fn expired_session_is_purged_on_resolve() {
        let state = test_state().await;
        let user = register_alice(&state.db).await;

        let session = open_session(&state.db, &user, Duration::seconds(-60))
            .await
            .expect("session");

        let err = resolve_session(&state.db, &session.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));

        // The lazy purge removed the row, so a second attempt no longer
        // finds a session at all.
        let err = resolve_session(&state.db, &session.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn resolve_rejects_unknown_token_and_disabled_account() {
        let state = test_state().await;
        let user = register_alice(&state.db).await;
        let session = open_session(&state.db, &user, Duration::days(30))
            .await
            .expect("session");

        let err = resolve_session(&state.db, "no-such-token").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        repo::set_active(&state.db, user.id, false)
            .await
            .expect("disable");
        let err = resolve_session(&state.db, &session.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn closed_session_no_longer_resolves() {
        let state = test_state().await;
        let user = register_alice(&state.db).await;
        let session = open_session(&state.db, &user, Duration::days(30))
            .await
            .expect("session");

        close_session(&state.db, &session.session_token)
            .await
            .expect("logout");
        // Closing again is fine.
        close_session(&state.db, &session.session_token)
            .await
            .expect("logout twice");

        let err = resolve_session(&state.db, &session.session_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn profile_update_is_visible_on_next_resolve() {
        let state = test_state().await;
        let user = register_alice(&state.db).await;
        let session = open_session(&state.db, &user, Duration::days(30))
            .await
            .expect("session");

        // Only disallowed fields requested: nothing to apply.
        let err = update_profile(&state.db, &user, &ProfileChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoValidFields));

        let changes = ProfileChanges {
            phone_number: Some("+1".into()),
            ..Default::default()
        };
        update_profile(&state.db, &user, &changes)
            .await
            .expect("update");

        let resolved = resolve_session(&state.db, &session.session_token)
            .await
            .expect("resolve");
        assert_eq!(resolved.phone_number.as_deref(), Some("+1"));
    }
}
