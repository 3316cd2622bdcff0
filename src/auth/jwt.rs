use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{error::AuthError, state::AppState};

/// JWT payload for the stateless token shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user email
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
}

/// Holds signing and verification keys together with token settings.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let token = &state.config.token;
        Self {
            encoding: EncodingKey::from_secret(token.secret.as_bytes()),
            decoding: DecodingKey::from_secret(token.secret.as_bytes()),
            algorithm: token.algorithm,
            access_ttl: Duration::from_secs((token.access_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_ttl(&self, email: &str, ttl: TimeDuration) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(AuthError::Signing)?;
        debug!(email = %email, "jwt signed");
        Ok(token)
    }

    /// Issue an access token for the given subject.
    pub fn sign(&self, email: &str) -> Result<String, AuthError> {
        self.sign_with_ttl(email, TimeDuration::seconds(self.access_ttl.as_secs() as i64))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// Expiry is checked with zero leeway so an expired token is rejected
    /// the moment its `exp` passes.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;
        debug!(email = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            access_ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("alice@x.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "alice@x.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let token = keys
            .sign_with_ttl("alice@x.com", TimeDuration::seconds(-60))
            .expect("sign");
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("alice@x.com").expect("sign");
        // Corrupt the first byte of the payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = parts[1].clone();
        parts[1] = format!(
            "{}{}",
            if payload.starts_with('e') { "f" } else { "e" },
            &payload[1..]
        );
        let tampered = parts.join(".");
        let err = keys.verify(&tampered).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn verify_rejects_garbage_and_foreign_secret() {
        let keys = make_keys("dev-secret");
        assert!(matches!(
            keys.verify("not-a-jwt").unwrap_err(),
            AuthError::InvalidToken
        ));

        let other = make_keys("another-secret");
        let token = other.sign("alice@x.com").expect("sign");
        assert!(matches!(
            keys.verify(&token).unwrap_err(),
            AuthError::InvalidToken
        ));
    }
}
