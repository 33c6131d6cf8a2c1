//! Session issuer: short-lived signed access tokens bound to a user id,
//! plus opaque long-lived refresh tokens.
//!
//! Access tokens are `v1.<payload>.<sig>` where the payload is the user
//! id and expiry and the signature is HMAC-SHA256 under the server
//! secret. Refresh tokens are 32 random bytes, stored server-side (see
//! [`crate::db::UserRepository`]) and revoked on rotation.

use crate::config::AuthConfig;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Session validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session token")]
    Invalid,
    #[error("session token expired")]
    Expired,
}

/// Issues and validates session credentials.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: Vec<u8>,
    access_ttl_secs: u64,
}

impl SessionIssuer {
    /// Build an issuer from the auth configuration.
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.session_secret.as_bytes().to_vec(),
            access_ttl_secs: auth.access_ttl_secs,
        }
    }

    /// Issue a signed access token for a user.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, SessionError> {
        let expires_at = chrono::Utc::now().timestamp() + self.access_ttl_secs as i64;
        self.sign(user_id, expires_at)
    }

    fn sign(&self, user_id: Uuid, expires_at: i64) -> Result<String, SessionError> {
        let payload = format!("{user_id}:{expires_at}");
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::Invalid)?;
        mac.update(payload.as_bytes());
        let sig = mac.finalize().into_bytes();

        Ok(format!(
            "v1.{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    /// Validate an access token and return the user id it is bound to.
    pub fn validate_access(&self, token: &str) -> Result<Uuid, SessionError> {
        let mut parts = token.split('.');
        let (Some("v1"), Some(payload_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::Invalid);
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SessionError::Invalid)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| SessionError::Invalid)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::Invalid)?;
        mac.update(&payload);
        mac.verify_slice(&sig).map_err(|_| SessionError::Invalid)?;

        let payload = String::from_utf8(payload).map_err(|_| SessionError::Invalid)?;
        let (user_id, expires_at) = payload.split_once(':').ok_or(SessionError::Invalid)?;
        let user_id = Uuid::parse_str(user_id).map_err(|_| SessionError::Invalid)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| SessionError::Invalid)?;

        if expires_at <= chrono::Utc::now().timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(user_id)
    }

    /// Generate an opaque refresh token. The caller persists it.
    pub fn new_refresh_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> SessionIssuer {
        SessionIssuer {
            secret: secret.as_bytes().to_vec(),
            access_ttl_secs: 3600,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = issuer("test-secret-test-secret");
        let user_id = Uuid::new_v4();

        let token = issuer.issue_access(user_id).unwrap();
        assert_eq!(issuer.validate_access(&token).unwrap(), user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let user_id = Uuid::new_v4();
        let token = issuer("secret-one-secret-one")
            .issue_access(user_id)
            .unwrap();

        let other = issuer("secret-two-secret-two");
        assert_eq!(other.validate_access(&token), Err(SessionError::Invalid));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer("test-secret-test-secret");
        let user_id = Uuid::new_v4();

        let past = chrono::Utc::now().timestamp() - 10;
        let token = issuer.sign(user_id, past).unwrap();
        assert_eq!(issuer.validate_access(&token), Err(SessionError::Expired));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = issuer("test-secret-test-secret");
        assert_eq!(issuer.validate_access(""), Err(SessionError::Invalid));
        assert_eq!(issuer.validate_access("v1.zzz"), Err(SessionError::Invalid));
        assert_eq!(
            issuer.validate_access("v2.YQ.YQ"),
            Err(SessionError::Invalid)
        );
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let a = SessionIssuer::new_refresh_token();
        let b = SessionIssuer::new_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43); // 32 bytes, base64url without padding
    }
}
