//! Anti-forgery token service
//!
//! Tokens have the form `<issued_on>/<digest>` where `issued_on` is a unix
//! timestamp in seconds and `digest` is the URL-safe base64 HMAC-SHA256 of
//! `subject:action:issued_on`. The subject is the current user id, empty for
//! anonymous visitors.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Request field carrying the token
pub const XSRF_TOKEN_FIELD: &str = "xsrf_token";

/// Issues and validates action-scoped, time-limited tokens
pub struct XsrfTokenService {
    secret: Vec<u8>,
    lifetime_secs: u64,
}

impl XsrfTokenService {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Service with a freshly generated 32-byte secret
    pub fn with_random_secret(lifetime_secs: u64) -> Self {
        let mut secret = [0_u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(secret.to_vec(), lifetime_secs)
    }

    /// Issue a token for `action` on behalf of `subject`
    pub fn issue(&self, subject: &str, action: &str) -> String {
        self.issue_at(subject, action, now_secs())
    }

    /// Check a token against `action` and `subject`
    ///
    /// Missing, malformed, forged, expired and action-mismatched tokens all
    /// yield `false` with no further detail.
    pub fn validate(&self, token: Option<&str>, subject: &str, action: &str) -> bool {
        token.is_some_and(|t| self.validate_at(t, subject, action, now_secs()))
    }

    fn issue_at(&self, subject: &str, action: &str, issued_on: u64) -> String {
        let digest = self.mac(subject, action, issued_on).finalize().into_bytes();
        format!("{issued_on}/{}", URL_SAFE_NO_PAD.encode(digest))
    }

    fn validate_at(&self, token: &str, subject: &str, action: &str, now: u64) -> bool {
        let Some((issued_on, digest)) = token.split_once('/') else {
            return false;
        };
        let Ok(issued_on) = issued_on.parse::<u64>() else {
            return false;
        };
        if issued_on.saturating_add(self.lifetime_secs) < now
            || issued_on > now.saturating_add(self.lifetime_secs)
        {
            return false;
        }
        let Ok(digest) = URL_SAFE_NO_PAD.decode(digest) else {
            return false;
        };
        self.mac(subject, action, issued_on)
            .verify_slice(&digest)
            .is_ok()
    }

    fn mac(&self, subject: &str, action: &str, issued_on: u64) -> HmacSha256 {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
        mac.update(subject.as_bytes());
        mac.update(b":");
        mac.update(action.as_bytes());
        mac.update(b":");
        mac.update(issued_on.to_string().as_bytes());
        mac
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> XsrfTokenService {
        XsrfTokenService::new(b"test-secret".to_vec(), 3600)
    }

    #[test]
    fn test_token_is_scoped_to_action() {
        let tokens = service();
        let token = tokens.issue("user-1", "register-post");
        assert!(tokens.validate(Some(&token), "user-1", "register-post"));
        assert!(!tokens.validate(Some(&token), "user-1", "student-edit"));
        assert!(!tokens.validate(Some(&token), "user-1", "register-pos"));
        assert!(!tokens.validate(Some(&token), "user-1", ""));
    }

    #[test]
    fn test_token_is_scoped_to_subject() {
        let tokens = service();
        let token = tokens.issue("user-1", "student-edit");
        assert!(!tokens.validate(Some(&token), "user-2", "student-edit"));
        assert!(!tokens.validate(Some(&token), "", "student-edit"));
    }

    #[test]
    fn test_missing_and_malformed_tokens_rejected() {
        let tokens = service();
        assert!(!tokens.validate(None, "user-1", "event-post"));
        assert!(!tokens.validate(Some(""), "user-1", "event-post"));
        assert!(!tokens.validate(Some("garbage"), "user-1", "event-post"));
        assert!(!tokens.validate(Some("abc/def"), "user-1", "event-post"));
        assert!(!tokens.validate(Some("123/!!!"), "user-1", "event-post"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let token = tokens.issue_at("user-1", "student-edit", 1_000);
        assert!(tokens.validate_at(&token, "user-1", "student-edit", 1_000 + 3600));
        assert!(!tokens.validate_at(&token, "user-1", "student-edit", 1_000 + 3601));
    }

    #[test]
    fn test_future_dated_token_rejected() {
        let tokens = service();
        let token = tokens.issue_at("user-1", "student-edit", 100_000);
        assert!(!tokens.validate_at(&token, "user-1", "student-edit", 1_000));
    }

    #[test]
    fn test_tampered_timestamp_rejected() {
        let tokens = service();
        let token = tokens.issue_at("user-1", "student-edit", 5_000);
        let (_, digest) = token.split_once('/').unwrap();
        let forged = format!("5001/{digest}");
        assert!(!tokens.validate_at(&forged, "user-1", "student-edit", 5_001));
    }

    #[test]
    fn test_different_secrets_do_not_interoperate() {
        let a = service();
        let b = XsrfTokenService::with_random_secret(3600);
        let token = a.issue("user-1", "student-edit");
        assert!(!b.validate(Some(&token), "user-1", "student-edit"));
    }
}
