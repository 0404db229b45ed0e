//! Authentication context
//!
//! The portal does not authenticate users itself. A fronting proxy asserts
//! the signed-in user through request headers and serves the login and
//! logout pages; this module reads those headers and builds the URLs.

use crate::config::AuthConfig;
use crate::http::RequestInfo;

/// Authenticated external user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable id assigned by the identity provider
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// Source of the current identity and of login/logout URLs
pub trait AuthContext: Send + Sync {
    /// Identity of the user behind `request`, `None` when anonymous
    fn current_identity(&self, request: &RequestInfo) -> Option<Identity>;

    /// URL that signs the user in and returns to `dest`
    fn login_url(&self, dest: &str) -> String;

    /// URL that signs the user out and returns to `dest`
    fn logout_url(&self, dest: &str) -> String;
}

/// Reads identity headers set by an authenticating reverse proxy
pub struct HeaderAuthContext {
    user_id_header: String,
    email_header: String,
    login_path: String,
    logout_path: String,
}

impl HeaderAuthContext {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            user_id_header: config.user_id_header.to_ascii_lowercase(),
            email_header: config.email_header.to_ascii_lowercase(),
            login_path: config.login_path.clone(),
            logout_path: config.logout_path.clone(),
        }
    }

    fn with_continue(path: &str, dest: &str) -> String {
        let query = serde_urlencoded::to_string([("continue", dest)]).unwrap_or_default();
        format!("{path}?{query}")
    }
}

impl AuthContext for HeaderAuthContext {
    fn current_identity(&self, request: &RequestInfo) -> Option<Identity> {
        let user_id = request.header(&self.user_id_header)?.trim();
        let email = request.header(&self.email_header)?.trim();
        if user_id.is_empty() || email.is_empty() {
            return None;
        }
        Some(Identity::new(user_id, email))
    }

    fn login_url(&self, dest: &str) -> String {
        Self::with_continue(&self.login_path, dest)
    }

    fn logout_url(&self, dest: &str) -> String {
        Self::with_continue(&self.logout_path, dest)
    }
}
