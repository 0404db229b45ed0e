//! Authentication module
//!
//! - Current identity and login/logout URLs
//! - Action-scoped anti-forgery tokens

mod identity;
pub mod xsrf;

pub use identity::{AuthContext, HeaderAuthContext, Identity};
pub use xsrf::{XsrfTokenService, XSRF_TOKEN_FIELD};
