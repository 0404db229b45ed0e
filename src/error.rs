//! Error types for request handling.
//!
//! Only failures of the collaborators surface here. Unknown actions, bad
//! tokens and missing enrollment are answered directly by the dispatcher and
//! the session resolver and never become an `AppError`.

use crate::render::RenderError;
use crate::student::StoreError;

/// Failure while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Student persistence failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Template rendering failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a page or REST handler.
pub type HandlerResult = Result<crate::http::HttpResponse, AppError>;
