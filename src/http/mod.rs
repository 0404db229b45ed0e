//! HTTP protocol layer module
//!
//! Request parsing and response building, decoupled from course logic.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{BodyError, RequestInfo};
pub use response::{
    build_403_response, build_404_response, build_405_response, build_413_response,
    build_500_response, build_html_response, build_json_response, build_redirect_response,
    HttpResponse,
};

#[cfg(test)]
pub use response::{redirect_location, JSON_XSSI_PREFIX};
