//! Request handler module
//!
//! Routes requests to a mounted course, then to its pages or REST endpoints.

pub mod pages;
pub mod rest;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
