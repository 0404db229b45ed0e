//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method and size checks, course
//! resolution, then the REST endpoint or the page dispatcher.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::pages::{self, PageRequest};
use super::rest;
use crate::config::AppState;
use crate::http::{self, BodyError, HttpResponse, RequestInfo};
use crate::logger::{self, AccessLogEntry};
use crate::routing;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let is_head = *req.method() == Method::HEAD;

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method()) {
        return Ok(resp);
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }

    // 3. Collect the body, which may be chunked and carry no Content-Length
    let limit = usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX);
    let request = match RequestInfo::from_hyper(req, limit).await {
        Ok(request) => request,
        Err(BodyError::TooLarge(max_body_size)) => {
            tracing::warn!(max_body_size, %remote_addr, "request body too large");
            return Ok(http::build_413_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, %remote_addr, "failed to read request body");
            return Ok(http::build_500_response());
        }
    };

    let mut entry = state.config.logging.access_log.then(|| {
        let mut entry = AccessLogEntry::from_request(remote_addr.ip().to_string(), &request);
        entry.user_id = state
            .auth
            .current_identity(&request)
            .map(|identity| identity.user_id);
        entry
    });

    // 4. Route and serve
    let mut response = serve(&state, request);
    if is_head {
        *response.body_mut() = Full::new(Bytes::new());
    }
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = body_len(&response);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route a collected request to its course and serve it
pub fn serve(state: &Arc<AppState>, request: RequestInfo) -> HttpResponse {
    let Some((site, page_path)) = routing::resolve_course(&request.path, &state.sites) else {
        tracing::debug!(path = %request.path, "no course mounted at path");
        return http::build_404_response();
    };
    let page_path = page_path.to_string();

    let result = if page_path == rest::STUDENT_NAME_PATH {
        if request.method == Method::POST {
            rest::put_student_name(state, &site, &request)
        } else {
            Ok(http::build_405_response())
        }
    } else {
        let page = PageRequest::new(Arc::clone(state), Arc::clone(&site), request);
        pages::handle_page(page, &page_path)
    };

    result.unwrap_or_else(|e| {
        tracing::error!(course = %site.slug, page = %page_path, error = %e, "request failed");
        http::build_500_response()
    })
}

/// Only GET, HEAD and POST reach the course handlers
fn check_http_method(method: &Method) -> Option<HttpResponse> {
    match *method {
        Method::GET | Method::HEAD | Method::POST => None,
        _ => {
            tracing::warn!(%method, "method not allowed");
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            tracing::warn!("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                tracing::warn!(size, max_body_size, "request body too large");
                Some(http::build_413_response())
            }
            Err(_) => {
                tracing::warn!(
                    content_length = size_str,
                    "invalid Content-Length value, skipping size check"
                );
                None
            }
            _ => None,
        },
    )
}

fn body_len(response: &HttpResponse) -> usize {
    use hyper::body::Body;
    usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(usize::MAX)
}
