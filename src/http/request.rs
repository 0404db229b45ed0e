//! Request parsing module
//!
//! Collects everything handlers read from an inbound request into an owned
//! `RequestInfo`: query parameters, urlencoded form fields, headers and the raw body.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE, HOST};
use hyper::{Method, Request};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to collect a request body
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to read request body: {0}")]
    Read(BoxError),
}

/// Owned view of an HTTP request
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    query_params: Vec<(String, String)>,
    form_params: Vec<(String, String)>,
}

impl RequestInfo {
    /// Build from method and a `path?query` target, without headers or body
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };
        let query_params = query.as_deref().map(parse_urlencoded).unwrap_or_default();
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query_params,
            form_params: Vec::new(),
        }
    }

    /// Read the whole request, collecting at most `max_body_size` body bytes
    pub async fn from_hyper<B>(req: Request<B>, max_body_size: usize) -> Result<Self, BodyError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        let body = match Limited::new(body, max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => return Err(BodyError::TooLarge(max_body_size)),
            Err(e) => return Err(BodyError::Read(e)),
        };

        let mut info = Self::new(parts.method, &target);
        info.headers = parts.headers;
        info.set_body(body);
        Ok(info)
    }

    fn set_body(&mut self, body: Bytes) {
        self.form_params = if self.is_form() {
            std::str::from_utf8(&body)
                .map(parse_urlencoded)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        self.body = body;
    }

    fn is_form(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    /// Path plus query string, as the client requested it
    pub fn uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// First value of a parameter, form fields before query parameters
    pub fn get(&self, name: &str) -> Option<&str> {
        self.form_params
            .iter()
            .chain(&self.query_params)
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a parameter, form fields before query parameters
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.form_params
            .iter()
            .chain(&self.query_params)
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has_form_field(&self, name: &str) -> bool {
        self.form_params.iter().any(|(k, _)| k == name)
    }

    pub fn form_fields(&self) -> &[(String, String)] {
        &self.form_params
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Scheme the client used, honouring `X-Forwarded-Proto`
    pub fn scheme(&self) -> &str {
        self.header("x-forwarded-proto").unwrap_or("http")
    }

    pub fn host(&self) -> &str {
        self.header(HOST.as_str()).unwrap_or("localhost")
    }
}

// Builders for unit tests
#[cfg(test)]
impl RequestInfo {
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = hyper::header::HeaderValue::from_str(value) {
            self.headers.insert(hyper::header::HeaderName::from_static(name), value);
        }
        self
    }

    /// Attach a urlencoded form body
    #[must_use]
    pub fn with_form(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = serde_urlencoded::to_string(fields).unwrap_or_default();
        self.headers.insert(
            CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.set_body(Bytes::from(encoded));
        self
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
        self.set_body(Bytes::from(body.to_string()));
        self
    }
}

fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(input).unwrap_or_default()
}
