//! REST handlers
//!
//! Requests carry `{"key", "xsrf_token", "payload"}` as a JSON body or as a
//! urlencoded `request` field. Responses are XSSI-guarded JSON shaped
//! `{"status", "message", "payload"}` whose HTTP status mirrors `status`.

use hyper::StatusCode;
use serde_json::{json, Value};

use super::pages::STUDENT_EDIT_ACTION;
use crate::config::{AppState, CourseSite};
use crate::error::HandlerResult;
use crate::http::{self, HttpResponse, RequestInfo};

pub const STUDENT_NAME_PATH: &str = "/rest/student/name";

const BAD_TOKEN_MESSAGE: &str = "Bad XSRF token. Please reload the page and try again";

#[derive(Debug, Default)]
struct RestRequest {
    /// Entity key echoed back so the client can reconcile its state; any
    /// JSON value, numeric datastore ids included
    key: Option<Value>,
    xsrf_token: Option<String>,
    payload: Value,
}

impl RestRequest {
    /// Fields are read one by one, so an odd `key` never costs the token.
    /// Unreadable requests parse as empty and fail the token check.
    fn parse(request: &RequestInfo) -> Self {
        let raw = match request.get("request") {
            Some(field) if request.has_form_field("request") => field.as_bytes(),
            _ => request.body.as_ref(),
        };
        let Ok(Value::Object(envelope)) = serde_json::from_slice::<Value>(raw) else {
            return Self::default();
        };
        Self {
            key: envelope.get("key").filter(|key| !key.is_null()).cloned(),
            xsrf_token: envelope
                .get("xsrf_token")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            payload: envelope.get("payload").cloned().unwrap_or_default(),
        }
    }

    fn key_payload(&self) -> Option<Value> {
        self.key.as_ref().map(|key| json!({ "key": key }))
    }
}

pub fn json_response(status: StatusCode, message: &str, payload: Option<Value>) -> HttpResponse {
    let mut body = json!({ "status": status.as_u16(), "message": message });
    if let Some(payload) = payload {
        body["payload"] = payload;
    }
    http::build_json_response(status, &body)
}

/// Validation failure with an optional entity key
pub fn validation_error(message: &str, key: Option<Value>) -> HttpResponse {
    json_response(StatusCode::PRECONDITION_FAILED, message, key)
}

/// Rename the signed-in student
pub fn put_student_name(state: &AppState, site: &CourseSite, request: &RequestInfo) -> HandlerResult {
    let rest = RestRequest::parse(request);
    let identity = state.auth.current_identity(request);
    let subject = identity.as_ref().map_or("", |id| id.user_id.as_str());

    if !state
        .tokens
        .validate(rest.xsrf_token.as_deref(), subject, STUDENT_EDIT_ACTION)
    {
        tracing::warn!(path = STUDENT_NAME_PATH, "rejected REST write with bad anti-forgery token");
        return Ok(validation_error(BAD_TOKEN_MESSAGE, rest.key_payload()));
    }

    let record = match &identity {
        Some(identity) => site.students.find_enrolled_by_email(&identity.email)?,
        None => None,
    };
    let Some(record) = record else {
        return Ok(json_response(
            StatusCode::UNAUTHORIZED,
            "Access denied.",
            rest.key_payload(),
        ));
    };

    let name = rest
        .payload
        .get("name")
        .and_then(Value::as_str)
        .map_or("", str::trim);
    if name.is_empty() {
        return Ok(validation_error("Name must not be empty.", rest.key_payload()));
    }

    let updated = site.students.rename(&record.email, name)?;
    Ok(json_response(
        StatusCode::OK,
        "Saved.",
        Some(json!({ "name": updated.name })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::http::JSON_XSSI_PREFIX;
    use crate::student::StudentStore;
    use crate::testing::{fixture, signed_in, Fixture};
    use http_body_util::BodyExt;
    use hyper::Method;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = std::str::from_utf8(&bytes).unwrap();
        let json = text.strip_prefix(JSON_XSSI_PREFIX).unwrap();
        serde_json::from_str(json).unwrap()
    }

    fn enrolled_fixture() -> Fixture {
        let fx = fixture(false);
        fx.store
            .add_new_student(&Identity::new("42", "ada@example.com"), "Ada", "")
            .unwrap();
        fx
    }

    fn request(body: &Value) -> RequestInfo {
        signed_in(Method::POST, "/physics/rest/student/name", "42", "ada@example.com")
            .with_json(body)
    }

    #[tokio::test]
    async fn test_rename_succeeds() {
        let fx = enrolled_fixture();
        let token = fx.state.tokens.issue("42", STUDENT_EDIT_ACTION);
        let req = request(&json!({"xsrf_token": token, "payload": {"name": " Countess "}}));

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], 200);
        assert_eq!(body["payload"]["name"], "Countess");
        let stored = fx.store.find_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(stored.name, "Countess");
    }

    #[tokio::test]
    async fn test_bad_token_is_412_with_key() {
        let fx = enrolled_fixture();
        let token = fx.state.tokens.issue("42", "register-post");
        let req = request(&json!({"key": "student-1", "xsrf_token": token, "payload": {"name": "X"}}));

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let body = body_json(response).await;
        assert_eq!(body["status"], 412);
        assert_eq!(body["message"], BAD_TOKEN_MESSAGE);
        assert_eq!(body["payload"], json!({"key": "student-1"}));
        let stored = fx.store.find_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(stored.name, "Ada");
    }

    #[tokio::test]
    async fn test_numeric_key_keeps_token() {
        let fx = enrolled_fixture();
        let token = fx.state.tokens.issue("42", STUDENT_EDIT_ACTION);
        let req = request(&json!({"key": 7, "xsrf_token": token, "payload": {"name": "Lovelace"}}));

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["payload"]["name"], "Lovelace");
        let stored = fx.store.find_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(stored.name, "Lovelace");
    }

    #[tokio::test]
    async fn test_numeric_key_echoed_on_bad_token() {
        let fx = enrolled_fixture();
        let req = request(&json!({"key": 7, "xsrf_token": "stale", "payload": {"name": "X"}}));

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], 412);
        assert_eq!(body["payload"], json!({"key": 7}));
    }

    #[tokio::test]
    async fn test_malformed_body_fails_token_check() {
        let fx = enrolled_fixture();
        let req = signed_in(Method::POST, "/physics/rest/student/name", "42", "ada@example.com");

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], 412);
        assert!(body.get("payload").is_none());
    }

    #[tokio::test]
    async fn test_empty_name_is_validation_error() {
        let fx = enrolled_fixture();
        let token = fx.state.tokens.issue("42", STUDENT_EDIT_ACTION);
        let req = request(&json!({"xsrf_token": token, "payload": {"name": "  "}}));

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], 412);
        assert_eq!(body["message"], "Name must not be empty.");
    }

    #[tokio::test]
    async fn test_request_form_field() {
        let fx = enrolled_fixture();
        let token = fx.state.tokens.issue("42", STUDENT_EDIT_ACTION);
        let envelope = json!({"xsrf_token": token, "payload": {"name": "Lovelace"}}).to_string();
        let req = signed_in(Method::POST, "/physics/rest/student/name", "42", "ada@example.com")
            .with_form(&[("request", envelope.as_str())]);

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_enrolled_is_denied() {
        let fx = fixture(false);
        let token = fx.state.tokens.issue("42", STUDENT_EDIT_ACTION);
        let req = request(&json!({"xsrf_token": token, "payload": {"name": "Ada"}}));

        let response = put_student_name(&fx.state, &fx.site, &req).unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Access denied.");
    }
}
