//! Action dispatch module
//!
//! Routes a request to a named handler based on its `action` parameter.
//! Reads and writes have separate allow-lists. Every write must carry an
//! anti-forgery token issued for that exact action; reads never need one.
//!
//! An action that is not allow-listed and an allow-listed action without a
//! bound handler both answer 404, so callers cannot tell the two apart.

use std::collections::{HashMap, HashSet};

use crate::auth::{XsrfTokenService, XSRF_TOKEN_FIELD};
use crate::error::HandlerResult;
use crate::http;

/// Request parameter naming the action
pub const ACTION_FIELD: &str = "action";

/// What the dispatcher needs to know about a request
pub trait ActionRequest {
    /// First value of a request parameter
    fn param(&self, name: &str) -> Option<&str>;

    /// Subject the anti-forgery token must be bound to
    fn token_subject(&self) -> String;
}

/// Handler bound to an action name
pub type ActionFn<C> = fn(&mut C) -> HandlerResult;

/// Explicit action-name to handler mapping for one page
pub struct ActionDispatcher<C> {
    default_action: String,
    get_actions: HashSet<String>,
    post_actions: HashSet<String>,
    get_handlers: HashMap<String, ActionFn<C>>,
    post_handlers: HashMap<String, ActionFn<C>>,
}

impl<C: ActionRequest> ActionDispatcher<C> {
    pub fn new(default_action: impl Into<String>) -> Self {
        Self {
            default_action: default_action.into(),
            get_actions: HashSet::new(),
            post_actions: HashSet::new(),
            get_handlers: HashMap::new(),
            post_handlers: HashMap::new(),
        }
    }

    /// Allow-list a read action and bind its handler
    #[must_use]
    pub fn on_get(self, action: &str, handler: ActionFn<C>) -> Self {
        self.allow_get(action).bind_get(action, handler)
    }

    /// Allow-list a write action and bind its handler
    #[must_use]
    pub fn on_post(self, action: &str, handler: ActionFn<C>) -> Self {
        self.allow_post(action).bind_post(action, handler)
    }

    #[must_use]
    pub fn allow_get(mut self, action: &str) -> Self {
        self.get_actions.insert(action.to_string());
        self
    }

    #[must_use]
    pub fn allow_post(mut self, action: &str) -> Self {
        self.post_actions.insert(action.to_string());
        self
    }

    #[must_use]
    pub fn bind_get(mut self, action: &str, handler: ActionFn<C>) -> Self {
        self.get_handlers.insert(action.to_string(), handler);
        self
    }

    #[must_use]
    pub fn bind_post(mut self, action: &str, handler: ActionFn<C>) -> Self {
        self.post_handlers.insert(action.to_string(), handler);
        self
    }

    /// Handle a read request
    ///
    /// A missing or empty `action` falls back to the default action.
    pub fn dispatch_get(&self, request: &mut C) -> HandlerResult {
        let action = match request.param(ACTION_FIELD) {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => self.default_action.clone(),
        };

        if !self.get_actions.contains(&action) {
            tracing::debug!(action, "read action not allowed");
            return Ok(http::build_404_response());
        }
        let Some(handler) = self.get_handlers.get(&action) else {
            tracing::debug!(action, "no handler bound for read action");
            return Ok(http::build_404_response());
        };

        handler(request)
    }

    /// Handle a write request
    ///
    /// The action is mandatory and the request's token must have been issued
    /// for it.
    pub fn dispatch_post(&self, request: &mut C, tokens: &XsrfTokenService) -> HandlerResult {
        let action = match request.param(ACTION_FIELD) {
            Some(a) if self.post_actions.contains(a) => a.to_string(),
            other => {
                tracing::debug!(action = ?other, "write action missing or not allowed");
                return Ok(http::build_404_response());
            }
        };
        let Some(handler) = self.post_handlers.get(&action) else {
            tracing::debug!(action, "no handler bound for write action");
            return Ok(http::build_404_response());
        };

        let subject = request.token_subject();
        if !tokens.validate(request.param(XSRF_TOKEN_FIELD), &subject, &action) {
            tracing::warn!(action, "rejected write with bad anti-forgery token");
            return Ok(http::build_403_response());
        }

        handler(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    struct FakeRequest {
        params: Vec<(&'static str, String)>,
        called: Vec<&'static str>,
    }

    impl FakeRequest {
        fn new(params: &[(&'static str, &str)]) -> Self {
            Self {
                params: params.iter().map(|(k, v)| (*k, (*v).to_string())).collect(),
                called: Vec::new(),
            }
        }
    }

    impl ActionRequest for FakeRequest {
        fn param(&self, name: &str) -> Option<&str> {
            self.params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        }

        fn token_subject(&self) -> String {
            "user-1".to_string()
        }
    }

    fn get_list(req: &mut FakeRequest) -> HandlerResult {
        req.called.push("get_list");
        Ok(http::build_html_response("list".to_string()))
    }

    fn get_edit(req: &mut FakeRequest) -> HandlerResult {
        req.called.push("get_edit");
        Ok(http::build_html_response("edit".to_string()))
    }

    fn post_save(req: &mut FakeRequest) -> HandlerResult {
        req.called.push("post_save");
        Ok(http::build_redirect_response("/saved"))
    }

    fn post_delete(req: &mut FakeRequest) -> HandlerResult {
        req.called.push("post_delete");
        Ok(http::build_redirect_response("/deleted"))
    }

    fn dispatcher() -> ActionDispatcher<FakeRequest> {
        ActionDispatcher::new("list")
            .on_get("list", get_list)
            .on_get("edit", get_edit)
            .allow_get("orphan")
            .bind_get("hidden", get_edit)
            .on_post("save", post_save)
            .allow_post("orphan")
            .bind_post("delete", post_delete)
    }

    fn tokens() -> XsrfTokenService {
        XsrfTokenService::new(b"dispatch-secret".to_vec(), 3600)
    }

    #[test]
    fn test_get_defaults_to_default_action() {
        let mut req = FakeRequest::new(&[]);
        let resp = dispatcher().dispatch_get(&mut req).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(req.called, vec!["get_list"]);

        let mut empty = FakeRequest::new(&[("action", "")]);
        dispatcher().dispatch_get(&mut empty).unwrap();
        assert_eq!(empty.called, vec!["get_list"]);
    }

    #[test]
    fn test_get_named_action() {
        let mut req = FakeRequest::new(&[("action", "edit")]);
        dispatcher().dispatch_get(&mut req).unwrap();
        assert_eq!(req.called, vec!["get_edit"]);
    }

    #[test]
    fn test_get_unknown_or_unbound_action_is_not_found() {
        for action in ["missing", "orphan", "hidden", "save"] {
            let mut req = FakeRequest::new(&[("action", action)]);
            let resp = dispatcher().dispatch_get(&mut req).unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "action {action}");
            assert!(req.called.is_empty(), "action {action}");
        }
    }

    #[test]
    fn test_post_requires_action() {
        let tokens = tokens();
        let token = tokens.issue("user-1", "list");
        let mut req = FakeRequest::new(&[("xsrf_token", token.as_str())]);
        let resp = dispatcher().dispatch_post(&mut req, &tokens).unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(req.called.is_empty());
    }

    #[test]
    fn test_post_action_not_allowed_is_not_found() {
        let tokens = tokens();
        for action in ["delete", "edit", "list", "orphan", "bogus"] {
            let token = tokens.issue("user-1", action);
            let mut req = FakeRequest::new(&[("action", action), ("xsrf_token", token.as_str())]);
            let resp = dispatcher().dispatch_post(&mut req, &tokens).unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "action {action}");
            assert!(req.called.is_empty(), "action {action}");
        }
    }

    #[test]
    fn test_post_with_token_for_other_action_is_forbidden() {
        let tokens = tokens();
        let token = tokens.issue("user-1", "delete");
        let mut req = FakeRequest::new(&[("action", "save"), ("xsrf_token", token.as_str())]);
        let resp = dispatcher().dispatch_post(&mut req, &tokens).unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(req.called.is_empty());
    }

    #[test]
    fn test_post_without_token_is_forbidden() {
        let tokens = tokens();
        let mut req = FakeRequest::new(&[("action", "save")]);
        let resp = dispatcher().dispatch_post(&mut req, &tokens).unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(req.called.is_empty());
    }

    #[test]
    fn test_post_with_valid_token_invokes_handler() {
        let tokens = tokens();
        let token = tokens.issue("user-1", "save");
        let mut req = FakeRequest::new(&[("action", "save"), ("xsrf_token", token.as_str())]);
        let resp = dispatcher().dispatch_post(&mut req, &tokens).unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(req.called, vec!["post_save"]);
    }
}
