//! Page context builder
//!
//! A `PageContext` is built fresh for every request. Personalization adds
//! the visitor's keys first, handlers add page data next, and the course
//! level keys are filled in right before the context is handed to the
//! renderer.

use hyper::Uri;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::Identity;
use crate::config::{AppState, CourseSite};
use crate::course::CourseService;
use crate::http::RequestInfo;
use crate::student::StudentRecord;

pub const COURSE_INFO_KEY: &str = "course_info";
pub const COURSE_BASE_KEY: &str = "gcb_course_base";

/// Token action for client-side event submission
pub const EVENT_POST_ACTION: &str = "event-post";

/// Data bag handed to the renderer
#[derive(Debug, Default, Clone)]
pub struct PageContext {
    values: Map<String, Value>,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn set_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

/// Hook run on every personalized page before any other key is set
pub trait PageInitializer: Send + Sync {
    fn initialize(&self, context: &mut PageContext);
}

/// Initializer that adds nothing
pub struct DefaultPageInitializer;

impl PageInitializer for DefaultPageInitializer {
    fn initialize(&self, _context: &mut PageContext) {}
}

/// Extra per-student data shown on the student home page
pub trait StudentDataProvider: Send + Sync {
    fn provide(&self, course: &dyn CourseService, student: &StudentRecord) -> Option<Value>;
}

/// Whether `url` carries a scheme
pub fn is_absolute(url: &str) -> bool {
    url.parse::<Uri>().is_ok_and(|uri| uri.scheme().is_some())
}

/// `<base>` href for the course: the slug with a trailing slash, made
/// absolute against the request's scheme and host
pub fn base_href(slug: &str, request: &RequestInfo) -> String {
    let mut base = slug.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    if !is_absolute(&base) {
        base = format!("{}://{}{base}", request.scheme(), request.host());
    }
    base
}

/// Prefix a relative redirect target with the course slug
///
/// Absolute URLs, targets already under the slug and the root slug are
/// left alone.
pub fn canonicalize_url(slug: &str, location: &str) -> String {
    let is_relative = !is_absolute(location) && !location.starts_with(slug);
    let has_slug = !slug.is_empty() && slug != "/";
    if is_relative && has_slug {
        format!("{slug}{location}")
    } else {
        location.to_string()
    }
}

/// Add the visitor's personalization keys
///
/// Runs the page initializer, then sets the registration flag and either the
/// signed-in keys or the anonymous ones.
pub fn personalize(
    state: &AppState,
    site: &CourseSite,
    request: &RequestInfo,
    identity: Option<&Identity>,
    context: &mut PageContext,
) {
    state.page_initializer.initialize(context);
    context.set(
        "can_register",
        site.course.environ().reg_form.can_register,
    );

    let dest = request.uri();
    if let Some(identity) = identity {
        let events = state.config.events;
        context.set("email", identity.email.as_str());
        context.set("logoutUrl", state.auth.logout_url(&dest));
        context.set("transient_student", false);
        context.set("record_tag_events", events.record_tag_events);
        context.set("record_page_events", events.record_page_events);
        context.set("record_events", events.record_events);
        context.set(
            "event_xsrf_token",
            state.tokens.issue(&identity.user_id, EVENT_POST_ACTION),
        );
    } else {
        context.set("loginUrl", state.auth.login_url(&dest));
        context.set("transient_student", true);
    }
}

/// Add the course level keys every template expects
pub fn add_course_context(
    state: &AppState,
    site: &CourseSite,
    request: &RequestInfo,
    identity: Option<&Identity>,
    context: &mut PageContext,
) -> Result<(), serde_json::Error> {
    let is_super_admin = identity.is_some_and(|id| state.is_super_admin(&id.email));
    let is_course_admin =
        is_super_admin || identity.is_some_and(|id| site.is_admin(&id.email));

    context.set_serialized(COURSE_INFO_KEY, site.course.environ())?;
    context.set("is_course_admin", is_course_admin);
    context.set("is_read_write_course", site.is_read_write());
    context.set("is_super_admin", is_super_admin);
    context.set(COURSE_BASE_KEY, base_href(&site.slug, request));
    Ok(())
}
