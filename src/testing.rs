// Shared fixtures for unit tests

use hyper::body::{Body, Bytes, Frame};
use hyper::Method;
use serde_json::Value;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use crate::auth::HeaderAuthContext;
use crate::config::{AppState, Config, CourseSite};
use crate::course::{tests::course_config, ConfiguredCourse};
use crate::http::RequestInfo;
use crate::render::{RenderError, Renderer};
use crate::student::{MemoryStudentStore, StudentStore};

/// Renderer that keeps every template name and context it is given
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    rendered: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RecordingRenderer {
    pub fn last(&self) -> (String, Value) {
        self.rendered.lock().unwrap().last().cloned().unwrap()
    }

    pub fn count(&self) -> usize {
        self.rendered.lock().unwrap().len()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, template: &str, _locale: &str, context: &Value) -> Result<String, RenderError> {
        self.rendered
            .lock()
            .unwrap()
            .push((template.to_string(), context.clone()));
        Ok(format!("<html>{template}</html>"))
    }
}

pub struct Fixture {
    pub state: Arc<AppState>,
    pub site: Arc<CourseSite>,
    pub store: Arc<MemoryStudentStore>,
    pub renderer: RecordingRenderer,
}

pub fn test_config() -> Config {
    let mut config = Config::load_from("no-such-config-file").unwrap();
    config.xsrf.secret = "test-secret".to_string();
    config.courses = vec![course_config()];
    config
}

/// State with the physics course mounted at `/physics`
pub fn fixture(browsable: bool) -> Fixture {
    let mut config = test_config();
    config.courses[0].browsable = browsable;
    fixture_with(config)
}

pub fn fixture_with(config: Config) -> Fixture {
    let store = Arc::new(MemoryStudentStore::new());
    let students: Arc<dyn StudentStore> = store.clone();
    let course = &config.courses[0];
    let site = Arc::new(
        CourseSite::new(
            course.slug.clone(),
            Box::new(ConfiguredCourse::from_config(course)),
            students,
        )
        .with_admins(course.admins.clone()),
    );
    let renderer = RecordingRenderer::default();
    let auth = Box::new(HeaderAuthContext::new(&config.auth));
    let state = Arc::new(AppState::new(
        config,
        auth,
        Box::new(renderer.clone()),
        vec![site.clone()],
    ));
    Fixture {
        state,
        site,
        store,
        renderer,
    }
}

pub fn anonymous(method: Method, target: &str) -> RequestInfo {
    RequestInfo::new(method, target).with_header("host", "learn.example.com")
}

pub fn signed_in(method: Method, target: &str, user_id: &str, email: &str) -> RequestInfo {
    anonymous(method, target)
        .with_header("x-auth-user-id", user_id)
        .with_header("x-auth-user-email", email)
}

/// Streamed body without a length, like a chunked upload
pub struct ChunkedBody(VecDeque<Bytes>);

impl ChunkedBody {
    pub fn new<'a>(chunks: impl IntoIterator<Item = &'a str>) -> Self {
        Self(chunks.into_iter().map(|c| Bytes::from(c.to_string())).collect())
    }
}

impl Body for ChunkedBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        Poll::Ready(self.0.pop_front().map(|chunk| Ok(Frame::data(chunk))))
    }
}
