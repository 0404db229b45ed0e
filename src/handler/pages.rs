//! Course page handlers
//!
//! Every page path owns an `ActionDispatcher`. Reads resolve to the page's
//! default action; writes are registered under the anti-forgery action they
//! are protected by, so a form posts `action=<token action>`.

use hyper::Method;
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use crate::auth::Identity;
use crate::config::{AppState, CourseSite};
use crate::course::{CourseEnviron, CourseService, Unit};
use crate::dispatch::{ActionDispatcher, ActionRequest};
use crate::error::HandlerResult;
use crate::http::{self, HttpResponse, RequestInfo};
use crate::page::{self, PageContext};
use crate::session::{self, Enrollment};
use crate::student::{replace_track_labels, LabelKind, StoreError, Student, StudentRecord};

pub const REGISTER_ACTION: &str = "register-post";
pub const STUDENT_EDIT_ACTION: &str = "student-edit";
pub const STUDENT_UNENROLL_ACTION: &str = "student-unenroll";

const DATE_ENROLLED_FORMAT: &str = "%Y-%m-%d";

/// One request to a course page
pub struct PageRequest {
    pub state: Arc<AppState>,
    pub site: Arc<CourseSite>,
    pub request: RequestInfo,
    pub context: PageContext,
}

impl ActionRequest for PageRequest {
    fn param(&self, name: &str) -> Option<&str> {
        self.request.get(name)
    }

    fn token_subject(&self) -> String {
        self.identity().map(|id| id.user_id).unwrap_or_default()
    }
}

impl PageRequest {
    pub fn new(state: Arc<AppState>, site: Arc<CourseSite>, request: RequestInfo) -> Self {
        Self {
            state,
            site,
            request,
            context: PageContext::new(),
        }
    }

    fn identity(&self) -> Option<Identity> {
        self.state.auth.current_identity(&self.request)
    }

    fn environ(&self) -> &CourseEnviron {
        self.site.course.environ()
    }

    fn resolve(&mut self) -> Result<(Option<Identity>, Student), StoreError> {
        session::resolve(&self.state, &self.site, &self.request, &mut self.context)
    }

    fn resolve_enrolled(&mut self, supports_transient: bool) -> Result<Enrollment, StoreError> {
        session::resolve_enrolled(
            &self.state,
            &self.site,
            &self.request,
            &mut self.context,
            supports_transient,
        )
    }

    /// Enrolled student, or the response that ends the request
    fn require_enrolled(&mut self) -> Result<Result<StudentRecord, HttpResponse>, StoreError> {
        Ok(match self.resolve_enrolled(false)? {
            Enrollment::Student(record) => Ok(record),
            Enrollment::Transient => Err(self.redirect("/preview", true)),
            Enrollment::Redirect(location) => Err(http::build_redirect_response(&location)),
        })
    }

    fn issue_token(&self, action: &str) -> String {
        self.state.tokens.issue(&self.token_subject(), action)
    }

    fn redirect(&self, location: &str, normalize: bool) -> HttpResponse {
        if normalize {
            http::build_redirect_response(&page::canonicalize_url(&self.site.slug, location))
        } else {
            http::build_redirect_response(location)
        }
    }

    fn login_redirect(&self) -> HttpResponse {
        let login = self.state.auth.login_url(&self.request.uri());
        self.redirect(&login, false)
    }

    /// Hand the page context to the renderer; the context is consumed
    fn render(&mut self, template: &str) -> HandlerResult {
        let identity = self.identity();
        let mut context = std::mem::take(&mut self.context);
        page::add_course_context(
            &self.state,
            &self.site,
            &self.request,
            identity.as_ref(),
            &mut context,
        )?;
        let html = self.state.renderer.render(
            template,
            &self.environ().course.locale,
            &context.into_value(),
        )?;
        Ok(http::build_html_response(html))
    }

    fn profile_nick_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .site
            .students
            .profile_by_user_id(user_id)?
            .and_then(|profile| profile.nick_name))
    }
}

type PageTable = HashMap<&'static str, ActionDispatcher<PageRequest>>;

fn pages() -> &'static PageTable {
    static PAGES: OnceLock<PageTable> = OnceLock::new();
    PAGES.get_or_init(|| {
        HashMap::from([
            ("/", ActionDispatcher::new("course").on_get("course", course)),
            ("/course", ActionDispatcher::new("course").on_get("course", course)),
            ("/preview", ActionDispatcher::new("preview").on_get("preview", preview)),
            (
                "/register",
                ActionDispatcher::new("register")
                    .on_get("register", register_form)
                    .on_post(REGISTER_ACTION, register),
            ),
            ("/forum", ActionDispatcher::new("forum").on_get("forum", forum)),
            ("/student/home", ActionDispatcher::new("home").on_get("home", student_home)),
            (
                "/student/editstudent",
                ActionDispatcher::new(STUDENT_EDIT_ACTION).on_post(STUDENT_EDIT_ACTION, edit_student),
            ),
            (
                "/student/settracks",
                ActionDispatcher::new(STUDENT_EDIT_ACTION).on_post(STUDENT_EDIT_ACTION, set_tracks),
            ),
            (
                "/student/unenroll",
                ActionDispatcher::new("unenroll")
                    .on_get("unenroll", unenroll_form)
                    .on_post(STUDENT_UNENROLL_ACTION, unenroll),
            ),
        ])
    })
}

/// Serve the page at `path` below the course slug
pub fn handle_page(mut page: PageRequest, path: &str) -> HandlerResult {
    let Some(dispatcher) = pages().get(path) else {
        tracing::debug!(path, "no such course page");
        return Ok(http::build_404_response());
    };

    let state = Arc::clone(&page.state);
    match page.request.method {
        Method::GET | Method::HEAD => dispatcher.dispatch_get(&mut page),
        Method::POST => dispatcher.dispatch_post(&mut page, &state.tokens),
        _ => Ok(http::build_405_response()),
    }
}

fn units_value(units: &[&Unit]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(units)
}

fn course(page: &mut PageRequest) -> HandlerResult {
    let student = match page.resolve_enrolled(true)? {
        Enrollment::Student(record) => Some(record),
        Enrollment::Transient => None,
        Enrollment::Redirect(location) => return Ok(http::build_redirect_response(&location)),
    };

    let units = match &student {
        Some(record) => page.site.course.units_for_student(&record.labels),
        None => page.site.course.units().iter().collect(),
    };
    let units = units_value(&units)?;

    page.context.set("navbar", json!({"course": true}));
    page.context.set("units", units);
    if let Some(record) = &student {
        page.context.set_serialized("student", record)?;
    }
    page.render("course.html")
}

fn preview(page: &mut PageRequest) -> HandlerResult {
    let (identity, student) = page.resolve()?;
    if !student.is_transient() || page.environ().course.browsable {
        return Ok(page.redirect("/course", true));
    }

    let environ = page.environ().clone();
    let units: Vec<_> = page.site.course.units().iter().collect();
    let units = units_value(&units)?;
    page.context.set("transient_student", true);
    page.context.set("can_register", environ.reg_form.can_register);
    page.context.set("navbar", json!({"course": true}));
    page.context.set("units", units);
    page.context.set("show_registration_page", true);
    page.context.set("video_exists", environ.course.video_exists());
    page.context.set("image_exists", environ.course.image_exists());

    if let Some(identity) = identity {
        let has_profile = page
            .site
            .students
            .profile_by_user_id(&identity.user_id)?
            .is_some();
        if has_profile && environ.reg_form.additional_registration_fields.is_empty() {
            let token = page.issue_token(REGISTER_ACTION);
            page.context.set("show_registration_page", false);
            page.context.set("register_xsrf_token", token);
        }
    }
    page.render("preview.html")
}

fn register_form(page: &mut PageRequest) -> HandlerResult {
    let (identity, student) = page.resolve()?;
    let Some(identity) = identity else {
        return Ok(page.login_redirect());
    };
    if !student.is_transient() {
        return Ok(page.redirect("/course", true));
    }
    if !page.environ().reg_form.can_register {
        return Ok(page.redirect("/course#registration_closed", true));
    }

    let current_name = page.profile_nick_name(&identity.user_id)?.unwrap_or_default();
    let token = page.issue_token(REGISTER_ACTION);
    page.context.set("current_name", current_name);
    page.context.set("navbar", json!({}));
    page.context.set("transient_student", true);
    page.context.set("register_xsrf_token", token);
    page.render("register.html")
}

fn register(page: &mut PageRequest) -> HandlerResult {
    let (identity, _) = page.resolve()?;
    let Some(identity) = identity else {
        return Ok(page.login_redirect());
    };
    if !page.environ().reg_form.can_register {
        return Ok(page.redirect("/course#registration_closed", true));
    }

    let name = if page.request.has_form_field("name_from_profile") {
        page.profile_nick_name(&identity.user_id)?.unwrap_or_default()
    } else {
        page.request.get("form01").unwrap_or_default().trim().to_string()
    };
    let additional_fields = serde_json::to_string(page.request.form_fields())?;

    let record = page
        .site
        .students
        .add_new_student(&identity, &name, &additional_fields)?;
    tracing::info!(email = %record.email, slug = %page.site.slug, "student registered");
    Ok(page.redirect("/course#registration_confirmation", true))
}

fn forum(page: &mut PageRequest) -> HandlerResult {
    if let Enrollment::Redirect(location) = page.resolve_enrolled(true)? {
        return Ok(http::build_redirect_response(&location));
    }
    page.context.set("navbar", json!({"forum": true}));
    page.render("forum.html")
}

fn student_home(page: &mut PageRequest) -> HandlerResult {
    let record = match page.require_enrolled()? {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };

    let course = &page.site.course;
    let track_labels = course.labels_of_kind(LabelKind::CourseTrack);
    let track_ids: BTreeSet<u64> = track_labels.iter().map(|label| label.id).collect();

    // assessments nested in a unit are listed with their parent
    let units: Vec<Value> = course
        .units()
        .iter()
        .filter(|unit| course.parent_unit(unit.unit_id).is_none())
        .map(|unit| {
            let labels: Vec<u64> = unit.labels.intersection(&track_ids).copied().collect();
            json!({"unit_id": unit.unit_id, "title": unit.title, "labels": labels})
        })
        .collect();
    let student_labels: Vec<u64> = record.labels.intersection(&track_ids).copied().collect();

    let mut extra_student_data = Map::new();
    for provider in &page.state.student_data_providers {
        if let Some(Value::Object(data)) = provider.provide(&**course, &record) {
            extra_student_data.extend(data);
        }
    }

    let nick_name = match record.user_id.as_deref() {
        Some(user_id) => page.profile_nick_name(user_id)?,
        None => None,
    };
    let student_name = nick_name.unwrap_or_else(|| record.name.clone());
    let token = page.issue_token(STUDENT_EDIT_ACTION);
    let can_edit_name = !page.state.config.students.can_share_student_profile;

    page.context.set("navbar", json!({"progress": true}));
    page.context.set_serialized("student", &record)?;
    page.context.set("student_name", student_name);
    page.context.set(
        "date_enrolled",
        record.enrolled_on.format(DATE_ENROLLED_FORMAT).to_string(),
    );
    page.context.set("student_edit_xsrf_token", token);
    page.context.set("can_edit_name", can_edit_name);
    page.context.set_serialized("track_labels", &track_labels)?;
    page.context.set("student_labels", student_labels);
    page.context.set("units", units);
    page.context.set("extra_student_data", extra_student_data);
    page.render("student_profile.html")
}

fn edit_student(page: &mut PageRequest) -> HandlerResult {
    let record = match page.require_enrolled()? {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };

    let name = page.request.get("name").unwrap_or_default().trim().to_string();
    page.site.students.rename(&record.email, &name)?;
    Ok(page.redirect("/student/home", true))
}

fn set_tracks(page: &mut PageRequest) -> HandlerResult {
    let record = match page.require_enrolled()? {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };

    let track_ids = page.site.course.track_label_ids();
    let selected = page.request.get_all("labels");
    // recompute from the stored labels so concurrent non-track changes survive
    page.site.students.update(&record.email, &mut |student| {
        student.labels = replace_track_labels(&student.labels, &track_ids, selected.iter().copied());
    })?;
    Ok(page.redirect("/student/home", true))
}

fn unenroll_form(page: &mut PageRequest) -> HandlerResult {
    let record = match page.require_enrolled()? {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };

    let token = page.issue_token(STUDENT_UNENROLL_ACTION);
    page.context.set_serialized("student", &record)?;
    page.context.set("navbar", json!({}));
    page.context.set("student_unenroll_xsrf_token", token);
    page.render("unenroll_confirmation_check.html")
}

fn unenroll(page: &mut PageRequest) -> HandlerResult {
    let record = match page.require_enrolled()? {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };

    page.site.students.set_enrollment(&record.email, false)?;
    tracing::info!(email = %record.email, slug = %page.site.slug, "student unenrolled");
    page.context.set("navbar", json!({}));
    page.context.set("transient_student", true);
    page.render("unenroll_confirmation.html")
}
