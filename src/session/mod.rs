//! Session and identity resolution
//!
//! Works out who is behind a request and whether they are enrolled in the
//! course, personalizing the page context along the way.

use crate::auth::Identity;
use crate::config::{AppState, CourseSite};
use crate::http::RequestInfo;
use crate::page::{self, PageContext};
use crate::student::{StoreError, Student, StudentRecord, TRANSIENT_STUDENT};

/// Outcome of resolving an enrolled student
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrollment {
    Student(StudentRecord),
    /// Visitor accepted without an enrollment, read only
    Transient,
    /// Visitor must go elsewhere first; the location is final
    Redirect(String),
}

/// Resolve the current identity and student, personalizing `context`
pub fn resolve(
    state: &AppState,
    site: &CourseSite,
    request: &RequestInfo,
    context: &mut PageContext,
) -> Result<(Option<Identity>, Student), StoreError> {
    let identity = state.auth.current_identity(request);
    page::personalize(state, site, request, identity.as_ref(), context);

    let Some(identity) = identity else {
        return Ok((None, TRANSIENT_STUDENT));
    };

    let Some(record) = site.students.find_enrolled_by_email(&identity.email)? else {
        context.set("transient_student", true);
        return Ok((Some(identity), TRANSIENT_STUDENT));
    };

    let record = backfill_user_id(site, record, &identity)?;
    Ok((Some(identity), Student::Enrolled(record)))
}

/// Resolve an enrolled student, or say where the visitor goes instead
///
/// With `supports_transient` a visitor without enrollment is accepted on a
/// browsable course. Otherwise anonymous visitors are sent to login and
/// signed-in visitors to the course preview.
pub fn resolve_enrolled(
    state: &AppState,
    site: &CourseSite,
    request: &RequestInfo,
    context: &mut PageContext,
    supports_transient: bool,
) -> Result<Enrollment, StoreError> {
    let (identity, student) = resolve(state, site, request, context)?;
    if let Student::Enrolled(record) = student {
        return Ok(Enrollment::Student(record));
    }

    if supports_transient && site.course.environ().course.browsable {
        return Ok(Enrollment::Transient);
    }
    let location = match identity {
        // login URLs are external and skip slug canonicalization
        None => state.auth.login_url(&request.uri()),
        Some(_) => page::canonicalize_url(&site.slug, "/preview"),
    };
    Ok(Enrollment::Redirect(location))
}

/// Records created before user ids were tracked get the identity's id
fn backfill_user_id(
    site: &CourseSite,
    mut record: StudentRecord,
    identity: &Identity,
) -> Result<StudentRecord, StoreError> {
    if record.user_id.is_some() {
        return Ok(record);
    }
    if !site.is_read_write() {
        record.user_id = Some(identity.user_id.clone());
        return Ok(record);
    }

    tracing::info!(email = %record.email, "backfilling legacy student user id");
    let user_id = identity.user_id.clone();
    site.students
        .update(&record.email, &mut |s| s.user_id = Some(user_id.clone()))
}
