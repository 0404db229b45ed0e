// Application state module
// Services shared by every request, assembled once at startup

use std::path::Path;
use std::sync::Arc;

use super::types::{Config, CourseConfig};
use crate::auth::{AuthContext, HeaderAuthContext, XsrfTokenService};
use crate::course::{ConfiguredCourse, CourseService};
use crate::page::{DefaultPageInitializer, PageInitializer, StudentDataProvider};
use crate::render::{Renderer, TemplateRenderer};
use crate::student::{FileStudentStore, MemoryStudentStore, StoreError, StudentStore};

/// Application state
pub struct AppState {
    pub config: Config,
    pub tokens: XsrfTokenService,
    pub auth: Box<dyn AuthContext>,
    pub renderer: Box<dyn Renderer>,
    pub page_initializer: Arc<dyn PageInitializer>,
    pub student_data_providers: Vec<Box<dyn StudentDataProvider>>,
    pub sites: Vec<Arc<CourseSite>>,
}

impl AppState {
    /// Assemble state with the given collaborators
    pub fn new(
        config: Config,
        auth: Box<dyn AuthContext>,
        renderer: Box<dyn Renderer>,
        sites: Vec<Arc<CourseSite>>,
    ) -> Self {
        let tokens = if config.xsrf.secret.is_empty() {
            tracing::warn!("xsrf.secret not set, tokens will not survive a restart");
            XsrfTokenService::with_random_secret(config.xsrf.token_lifetime_secs)
        } else {
            XsrfTokenService::new(
                config.xsrf.secret.as_bytes(),
                config.xsrf.token_lifetime_secs,
            )
        };

        Self {
            config,
            tokens,
            auth,
            renderer,
            page_initializer: Arc::new(DefaultPageInitializer),
            student_data_providers: Vec::new(),
            sites,
        }
    }

    /// Build the production state: header authentication, file templates and
    /// one site per configured course
    pub fn from_config(config: Config) -> Result<Self, StoreError> {
        let auth = Box::new(HeaderAuthContext::new(&config.auth));
        let renderer = Box::new(TemplateRenderer::new(&config.render.template_dir));
        let store_dir = config.students.store_dir.as_deref().map(Path::new);
        let sites = config
            .courses
            .iter()
            .map(|course| CourseSite::from_config(course, store_dir).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        for site in &sites {
            tracing::info!(
                slug = %site.slug,
                title = %site.course.environ().course.title,
                "course mounted"
            );
        }
        Ok(Self::new(config, auth, renderer, sites))
    }

    #[must_use]
    pub fn with_page_initializer(mut self, initializer: Arc<dyn PageInitializer>) -> Self {
        self.page_initializer = initializer;
        self
    }

    #[must_use]
    pub fn with_student_data_provider(mut self, provider: Box<dyn StudentDataProvider>) -> Self {
        self.student_data_providers.push(provider);
        self
    }

    pub fn is_super_admin(&self, email: &str) -> bool {
        self.config
            .auth
            .super_admins
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

/// One course mounted under its slug
pub struct CourseSite {
    pub slug: String,
    pub course: Box<dyn CourseService>,
    pub students: Arc<dyn StudentStore>,
    admins: Vec<String>,
    read_write: bool,
}

impl CourseSite {
    pub fn new(
        slug: impl Into<String>,
        course: Box<dyn CourseService>,
        students: Arc<dyn StudentStore>,
    ) -> Self {
        Self {
            slug: normalize_slug(&slug.into()),
            course,
            students,
            admins: Vec::new(),
            read_write: true,
        }
    }

    /// Site for a configured course; students persist under `store_dir`
    /// when one is given and stay in memory otherwise
    pub fn from_config(config: &CourseConfig, store_dir: Option<&Path>) -> Result<Self, StoreError> {
        let students: Arc<dyn StudentStore> = match store_dir {
            Some(dir) => Arc::new(FileStudentStore::open(
                dir.join(format!("{}.toml", config.namespace())),
            )?),
            None => Arc::new(MemoryStudentStore::new()),
        };

        let mut site = Self::new(
            config.slug.clone(),
            Box::new(ConfiguredCourse::from_config(config)),
            students,
        )
        .with_admins(config.admins.clone());
        site.read_write = config.read_write;
        Ok(site)
    }

    #[must_use]
    pub fn with_admins(mut self, admins: Vec<String>) -> Self {
        self.admins = admins;
        self
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.iter().any(|admin| admin.eq_ignore_ascii_case(email))
    }

    /// Whether course storage accepts writes
    pub fn is_read_write(&self) -> bool {
        self.read_write && self.students.is_read_write()
    }
}

/// `/` stays as is; other slugs get a leading slash and lose a trailing one
fn normalize_slug(slug: &str) -> String {
    let trimmed = slug.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}
