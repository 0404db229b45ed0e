// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub xsrf: XsrfConfig,
    pub events: EventsConfig,
    pub students: StudentsConfig,
    pub render: RenderConfig,
    #[serde(default = "default_courses")]
    pub courses: Vec<CourseConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default `tracing` filter, overridden by `RUST_LOG`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Authentication context configuration
///
/// Identity is asserted by a fronting authentication proxy through request
/// headers; login and logout are pages served by that proxy.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub user_id_header: String,
    pub email_header: String,
    pub login_path: String,
    pub logout_path: String,
    /// Emails granted super admin rights on every course
    #[serde(default)]
    pub super_admins: Vec<String>,
}

/// Anti-forgery token configuration
#[derive(Debug, Deserialize, Clone)]
pub struct XsrfConfig {
    /// HMAC secret; a random one is generated when blank
    #[serde(default)]
    pub secret: String,
    pub token_lifetime_secs: u64,
}

/// Client-side event recording toggles, surfaced to pages
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct EventsConfig {
    pub record_page_events: bool,
    pub record_tag_events: bool,
    pub record_events: bool,
}

/// Student persistence configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StudentsConfig {
    /// When set, students persist to `<store_dir>/<namespace>.toml`
    #[serde(default)]
    pub store_dir: Option<String>,
    pub can_share_student_profile: bool,
}

/// Template rendering configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    pub template_dir: String,
}

/// A course hosted under its own URL slug
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CourseConfig {
    pub slug: String,
    pub title: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub browsable: bool,
    #[serde(default = "default_true")]
    pub can_register: bool,
    #[serde(default)]
    pub additional_registration_fields: String,
    #[serde(default)]
    pub display_unit_title_without_index: bool,
    #[serde(default)]
    pub main_video_url: Option<String>,
    #[serde(default)]
    pub main_image_url: Option<String>,
    /// Emails granted course admin rights
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default = "default_true")]
    pub read_write: bool,
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    #[serde(default)]
    pub labels: Vec<LabelConfig>,
}

impl CourseConfig {
    /// Namespace name derived from the slug, used for storage file names
    pub fn namespace(&self) -> String {
        let trimmed = self.slug.trim_matches('/');
        if trimmed.is_empty() {
            "default".to_string()
        } else {
            trimmed.replace('/', "_")
        }
    }
}

/// Unit declared in course configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UnitConfig {
    pub unit_id: u32,
    pub index: u32,
    pub title: String,
    #[serde(default = "default_unit_kind")]
    pub kind: String,
    #[serde(default)]
    pub parent_unit: Option<u32>,
    #[serde(default)]
    pub labels: Vec<u64>,
    #[serde(default)]
    pub lessons: Vec<LessonConfig>,
}

/// Lesson declared in course configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LessonConfig {
    pub index: u32,
    pub title: String,
}

/// Label declared in course configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LabelConfig {
    pub id: u64,
    pub title: String,
    /// `general` or `course_track`
    #[serde(default = "default_label_kind")]
    pub kind: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_locale() -> String {
    "en_US".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_unit_kind() -> String {
    "U".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_label_kind() -> String {
    "general".to_string()
}

fn default_courses() -> Vec<CourseConfig> {
    vec![CourseConfig {
        slug: "/".to_string(),
        title: "Course".to_string(),
        locale: default_locale(),
        browsable: false,
        can_register: true,
        additional_registration_fields: String::new(),
        display_unit_title_without_index: false,
        main_video_url: None,
        main_image_url: None,
        admins: Vec::new(),
        read_write: true,
        units: Vec::new(),
        labels: Vec::new(),
    }]
}
