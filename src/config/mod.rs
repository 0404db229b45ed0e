// Configuration module entry point
// Loads application configuration and assembles the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::{AppState, CourseSite};
pub use types::{AuthConfig, Config, CourseConfig};

#[cfg(test)]
pub use types::{LabelConfig, LessonConfig, UnitConfig};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("PORTAL").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "course-portal/0.1")?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("auth.user_id_header", "x-auth-user-id")?
            .set_default("auth.email_header", "x-auth-user-email")?
            .set_default("auth.login_path", "/_auth/login")?
            .set_default("auth.logout_path", "/_auth/logout")?
            .set_default("xsrf.token_lifetime_secs", 86_400)?
            .set_default("events.record_page_events", false)?
            .set_default("events.record_tag_events", false)?
            .set_default("events.record_events", false)?
            .set_default("students.can_share_student_profile", false)?
            .set_default("render.template_dir", "templates")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
