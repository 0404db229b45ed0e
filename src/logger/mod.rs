//! Logger module
//!
//! Two outputs:
//! - Access log lines in combined, common, json or custom formats, written
//!   to a file or stdout
//! - Diagnostic events through `tracing`, filtered by `RUST_LOG` or the
//!   configured level

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialize diagnostics and the access log
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    writer::init(config.logging.access_log_file.as_deref())
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        addr = %addr,
        workers = ?config.server.workers,
        courses = config.courses.len(),
        access_log = ?config.logging.access_log_file,
        "course portal listening on http://{addr}"
    );
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    writer::write_access(&entry.format(format));
}
