//! Access log writer module
//!
//! Thread-safe writing of access log lines to a file or stdout. Diagnostic
//! output goes through `tracing` instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Global access log writer
static ACCESS_WRITER: OnceLock<AccessLogWriter> = OnceLock::new();

enum LogTarget {
    Stdout,
    File(File),
}

pub struct AccessLogWriter {
    target: Mutex<LogTarget>,
}

impl AccessLogWriter {
    fn new(access_log_file: Option<&str>) -> io::Result<Self> {
        let target = match access_log_file {
            Some(path) => LogTarget::File(open_log_file(path)?),
            None => LogTarget::Stdout,
        };
        Ok(Self {
            target: Mutex::new(target),
        })
    }

    pub fn write(&self, line: &str) {
        let Ok(mut target) = self.target.lock() else {
            return;
        };
        match &mut *target {
            LogTarget::Stdout => println!("{line}"),
            LogTarget::File(file) => {
                if let Err(e) = writeln!(file, "{line}") {
                    tracing::warn!(error = %e, "failed to write access log");
                }
            }
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global access log writer
///
/// Returns an error if the log file cannot be opened or the writer was
/// already initialized.
pub fn init(access_log_file: Option<&str>) -> io::Result<()> {
    let writer = AccessLogWriter::new(access_log_file)?;
    ACCESS_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "access log writer already initialized",
        )
    })
}

/// Write one line, falling back to stdout before `init`
pub fn write_access(line: &str) {
    match ACCESS_WRITER.get() {
        Some(writer) => writer.write(line),
        None => println!("{line}"),
    }
}
