//! Student model
//!
//! A visitor is either an enrolled student backed by a persisted record or
//! the transient student, a sentinel that is never written to storage.

mod labels;
mod persist;
mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use labels::{replace_track_labels, Label, LabelKind};
pub use persist::FileStudentStore;
pub use store::{MemoryStudentStore, StudentStore};

/// Persisted student record, keyed by email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub email: String,
    /// Missing on legacy records until backfilled from the identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub is_enrolled: bool,
    #[serde(default)]
    pub labels: BTreeSet<u64>,
    pub enrolled_on: DateTime<Utc>,
    /// Registration form fields as submitted, JSON encoded
    #[serde(default)]
    pub additional_fields: String,
}

impl StudentRecord {
    pub fn new(email: impl Into<String>, user_id: Option<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            user_id,
            name: name.into(),
            is_enrolled: true,
            labels: BTreeSet::new(),
            enrolled_on: Utc::now(),
            additional_fields: String::new(),
        }
    }
}

/// Profile shared across courses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: String,
    pub email: String,
    pub nick_name: Option<String>,
}

/// The current visitor's enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Student {
    Enrolled(StudentRecord),
    /// Anonymous or not enrolled
    Transient,
}

/// Shared sentinel for visitors without an enrollment
pub const TRANSIENT_STUDENT: Student = Student::Transient;

impl Student {
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Student persistence failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("student not found: {0}")]
    NotFound(String),

    #[error("student store is read-only")]
    ReadOnly,

    #[error("student store lock poisoned")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize students: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to parse students: {0}")]
    Parse(#[from] toml::de::Error),
}
