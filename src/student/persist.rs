// Student persistence module
// Keeps students in memory and saves a TOML snapshot after every mutation

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::store::{MemoryStudentStore, StudentStore};
use super::{StoreError, StudentProfile, StudentRecord};

/// On-disk snapshot, read from `<namespace>.toml`
#[derive(Debug, Deserialize, Default)]
struct StudentSnapshot {
    #[serde(default)]
    students: Vec<StudentRecord>,
    #[serde(default)]
    profiles: Vec<StudentProfile>,
}

/// Borrowed form of `StudentSnapshot` for writing
#[derive(Serialize)]
struct SnapshotRef<'a> {
    students: &'a [StudentRecord],
    profiles: &'a [StudentProfile],
}

/// Student store backed by a TOML file
pub struct FileStudentStore {
    /// Path to snapshot file
    path: PathBuf,
    inner: MemoryStudentStore,
    /// Serializes mutate-then-save so snapshots land in order
    write_lock: Mutex<()>,
}

impl FileStudentStore {
    /// Open the snapshot at `path`, starting empty if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = Self::load_snapshot(&path)?;
        tracing::info!(
            path = %path.display(),
            students = snapshot.students.len(),
            "loaded student store"
        );

        Ok(Self {
            path,
            inner: MemoryStudentStore::with_records(snapshot.students, snapshot.profiles),
            write_lock: Mutex::new(()),
        })
    }

    fn load_snapshot(path: &Path) -> Result<StudentSnapshot, StoreError> {
        if !path.exists() {
            return Ok(StudentSnapshot::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save records to file, via a temporary file renamed into place
    fn save(&self, students: &[StudentRecord], profiles: &[StudentProfile]) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(&SnapshotRef { students, profiles })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<T>(&self, op: impl FnOnce(&MemoryStudentStore) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        // Mutate a staged copy; readers only see it once the file is written
        let (students, profiles) = self.inner.snapshot()?;
        let staged = MemoryStudentStore::with_records(students, profiles);
        let result = op(&staged)?;

        let (students, profiles) = staged.snapshot()?;
        if let Err(e) = self.save(&students, &profiles) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to save student store");
            return Err(e);
        }
        self.inner.replace(students, profiles)?;
        Ok(result)
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StudentStore for FileStudentStore {
    fn find_by_email(&self, email: &str) -> Result<Option<StudentRecord>, StoreError> {
        self.inner.find_by_email(email)
    }

    fn put(&self, record: StudentRecord) -> Result<(), StoreError> {
        self.mutate(|inner| inner.put(record))
    }

    fn update(
        &self,
        email: &str,
        change: &mut dyn FnMut(&mut StudentRecord),
    ) -> Result<StudentRecord, StoreError> {
        self.mutate(|inner| inner.update(email, change))
    }

    fn profile_by_user_id(&self, user_id: &str) -> Result<Option<StudentProfile>, StoreError> {
        self.inner.profile_by_user_id(user_id)
    }

    fn put_profile(&self, profile: StudentProfile) -> Result<(), StoreError> {
        self.mutate(|inner| inner.put_profile(profile))
    }
}
