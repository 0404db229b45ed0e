// Student store module
// Persistence interface for student records and an in-memory implementation

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use super::{StoreError, StudentProfile, StudentRecord};
use crate::auth::Identity;

/// Persistence service for students of one course
///
/// Implementations provide single-record atomic updates; callers add no
/// locking of their own.
pub trait StudentStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<StudentRecord>, StoreError>;

    /// Insert or replace a record
    fn put(&self, record: StudentRecord) -> Result<(), StoreError>;

    /// Apply `change` to one record atomically and return the result
    fn update(
        &self,
        email: &str,
        change: &mut dyn FnMut(&mut StudentRecord),
    ) -> Result<StudentRecord, StoreError>;

    fn profile_by_user_id(&self, user_id: &str) -> Result<Option<StudentProfile>, StoreError>;

    fn put_profile(&self, profile: StudentProfile) -> Result<(), StoreError>;

    /// Whether mutations are accepted
    fn is_read_write(&self) -> bool {
        true
    }

    fn find_enrolled_by_email(&self, email: &str) -> Result<Option<StudentRecord>, StoreError> {
        Ok(self.find_by_email(email)?.filter(|s| s.is_enrolled))
    }

    /// Enroll the identity, re-enrolling a previously unenrolled record
    fn add_new_student(
        &self,
        identity: &Identity,
        name: &str,
        additional_fields: &str,
    ) -> Result<StudentRecord, StoreError> {
        let mut record = self
            .find_by_email(&identity.email)?
            .unwrap_or_else(|| StudentRecord::new(&identity.email, None, ""));
        record.user_id = Some(identity.user_id.clone());
        record.name = name.to_string();
        record.is_enrolled = true;
        record.enrolled_on = Utc::now();
        record.additional_fields = additional_fields.to_string();
        self.put(record.clone())?;
        Ok(record)
    }

    fn rename(&self, email: &str, name: &str) -> Result<StudentRecord, StoreError> {
        self.update(email, &mut |s| s.name = name.to_string())
    }

    #[cfg(test)]
    fn set_labels(&self, email: &str, labels: &BTreeSet<u64>) -> Result<StudentRecord, StoreError> {
        self.update(email, &mut |s| s.labels.clone_from(labels))
    }

    fn set_enrollment(&self, email: &str, enrolled: bool) -> Result<StudentRecord, StoreError> {
        self.update(email, &mut |s| s.is_enrolled = enrolled)
    }
}

/// Student store held in process memory
#[derive(Default)]
pub struct MemoryStudentStore {
    students: RwLock<HashMap<String, StudentRecord>>,
    profiles: RwLock<HashMap<String, StudentProfile>>,
    read_only: bool,
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects every mutation
    #[cfg(test)]
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// Seed from previously persisted records
    pub fn with_records(students: Vec<StudentRecord>, profiles: Vec<StudentProfile>) -> Self {
        Self {
            students: RwLock::new(
                students
                    .into_iter()
                    .map(|s| (s.email.clone(), s))
                    .collect(),
            ),
            profiles: RwLock::new(
                profiles
                    .into_iter()
                    .map(|p| (p.user_id.clone(), p))
                    .collect(),
            ),
            read_only: false,
        }
    }

    /// Copy of all records, ordered by email
    pub fn snapshot(&self) -> Result<(Vec<StudentRecord>, Vec<StudentProfile>), StoreError> {
        let mut students: Vec<StudentRecord> = self
            .students
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .cloned()
            .collect();
        students.sort_by(|a, b| a.email.cmp(&b.email));

        let mut profiles: Vec<StudentProfile> = self
            .profiles
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        Ok((students, profiles))
    }

    /// Swap in a full set of records
    pub fn replace(
        &self,
        students: Vec<StudentRecord>,
        profiles: Vec<StudentProfile>,
    ) -> Result<(), StoreError> {
        let mut student_map = self.students.write().map_err(|_| StoreError::Poisoned)?;
        let mut profile_map = self.profiles.write().map_err(|_| StoreError::Poisoned)?;
        *student_map = students.into_iter().map(|s| (s.email.clone(), s)).collect();
        *profile_map = profiles.into_iter().map(|p| (p.user_id.clone(), p)).collect();
        Ok(())
    }

    const fn check_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl StudentStore for MemoryStudentStore {
    fn find_by_email(&self, email: &str) -> Result<Option<StudentRecord>, StoreError> {
        let students = self.students.read().map_err(|_| StoreError::Poisoned)?;
        Ok(students.get(email).cloned())
    }

    fn put(&self, record: StudentRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut students = self.students.write().map_err(|_| StoreError::Poisoned)?;
        students.insert(record.email.clone(), record);
        Ok(())
    }

    fn update(
        &self,
        email: &str,
        change: &mut dyn FnMut(&mut StudentRecord),
    ) -> Result<StudentRecord, StoreError> {
        self.check_writable()?;
        let mut students = self.students.write().map_err(|_| StoreError::Poisoned)?;
        let record = students
            .get_mut(email)
            .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
        change(record);
        Ok(record.clone())
    }

    fn profile_by_user_id(&self, user_id: &str) -> Result<Option<StudentProfile>, StoreError> {
        let profiles = self.profiles.read().map_err(|_| StoreError::Poisoned)?;
        Ok(profiles.get(user_id).cloned())
    }

    fn put_profile(&self, profile: StudentProfile) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut profiles = self.profiles.write().map_err(|_| StoreError::Poisoned)?;
        profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    fn is_read_write(&self) -> bool {
        !self.read_only
    }
}
