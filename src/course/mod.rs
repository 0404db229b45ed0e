//! Course service
//!
//! Read-only view of one course: its environ (display settings and
//! registration form), units, lessons and labels. `ConfiguredCourse` builds
//! that view from the `[[courses]]` configuration tables.

mod titles;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::CourseConfig;
use crate::student::{Label, LabelKind};

pub use titles::{display_lesson_title, display_short_unit_title, display_unit_title};

/// Course settings consumed by pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseEnviron {
    pub course: CourseInfo,
    pub reg_form: RegForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseInfo {
    pub title: String,
    pub locale: String,
    pub browsable: bool,
    pub display_unit_title_without_index: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_video: Option<MediaRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegForm {
    pub can_register: bool,
    pub additional_registration_fields: String,
}

impl CourseInfo {
    pub fn video_exists(&self) -> bool {
        self.main_video.as_ref().is_some_and(|v| !v.url.is_empty())
    }

    pub fn image_exists(&self) -> bool {
        self.main_image.as_ref().is_some_and(|i| !i.url.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    #[serde(rename = "U")]
    Unit,
    #[serde(rename = "A")]
    Assessment,
    #[serde(rename = "O")]
    Link,
}

impl UnitKind {
    pub fn from_config(kind: &str) -> Self {
        match kind {
            "A" | "assessment" => Self::Assessment,
            "O" | "link" => Self::Link,
            _ => Self::Unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub index: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: u32,
    pub index: u32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    #[serde(default)]
    pub parent_unit: Option<u32>,
    #[serde(default)]
    pub labels: BTreeSet<u64>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// Read-only access to one course's content
pub trait CourseService: Send + Sync {
    fn environ(&self) -> &CourseEnviron;

    fn units(&self) -> &[Unit];

    fn labels(&self) -> &[Label];

    fn find_unit(&self, unit_id: u32) -> Option<&Unit> {
        self.units().iter().find(|u| u.unit_id == unit_id)
    }

    fn lessons(&self, unit_id: u32) -> &[Lesson] {
        self.find_unit(unit_id).map_or(&[], |u| u.lessons.as_slice())
    }

    fn parent_unit(&self, unit_id: u32) -> Option<u32> {
        self.find_unit(unit_id).and_then(|u| u.parent_unit)
    }

    fn labels_of_kind(&self, kind: LabelKind) -> Vec<Label> {
        self.labels()
            .iter()
            .filter(|l| l.kind == kind)
            .cloned()
            .collect()
    }

    fn track_label_ids(&self) -> BTreeSet<u64> {
        self.labels()
            .iter()
            .filter(|l| l.kind == LabelKind::CourseTrack)
            .map(|l| l.id)
            .collect()
    }

    /// Units visible to a student with `student_labels`
    ///
    /// A unit without track labels is visible to everyone. A student without
    /// track labels sees every unit.
    fn units_for_student(&self, student_labels: &BTreeSet<u64>) -> Vec<&Unit> {
        let tracks = self.track_label_ids();
        let student_tracks: BTreeSet<u64> =
            student_labels.intersection(&tracks).copied().collect();
        self.units()
            .iter()
            .filter(|unit| {
                let unit_tracks: BTreeSet<u64> =
                    unit.labels.intersection(&tracks).copied().collect();
                student_tracks.is_empty()
                    || unit_tracks.is_empty()
                    || !unit_tracks.is_disjoint(&student_tracks)
            })
            .collect()
    }
}

/// Course defined by configuration
pub struct ConfiguredCourse {
    environ: CourseEnviron,
    units: Vec<Unit>,
    labels: Vec<Label>,
}

impl ConfiguredCourse {
    pub fn from_config(config: &CourseConfig) -> Self {
        let media = |url: &Option<String>| url.as_ref().map(|u| MediaRef { url: u.clone() });
        let environ = CourseEnviron {
            course: CourseInfo {
                title: config.title.clone(),
                locale: config.locale.clone(),
                browsable: config.browsable,
                display_unit_title_without_index: config.display_unit_title_without_index,
                main_video: media(&config.main_video_url),
                main_image: media(&config.main_image_url),
            },
            reg_form: RegForm {
                can_register: config.can_register,
                additional_registration_fields: config.additional_registration_fields.clone(),
            },
        };

        let units = config
            .units
            .iter()
            .map(|u| Unit {
                unit_id: u.unit_id,
                index: u.index,
                title: u.title.clone(),
                kind: UnitKind::from_config(&u.kind),
                parent_unit: u.parent_unit,
                labels: u.labels.iter().copied().collect(),
                lessons: u
                    .lessons
                    .iter()
                    .map(|l| Lesson {
                        index: l.index,
                        title: l.title.clone(),
                    })
                    .collect(),
            })
            .collect();

        let labels = config
            .labels
            .iter()
            .map(|l| Label {
                id: l.id,
                title: l.title.clone(),
                kind: LabelKind::from_config(&l.kind),
            })
            .collect();

        Self {
            environ,
            units,
            labels,
        }
    }
}

impl CourseService for ConfiguredCourse {
    fn environ(&self) -> &CourseEnviron {
        &self.environ
    }

    fn units(&self) -> &[Unit] {
        &self.units
    }

    fn labels(&self) -> &[Label] {
        &self.labels
    }
}
