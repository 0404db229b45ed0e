//! Student labels
//!
//! Labels tag students with arbitrary ids. Course track labels are the kind
//! students pick themselves; every other kind is managed by course staff and
//! must survive a track change.

use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    General,
    CourseTrack,
}

impl LabelKind {
    /// Parse the configuration spelling, unknown kinds are general
    pub fn from_config(kind: &str) -> Self {
        match kind {
            "course_track" | "track" => Self::CourseTrack,
            _ => Self::General,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub id: u64,
    pub title: String,
    pub kind: LabelKind,
}

/// Replace the track labels in `current` with the valid ids in `selected`
///
/// Non-track labels are kept. Selected values that are blank, not numeric or
/// not a track label id are ignored.
pub fn replace_track_labels<'a>(
    current: &BTreeSet<u64>,
    track_ids: &BTreeSet<u64>,
    selected: impl IntoIterator<Item = &'a str>,
) -> BTreeSet<u64> {
    let chosen: BTreeSet<u64> = selected
        .into_iter()
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .filter(|id| track_ids.contains(id))
        .collect();

    current
        .difference(track_ids)
        .copied()
        .chain(chosen)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replace_track_labels_keeps_other_labels() {
        let current = BTreeSet::from([1, 3, 7, 9]);
        let tracks = BTreeSet::from([2, 3, 5, 7]);
        let updated = replace_track_labels(&current, &tracks, ["2", "5"]);

        assert_eq!(updated, BTreeSet::from([1, 2, 5, 9]));
        let track_part: BTreeSet<u64> = updated.intersection(&tracks).copied().collect();
        assert_eq!(track_part, BTreeSet::from([2, 5]));
    }

    #[test]
    fn test_replace_track_labels_ignores_invalid_selection() {
        let current = BTreeSet::from([1, 3]);
        let tracks = BTreeSet::from([2, 3]);
        let updated = replace_track_labels(&current, &tracks, ["", "x", "1", "4", " 2 "]);
        assert_eq!(updated, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_replace_track_labels_with_empty_selection_clears_tracks() {
        let current = BTreeSet::from([1, 2, 3]);
        let tracks = BTreeSet::from([2, 3]);
        let updated = replace_track_labels(&current, &tracks, std::iter::empty());
        assert_eq!(updated, BTreeSet::from([1]));
    }

    #[test]
    fn test_label_kind_from_config() {
        assert_eq!(LabelKind::from_config("course_track"), LabelKind::CourseTrack);
        assert_eq!(LabelKind::from_config("general"), LabelKind::General);
        assert_eq!(LabelKind::from_config("other"), LabelKind::General);
    }
}
