// Title formatters shared by every course page

use super::{Lesson, Unit, UnitKind};

/// `Unit <index> - <title>`, or just the title when indexes are hidden
pub fn display_unit_title(unit: &Unit, without_index: bool) -> String {
    if without_index {
        unit.title.clone()
    } else {
        format!("Unit {} - {}", unit.index, unit.title)
    }
}

pub fn display_short_unit_title(unit: &Unit, without_index: bool) -> String {
    if without_index || unit.kind != UnitKind::Unit {
        unit.title.clone()
    } else {
        format!("Unit {}", unit.index)
    }
}

pub fn display_lesson_title(unit: &Unit, lesson: &Lesson, without_index: bool) -> String {
    if without_index {
        format!("{} {}", lesson.index, lesson.title)
    } else {
        format!("{}.{} {}", unit.index, lesson.index, lesson.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn unit(kind: UnitKind) -> Unit {
        Unit {
            unit_id: 7,
            index: 3,
            title: "Waves".to_string(),
            kind,
            parent_unit: None,
            labels: BTreeSet::new(),
            lessons: Vec::new(),
        }
    }

    #[test]
    fn test_unit_titles() {
        let u = unit(UnitKind::Unit);
        assert_eq!(display_unit_title(&u, false), "Unit 3 - Waves");
        assert_eq!(display_unit_title(&u, true), "Waves");
        assert_eq!(display_short_unit_title(&u, false), "Unit 3");
        assert_eq!(display_short_unit_title(&u, true), "Waves");
    }

    #[test]
    fn test_short_title_of_assessment_is_its_title() {
        let u = unit(UnitKind::Assessment);
        assert_eq!(display_short_unit_title(&u, false), "Waves");
    }

    #[test]
    fn test_lesson_titles() {
        let u = unit(UnitKind::Unit);
        let lesson = Lesson {
            index: 2,
            title: "Interference".to_string(),
        };
        assert_eq!(display_lesson_title(&u, &lesson, false), "3.2 Interference");
        assert_eq!(display_lesson_title(&u, &lesson, true), "2 Interference");
    }
}
