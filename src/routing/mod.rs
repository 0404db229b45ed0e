//! Routing module
//!
//! Picks the course a request belongs to. Every course is mounted under its
//! own slug and the longest matching slug wins, so `/physics/advanced` can
//! live next to `/physics` and `/`.

mod matcher;

use std::sync::Arc;

use crate::config::CourseSite;

pub use matcher::match_slug;

/// Find the course for `path` and the page path below its slug
pub fn resolve_course<'a>(
    path: &'a str,
    sites: &[Arc<CourseSite>],
) -> Option<(Arc<CourseSite>, &'a str)> {
    sites
        .iter()
        .filter_map(|site| match_slug(&site.slug, path).map(|rest| (site, rest)))
        .max_by_key(|(site, _)| site.slug.len())
        .map(|(site, rest)| (Arc::clone(site), rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{tests::course_config, ConfiguredCourse};
    use crate::student::MemoryStudentStore;

    fn site(slug: &str) -> Arc<CourseSite> {
        Arc::new(CourseSite::new(
            slug,
            Box::new(ConfiguredCourse::from_config(&course_config())),
            Arc::new(MemoryStudentStore::new()),
        ))
    }

    #[test]
    fn test_longest_slug_wins() {
        let sites = vec![site("/"), site("/physics"), site("/physics/advanced")];

        let (found, rest) = resolve_course("/physics/advanced/course", &sites).unwrap();
        assert_eq!(found.slug, "/physics/advanced");
        assert_eq!(rest, "/course");

        let (found, rest) = resolve_course("/physics/course", &sites).unwrap();
        assert_eq!(found.slug, "/physics");
        assert_eq!(rest, "/course");

        let (found, rest) = resolve_course("/chemistry/course", &sites).unwrap();
        assert_eq!(found.slug, "/");
        assert_eq!(rest, "/chemistry/course");
    }

    #[test]
    fn test_no_matching_course() {
        let sites = vec![site("/physics")];
        assert!(resolve_course("/physics2/course", &sites).is_none());
        assert!(resolve_course("/", &sites).is_none());
    }
}
