//! Slug matching module
//!
//! Matches request paths against course slugs on path-segment boundaries.

/// Remainder of `path` below `slug`, or `None` when the slug does not match
///
/// The root slug matches every path. Other slugs match the path itself and
/// anything below it, but not a longer segment that merely shares the
/// prefix (`/physics` does not match `/physics2`).
pub fn match_slug<'a>(slug: &str, path: &'a str) -> Option<&'a str> {
    if slug == "/" {
        return Some(path);
    }

    let rest = path.strip_prefix(slug)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
