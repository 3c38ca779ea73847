//! File-system name validation.
//!
//! Content sets move between platforms, so the illegal set is the union of
//! what the common file systems refuse rather than whatever the current host
//! happens to accept.

use crate::path::SEPARATOR;
use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Whole relative paths: separators are structure, not content.
regex!(ILLEGAL_IN_PATH, r#"[\x00:?"*<>|]+"#);
// Single segments: a separator would silently create a folder.
regex!(ILLEGAL_IN_SEGMENT, r#"[\x00:?"*<>|/\\]+"#);

fn illegal(allow_separators: bool) -> &'static Regex {
    if allow_separators { &ILLEGAL_IN_PATH } else { &ILLEGAL_IN_SEGMENT }
}

/// Whether `name` is usable as a file-system name.
///
/// With `allow_separators` unset, `name` is a single segment and `/` (or `\`)
/// makes it invalid. With it set, `name` is a whole relative path.
///
/// ```
/// use contree_storage::path::is_valid_name;
///
/// assert!(is_valid_name("readme.txt", false));
/// assert!(!is_valid_name("docs/readme.txt", false));
/// assert!(is_valid_name("docs/readme.txt", true));
/// assert!(!is_valid_name("what?.txt", true));
/// ```
pub fn is_valid_name(name: &str, allow_separators: bool) -> bool {
    !name.is_empty() && !illegal(allow_separators).is_match(name)
}

/// Replace every run of illegal characters in `name` with `pad`.
///
/// Surrounding whitespace is trimmed first. In whole-path mode trailing
/// separators are removed so the result still names a file.
pub fn sanitize_name(name: &str, allow_separators: bool, pad: &str) -> String {
    let sanitized = illegal(allow_separators).replace_all(name.trim(), regex::NoExpand(pad));
    let sanitized: &str = if allow_separators { sanitized.trim_end_matches(SEPARATOR) } else { &sanitized };
    tracing::trace!(name, sanitized, "Sanitized file-system name");
    sanitized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("readme", false, true)]
    #[case("", false, false)]
    #[case("", true, false)]
    #[case("a/b", false, false)]
    #[case("a\\b", false, false)]
    #[case("a/b", true, true)]
    #[case("a\0b", true, false)]
    #[case("c:drive", true, false)]
    #[case("pipe|name", false, false)]
    #[case("wild*card", true, false)]
    #[case("ünïcödé 名前", false, true)]
    fn test_is_valid_name(#[case] name: &str, #[case] allow_separators: bool, #[case] expected: bool) {
        assert_eq!(is_valid_name(name, allow_separators), expected);
    }

    #[rstest]
    #[case("  what?.txt  ", false, " ", "what .txt")]
    #[case("a/b:c", false, "_", "a_b_c")]
    #[case("a/b:c", true, "_", "a/b_c")]
    #[case("dir/sub///", true, "_", "dir/sub")]
    #[case("<<bad>>", false, "", "bad")]
    #[case("a?b", false, "$0", "a$0b")]
    fn test_sanitize_name(
        #[case] name: &str,
        #[case] allow_separators: bool,
        #[case] pad: &str,
        #[case] expected: &str,
    ) {
        let sanitized = sanitize_name(name, allow_separators, pad);
        assert_eq!(sanitized, expected);
        if !sanitized.is_empty() {
            assert!(is_valid_name(&sanitized, allow_separators));
        }
    }
}
