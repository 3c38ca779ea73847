//! Per-tree settings that decide how paths are compared and marked.

use crate::path::PartialMarker;
use std::borrow::Cow;

/// How two virtual paths are compared for identity.
///
/// Collision rules differ by deployment target, so this is a value passed in
/// at construction rather than something decided at compile time. Use
/// [`CaseSensitivity::host`] to mirror the file system of the current target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    /// The rule used by the default file system of the compilation target.
    #[must_use]
    pub const fn host() -> Self {
        if cfg!(any(windows, target_os = "macos")) { Self::Insensitive } else { Self::Sensitive }
    }

    /// Comparison key for `value`; two values are equal under this rule
    /// exactly when their keys are equal.
    pub fn key<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Self::Sensitive => Cow::Borrowed(value),
            // Per-char folding, matching `strip_prefix`.
            Self::Insensitive => Cow::Owned(value.chars().flat_map(char::to_lowercase).collect()),
        }
    }

    pub fn equals(&self, a: &str, b: &str) -> bool {
        self.key(a) == self.key(b)
    }

    /// Strips `prefix` from `value`, returning the rest of `value` as it was
    /// written (the original casing is preserved in the remainder).
    pub fn strip_prefix<'a>(&self, value: &'a str, prefix: &str) -> Option<&'a str> {
        match self {
            Self::Sensitive => value.strip_prefix(prefix),
            Self::Insensitive => {
                let mut chars = value.char_indices();
                for expected in prefix.chars() {
                    let (_, actual) = chars.next()?;
                    if !actual.to_lowercase().eq(expected.to_lowercase()) {
                        return None;
                    }
                }
                let offset = chars.next().map_or(value.len(), |(offset, _)| offset);
                Some(&value[offset..])
            },
        }
    }

    pub fn starts_with(&self, value: &str, prefix: &str) -> bool {
        self.strip_prefix(value, prefix).is_some()
    }
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        Self::host()
    }
}

/// Settings shared by every File Storage variant of one content tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub case_sensitivity: CaseSensitivity,
    pub marker: PartialMarker,
}

impl Options {
    pub fn new(case_sensitivity: CaseSensitivity, marker: PartialMarker) -> Self {
        Self { case_sensitivity, marker }
    }

    pub fn with_case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = case_sensitivity;
        self
    }

    pub fn with_marker(mut self, marker: PartialMarker) -> Self {
        self.marker = marker;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CaseSensitivity::Sensitive, "Docs/Readme", "Docs/", Some("Readme"))]
    #[case(CaseSensitivity::Sensitive, "Docs/Readme", "docs/", None)]
    #[case(CaseSensitivity::Insensitive, "Docs/Readme", "docs/", Some("Readme"))]
    #[case(CaseSensitivity::Insensitive, "ÄBC/x", "äbc/", Some("x"))]
    #[case(CaseSensitivity::Insensitive, "a", "ab", None)]
    #[case(CaseSensitivity::Insensitive, "ab", "ab", Some(""))]
    fn test_strip_prefix(
        #[case] case: CaseSensitivity,
        #[case] value: &str,
        #[case] prefix: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(case.strip_prefix(value, prefix), expected);
    }

    #[test]
    fn test_equals() {
        assert!(CaseSensitivity::Insensitive.equals("README.md", "readme.MD"));
        assert!(!CaseSensitivity::Sensitive.equals("README.md", "readme.MD"));
        assert!(CaseSensitivity::Sensitive.equals("same", "same"));
    }

    #[test]
    fn test_key_and_strip_prefix_fold_alike() {
        let case = CaseSensitivity::Insensitive;
        assert_eq!(case.key("ΟΔΟΣ/x"), "οδοσ/x");
        assert!(case.equals("ΟΔΟΣ", "οδοσ"));
        assert_eq!(case.strip_prefix("ΟΔΟΣ/x", &case.key("ΟΔΟΣ/")), Some("x"));
    }

    #[test]
    fn test_options_builder() {
        let options = Options::default().with_case_sensitivity(CaseSensitivity::Insensitive);
        assert_eq!(options.case_sensitivity, CaseSensitivity::Insensitive);
        assert_eq!(options.marker, PartialMarker::default());
    }
}
