//! Find-and-replace strategies for batch renames.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::{NoExpand, Regex, RegexBuilder};

/// A compiled find-and-replace rule.
///
/// Both flavours replace every occurrence. The pattern is compiled at
/// construction so a bad pattern fails before any path is touched, and the
/// compiled rule is reusable across any number of [`apply`](Self::apply)
/// calls.
///
/// # Examples
///
/// ```
/// use contree_edit::Replacement;
///
/// let literal = Replacement::literal("S01", "Season 1 ", true).unwrap();
/// assert_eq!(literal.apply("show.s01e01.mkv"), "show.Season 1 e01.mkv");
///
/// let regex = Replacement::regex(r"^(\d+)\. (.+)$", "$2 ($1)", false).unwrap();
/// assert_eq!(regex.apply("01. Intro.flac"), "Intro.flac (01)");
/// ```
#[derive(Debug, Clone)]
pub struct Replacement {
    pattern: Regex,
    replacement: String,
    expand: bool,
}

impl Replacement {
    /// Replace every occurrence of the text `find` with `with`, verbatim.
    pub fn literal(find: &str, with: impl Into<String>, ignore_case: bool) -> Result<Self> {
        Ok(Self { pattern: compile(find, &regex::escape(find), ignore_case)?, replacement: with.into(), expand: false })
    }

    /// Replace every match of the regular expression `find` with `with`, in
    /// which `$1`, `${name}` and friends expand to capture groups.
    pub fn regex(find: &str, with: impl Into<String>, ignore_case: bool) -> Result<Self> {
        Ok(Self { pattern: compile(find, find, ignore_case)?, replacement: with.into(), expand: true })
    }

    pub fn apply(&self, text: &str) -> String {
        let replaced = match self.expand {
            true => self.pattern.replace_all(text, self.replacement.as_str()),
            false => self.pattern.replace_all(text, NoExpand(&self.replacement)),
        };
        replaced.into_owned()
    }
}

fn compile(find: &str, pattern: &str, ignore_case: bool) -> Result<Regex> {
    if find.is_empty() {
        exn::bail!(ErrorKind::Pattern(find.to_string()));
    }
    RegexBuilder::new(pattern).case_insensitive(ignore_case).build().or_raise(|| ErrorKind::Pattern(find.to_string()))
}
