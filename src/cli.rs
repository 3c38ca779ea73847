//! CLI definition and parsing.

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Validate and apply atomic renames to the files of a content set.
///
/// The content tree is read from a JSON manifest and written back after a
/// successful rename. With `--root`, files are also moved on disk.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// JSON manifest: `{ "files": [ { "path": "...", "size": N } ] }`
    #[arg(short, long, value_hint = ValueHint::FilePath, default_value = "contree.json")]
    pub manifest: PathBuf,

    /// Config file (TOML, YAML or JSON); defaults to the platform config dir
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory holding the content set; files are moved there too
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Show what would change, but leave the manifest (and disk) alone
    #[arg(long)]
    pub dry_run: bool,

    /// More logging; repeat for more (overridden by RUST_LOG)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every file with its index and size
    List {
        /// Print entries as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Rename one file, given its current path (partial marker optional)
    Mv {
        old: String,
        new: String,
        /// Replace illegal characters in NEW instead of rejecting it
        #[arg(long)]
        sanitize: bool,
    },
    /// Move every file under a folder to another folder
    MvDir {
        old: String,
        new: String,
        /// Replace illegal characters in NEW instead of rejecting it
        #[arg(long)]
        sanitize: bool,
    },
    /// Find and replace in file names (or whole paths)
    Replace {
        find: String,
        with: String,
        /// Treat FIND as a regular expression; WITH may use $1, ${name}
        #[arg(long)]
        regex: bool,
        #[arg(short, long)]
        ignore_case: bool,
        /// Match against whole paths instead of file names
        #[arg(long)]
        paths: bool,
        /// Only touch these files (default: all)
        #[arg(long = "index", value_name = "N")]
        indexes: Vec<usize>,
    },
    /// Dissolve a folder into its parent, or with no folder move every file
    /// to the top level
    Flatten { dir: Option<String> },
    /// Move files sharing a folder into a new sub-folder
    Wrap {
        name: String,
        #[arg(long = "index", value_name = "N", required = true)]
        indexes: Vec<usize>,
        /// Replace illegal characters in NAME instead of rejecting it
        #[arg(long)]
        sanitize: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("contree").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["list"]);
        assert_eq!(args.manifest, PathBuf::from("contree.json"));
        assert_eq!(args.verbose, 0);
        assert!(!args.dry_run);
        assert_eq!(args.command, Command::List { json: false });
    }

    #[test]
    fn test_replace() {
        let args = parse(&[
            "-vv", "--dry-run", "replace", "-i", "--regex", "a(.)", "$1", "--index", "1", "--index", "3",
        ]);
        assert_eq!(args.verbose, 2);
        assert!(args.dry_run);
        assert_eq!(
            args.command,
            Command::Replace {
                find: "a(.)".into(),
                with: "$1".into(),
                regex: true,
                ignore_case: true,
                paths: false,
                indexes: vec![1, 3],
            }
        );
    }

    #[rstest]
    #[case(&["mv-dir", "a", "b"], Command::MvDir { old: "a".into(), new: "b".into(), sanitize: false })]
    #[case(&["flatten"], Command::Flatten { dir: None })]
    #[case(&["flatten", "a/b"], Command::Flatten { dir: Some("a/b".into()) })]
    #[case(
        &["wrap", "Disc 1", "--index", "0"],
        Command::Wrap { name: "Disc 1".into(), indexes: vec![0], sanitize: false },
    )]
    fn test_subcommands(#[case] args: &[&str], #[case] expected: Command) {
        assert_eq!(parse(args).command, expected);
    }

    #[test]
    fn test_wrap_requires_index() {
        assert!(Args::try_parse_from(["contree", "wrap", "x"]).is_err());
    }
}
