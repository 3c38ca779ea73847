use crate::cli::{Args, Command};
use crate::error::{ErrorKind, Result};
use crate::manifest::Manifest;
use contree_config::Config;
use contree_edit::Replacement;
use contree_storage::backend::{DryRunBackend, LocalBackend};
use contree_storage::path::{sanitize_name, to_native_path};
use contree_storage::{BackendHandle, ContentSnapshot, FileEntry, FileStorage, LiveStorage, RenameBatch, RenameEvent};
use exn::ResultExt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

pub async fn run(args: Args) -> Result<()> {
    let file = args.config.clone().or_else(Config::discover);
    let config = Config::load(file.as_deref()).or_raise(|| ErrorKind::Config)?;
    execute(&args, &config).await
}

async fn execute(args: &Args, config: &Config) -> Result<()> {
    let options = config.options().or_raise(|| ErrorKind::Config)?;
    let snapshot = Manifest::load(&args.manifest)?
        .into_snapshot(options)
        .or_raise(|| ErrorKind::Manifest(args.manifest.clone()))?;
    tracing::debug!(files = snapshot.files_count(), bytes = snapshot.total_size(), "Loaded content tree");

    if let Command::List { json } = args.command {
        return list(snapshot.entries(), json);
    }

    let before: Vec<String> = snapshot.entries().iter().map(|entry| entry.path.clone()).collect();
    let (after, failures) = match &args.root {
        None => {
            let mut tree = snapshot;
            apply(&mut tree, &args.command, config)?;
            (tree, 0)
        },
        Some(root) => apply_live(snapshot, root, args.dry_run, &args.command, config).await?,
    };

    print_changes(&before, after.entries())?;
    if args.dry_run {
        tracing::info!("Dry run; manifest left untouched");
    } else {
        Manifest::from(after.entries()).save(&args.manifest)?;
    }
    if failures > 0 {
        exn::bail!(ErrorKind::Backend(failures));
    }
    Ok(())
}

/// Apply `command` to a tree attached to the files under `root`, then wait
/// for every physical rename to finish.
///
/// Returns the resulting layout and the number of failed physical renames.
async fn apply_live(
    snapshot: ContentSnapshot,
    root: &Path,
    dry_run: bool,
    command: &Command,
    config: &Config,
) -> Result<(ContentSnapshot, usize)> {
    let local = LocalBackend::new("local", root).or_raise(|| ErrorKind::Storage)?;
    tracing::info!(root = %local.root().display(), dry_run, "Renaming files on disk");
    let local: BackendHandle = Arc::new(local);
    let backend: BackendHandle = match dry_run {
        true => Arc::new(DryRunBackend::new(local)),
        false => local,
    };
    let mut tree = LiveStorage::new(snapshot, backend).or_raise(|| ErrorKind::Storage)?;
    let mut events = tree.subscribe();
    apply(&mut tree, command, config)?;

    let mut failures = 0;
    tracing::debug!(backend = tree.backend_name(), pending = tree.pending(), "Waiting for renames to settle");
    while !tree.is_settled() {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(event) => failures += usize::from(log_event(&event)),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Missed rename outcomes"),
                Err(RecvError::Closed) => break,
            },
            () = tree.settled() => break,
        }
    }
    // Outcomes are published before the pending count drops.
    loop {
        match events.try_recv() {
            Ok(event) => failures += usize::from(log_event(&event)),
            Err(TryRecvError::Lagged(skipped)) => tracing::warn!(skipped, "Missed rename outcomes"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    Ok((tree.snapshot(), failures))
}

/// Returns whether the event was a failure.
fn log_event(event: &RenameEvent) -> bool {
    let index = event.index();
    match event {
        RenameEvent::Completed { path, .. } => {
            tracing::debug!(index, path, "Renamed on disk");
            false
        },
        RenameEvent::Failed { path, reason, .. } => {
            tracing::error!(index, path, reason, "Could not rename on disk");
            true
        },
    }
}

fn apply<S: FileStorage>(tree: &mut S, command: &Command, config: &Config) -> Result<()> {
    let clean = |value: &str, sanitize: bool, allow_separators: bool| match sanitize {
        true => sanitize_name(value, allow_separators, &config.pad),
        false => value.to_string(),
    };
    let batch = match command {
        Command::List { .. } => return Ok(()),
        Command::Mv { old, new, sanitize } => {
            return tree.rename_file(old, &clean(new, *sanitize, true)).or_raise(|| ErrorKind::Storage);
        },
        Command::MvDir { old, new, sanitize } => {
            return tree.rename_folder(old, &clean(new, *sanitize, true)).or_raise(|| ErrorKind::Storage);
        },
        Command::Replace { find, with, regex, ignore_case, paths, indexes } => {
            let replacement = match regex {
                true => Replacement::regex(find, with.as_str(), *ignore_case),
                false => Replacement::literal(find, with.as_str(), *ignore_case),
            }
            .or_raise(|| ErrorKind::Edit)?;
            let indexes: Vec<usize> = match indexes.is_empty() {
                true => (0..tree.files_count()).collect(),
                false => indexes.clone(),
            };
            match paths {
                true => contree_edit::edit_paths(&*tree, &indexes, &replacement),
                false => contree_edit::rename_names(&*tree, &indexes, &replacement),
            }
        },
        Command::Flatten { dir: Some(dir) } => contree_edit::flatten_directory(&*tree, dir),
        Command::Flatten { dir: None } => contree_edit::flatten_all(&*tree),
        Command::Wrap { name, indexes, sanitize } => {
            contree_edit::wrap(&*tree, indexes, &clean(name, *sanitize, false))
        },
    };
    let batch: RenameBatch = batch.or_raise(|| ErrorKind::Edit)?;
    tree.rename_files(&batch).or_raise(|| ErrorKind::Storage)
}

fn list(entries: &[FileEntry], json: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, entries).or_raise(|| ErrorKind::Output)?;
        writeln!(out).or_raise(|| ErrorKind::Output)?;
        return Ok(());
    }
    for entry in entries {
        writeln!(out, "{}\t{}\t{}", entry.index, entry.size, to_native_path(&entry.path))
            .or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn print_changes(before: &[String], after: &[FileEntry]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    let mut changed = 0;
    for (old, entry) in before.iter().zip(after) {
        if *old != entry.path {
            writeln!(out, "{} -> {}", to_native_path(old), to_native_path(&entry.path))
                .or_raise(|| ErrorKind::Output)?;
            changed += 1;
        }
    }
    tracing::info!(changed, "Rename applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestFile;
    use contree_storage::{CaseSensitivity, Options};
    use rstest::{fixture, rstest};
    use std::path::PathBuf;

    fn config() -> Config {
        Config { case_sensitivity: contree_config::CaseRule::Sensitive, ..Config::default() }
    }

    fn options() -> Options {
        Options::default().with_case_sensitivity(CaseSensitivity::Sensitive)
    }

    fn paths(tree: &ContentSnapshot) -> Vec<&str> {
        tree.entries().iter().map(|entry| entry.path.as_str()).collect()
    }

    #[fixture]
    fn tree() -> ContentSnapshot {
        let files = [("Show/S01/e01.mkv", 10), ("Show/S01/e02.mkv.part", 5), ("Show/notes.txt", 1)];
        ContentSnapshot::new(files, options()).unwrap()
    }

    fn args(manifest: PathBuf, root: Option<PathBuf>, dry_run: bool, command: Command) -> Args {
        Args { manifest, config: None, root, dry_run, verbose: 0, command }
    }

    #[rstest]
    #[case(
        Command::Mv { old: "Show/S01/e02.mkv".into(), new: "Show/S01/Pilot?.mkv".into(), sanitize: true },
        vec!["Show/S01/e01.mkv", "Show/S01/Pilot .mkv.part", "Show/notes.txt"],
    )]
    #[case(
        Command::MvDir { old: "Show/S01".into(), new: "Show/Season 1".into(), sanitize: false },
        vec!["Show/Season 1/e01.mkv", "Show/Season 1/e02.mkv.part", "Show/notes.txt"],
    )]
    #[case(
        Command::Replace {
            find: "E0".into(),
            with: "Episode ".into(),
            regex: false,
            ignore_case: true,
            paths: false,
            indexes: vec![],
        },
        vec!["Show/S01/Episode 1.mkv", "Show/S01/Episode 2.mkv.part", "Show/notes.txt"],
    )]
    #[case(
        Command::Flatten { dir: Some("Show/S01".into()) },
        vec!["Show/e01.mkv", "Show/e02.mkv.part", "Show/notes.txt"],
    )]
    #[case(
        Command::Flatten { dir: None },
        vec!["e01.mkv", "e02.mkv.part", "notes.txt"],
    )]
    #[case(
        Command::Wrap { name: "Ex:tras".into(), indexes: vec![2], sanitize: true },
        vec!["Show/S01/e01.mkv", "Show/S01/e02.mkv.part", "Show/Ex tras/notes.txt"],
    )]
    fn test_apply(mut tree: ContentSnapshot, #[case] command: Command, #[case] expected: Vec<&str>) {
        apply(&mut tree, &command, &config()).unwrap();
        assert_eq!(paths(&tree), expected);
    }

    #[rstest]
    #[case(Command::Mv { old: "nope".into(), new: "x".into(), sanitize: false }, ErrorKind::Storage)]
    #[case(Command::Mv { old: "Show/notes.txt".into(), new: "Show/S01".into(), sanitize: false }, ErrorKind::Storage)]
    #[case(Command::Wrap { name: "x".into(), indexes: vec![0, 2], sanitize: false }, ErrorKind::Edit)]
    #[case(
        Command::Replace {
            find: "(".into(),
            with: String::new(),
            regex: true,
            ignore_case: false,
            paths: false,
            indexes: vec![],
        },
        ErrorKind::Edit,
    )]
    #[case(
        Command::Replace {
            find: "notes.txt".into(),
            with: String::new(),
            regex: false,
            ignore_case: false,
            paths: false,
            indexes: vec![],
        },
        ErrorKind::Edit,
    )]
    #[case(
        Command::Replace {
            find: "notes".into(),
            with: "what?".into(),
            regex: false,
            ignore_case: false,
            paths: true,
            indexes: vec![2],
        },
        ErrorKind::Edit,
    )]
    fn test_apply_errors(mut tree: ContentSnapshot, #[case] command: Command, #[case] expected: ErrorKind) {
        let err = apply(&mut tree, &command, &config()).unwrap_err();
        assert_eq!(std::mem::discriminant(&*err), std::mem::discriminant(&expected));
        assert_eq!(paths(&tree), vec!["Show/S01/e01.mkv", "Show/S01/e02.mkv.part", "Show/notes.txt"]);
    }

    fn write_manifest(path: &Path, files: &[&str]) {
        let files = files.iter().map(|path| ManifestFile { path: path.to_string(), size: 0 }).collect();
        Manifest { files }.save(path).unwrap();
    }

    fn manifest_paths(path: &Path) -> Vec<String> {
        Manifest::load(path).unwrap().files.into_iter().map(|file| file.path).collect()
    }

    #[tokio::test]
    async fn test_execute_updates_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["a/one", "a/two"]);

        let command = Command::MvDir { old: "a".into(), new: "b".into(), sanitize: false };
        execute(&args(manifest.clone(), None, false, command), &config()).await.unwrap();
        assert_eq!(manifest_paths(&manifest), vec!["b/one", "b/two"]);
    }

    #[tokio::test]
    async fn test_execute_rejected_replace_keeps_manifest_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["readme.txt", "b/x"]);

        let command = Command::Replace {
            find: "readme.txt".into(),
            with: String::new(),
            regex: false,
            ignore_case: false,
            paths: false,
            indexes: vec![],
        };
        let err = execute(&args(manifest.clone(), None, false, command), &config()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Edit));
        assert_eq!(manifest_paths(&manifest), vec!["readme.txt", "b/x"]);
        Manifest::load(&manifest).unwrap().into_snapshot(options()).unwrap();
    }

    #[tokio::test]
    async fn test_execute_dry_run_keeps_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["a/one"]);

        let command = Command::Flatten { dir: None };
        execute(&args(manifest.clone(), None, true, command), &config()).await.unwrap();
        assert_eq!(manifest_paths(&manifest), vec!["a/one"]);
    }

    #[tokio::test]
    async fn test_execute_moves_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("a/one"), "1").unwrap();
        std::fs::write(root.join("two.part"), "2").unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["a/one", "two.part"]);

        let command = Command::Wrap { name: "b".into(), indexes: vec![1], sanitize: false };
        execute(&args(manifest.clone(), Some(root.clone()), false, command), &config()).await.unwrap();
        assert_eq!(manifest_paths(&manifest), vec!["a/one", "b/two.part"]);
        assert_eq!(std::fs::read_to_string(root.join("b/two.part")).unwrap(), "2");
        assert!(!root.join("two.part").exists());
    }

    #[tokio::test]
    async fn test_execute_reports_disk_failures() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        std::fs::create_dir_all(&root).unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["missing"]);

        let command = Command::Mv { old: "missing".into(), new: "found".into(), sanitize: false };
        let err = execute(&args(manifest.clone(), Some(root), false, command), &config()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Backend(1)));
        assert_eq!(manifest_paths(&manifest), vec!["found"]);
    }

    #[tokio::test]
    async fn test_execute_dry_run_leaves_disk_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("one"), "1").unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["one"]);

        let command = Command::Mv { old: "one".into(), new: "two".into(), sanitize: false };
        execute(&args(manifest.clone(), Some(root.clone()), true, command), &config()).await.unwrap();
        assert!(root.join("one").exists());
        assert!(!root.join("two").exists());
        assert_eq!(manifest_paths(&manifest), vec!["one"]);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("contree.json");
        write_manifest(&manifest, &["a", "A"]);
        let config = Config { case_sensitivity: contree_config::CaseRule::Insensitive, ..Config::default() };
        let err = execute(&args(manifest.clone(), None, false, Command::List { json: false }), &config)
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Manifest(path) if *path == manifest));
    }
}
