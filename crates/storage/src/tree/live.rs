//! Content tree backed by physical files.

use super::{ContentSnapshot, FileStorage, sealed};
use crate::BackendHandle;
use crate::entry::{FileEntry, FileIndex};
use crate::error::{ErrorKind, Result};
use crate::options::Options;
use exn::{OptionExt, ResultExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 256;
/// Inserted between the old path and the file index while a file waits out
/// a two-step move.
const STAGING_INFIX: &str = ".contree-move-";

/// Outcome of one physical rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameEvent {
    Completed { index: FileIndex, path: String },
    Failed { index: FileIndex, path: String, reason: String },
}

impl RenameEvent {
    pub fn index(&self) -> FileIndex {
        match self {
            Self::Completed { index, .. } | Self::Failed { index, .. } => *index,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Straight to the final path.
    Direct,
    /// First half of a move through a temporary name; carries the final path.
    Stage(String),
    /// Second half, from the temporary name to the final path.
    Finish,
}

#[derive(Debug)]
struct Move {
    index: FileIndex,
    from: String,
    to: String,
    step: Step,
}

impl Move {
    /// The path this move ends at once both halves are done.
    fn target(&self) -> &str {
        match &self.step {
            Step::Stage(target) => target,
            Step::Direct | Step::Finish => &self.to,
        }
    }
}

/// A content tree whose files exist on some backend.
///
/// Validation and the in-memory update happen synchronously, exactly like
/// [`ContentSnapshot`]. After that every changed path is queued for the
/// backend; physical renames run one at a time, in commit order, on the Tokio
/// runtime the tree was created on. Use [`subscribe`](Self::subscribe) to
/// watch outcomes and [`settled`](Self::settled) to wait for the queue to
/// drain.
///
/// A failed physical rename is reported but does not roll the tree back: the
/// tree describes where files are supposed to be.
pub struct LiveStorage {
    options: Options,
    entries: Vec<FileEntry>,
    backend: BackendHandle,
    queue: mpsc::UnboundedSender<Move>,
    pending: Arc<watch::Sender<usize>>,
    events: broadcast::Sender<RenameEvent>,
}

impl LiveStorage {
    /// Attach `snapshot` to `backend`, taking over its paths and options.
    ///
    /// Must be called from within a Tokio runtime; returns
    /// [`Backend`](ErrorKind::Backend) otherwise.
    pub fn new(snapshot: ContentSnapshot, backend: BackendHandle) -> Result<Self> {
        let runtime = Handle::try_current()
            .or_raise(|| ErrorKind::Backend("live storage needs a running Tokio runtime".to_string()))?;
        let (queue, moves) = mpsc::unbounded_channel();
        let pending = Arc::new(watch::Sender::new(0));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        runtime.spawn(run_queue(backend.clone(), moves, pending.clone(), events.clone()));

        let (options, entries) = snapshot.into_parts();
        tracing::debug!(backend = backend.name(), files = entries.len(), "Attached content tree to backend");
        Ok(Self { options, entries, backend, queue, pending, events })
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Detached copy of the current paths.
    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot::from_parts(self.options.clone(), self.entries.clone())
    }

    /// Receive a [`RenameEvent`] for every physical rename finished from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RenameEvent> {
        self.events.subscribe()
    }

    /// Number of committed renames the backend has not finished yet.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// Wait until every committed rename has either completed or failed.
    pub async fn settled(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives as long as `self`, so this only returns once the
        // count hits zero.
        _ = pending.wait_for(|count| *count == 0).await;
    }

    fn entry(&self, index: FileIndex) -> Result<&FileEntry> {
        self.entries.get(index).ok_or_raise(|| ErrorKind::IndexOutOfRange(index))
    }

    /// Queue the physical side of a commit.
    ///
    /// A move whose destination is also the source of a move in the same
    /// commit (a swap, a chain, or a case-only rename) goes through a
    /// temporary name, so no rename ever lands on a file that has yet to move
    /// away.
    fn dispatch(&self, moves: Vec<(FileIndex, String, String)>) {
        if moves.is_empty() {
            return;
        }
        let case = self.options.case_sensitivity;
        let sources: HashSet<String> = moves.iter().map(|(_, from, _)| case.key(from).into_owned()).collect();
        self.pending.send_modify(|pending| *pending += moves.len());

        let mut finishing = Vec::new();
        for (index, from, to) in moves {
            if sources.contains(&*case.key(&to)) {
                let temporary = format!("{from}{STAGING_INFIX}{index}");
                tracing::trace!(index, from, to, temporary, "Staging move through temporary name");
                finishing.push(Move { index, from: temporary.clone(), to: to.clone(), step: Step::Finish });
                self.enqueue(Move { index, from, to: temporary, step: Step::Stage(to) });
            } else {
                self.enqueue(Move { index, from, to, step: Step::Direct });
            }
        }
        for step in finishing {
            self.enqueue(step);
        }
    }

    fn enqueue(&self, step: Move) {
        if let Err(mpsc::error::SendError(step)) = self.queue.send(step) {
            // The worker is gone with its runtime. A staged move is reported
            // once, by its second half.
            if !matches!(step.step, Step::Stage(_)) {
                let path = step.target().to_string();
                tracing::warn!(index = step.index, path, "Rename queue closed; physical rename dropped");
                report(
                    &self.pending,
                    &self.events,
                    RenameEvent::Failed { index: step.index, path, reason: "rename queue closed".to_string() },
                );
            }
        }
    }
}

impl sealed::Sealed for LiveStorage {
    fn commit(&mut self, renames: Vec<(FileIndex, String)>) {
        let moves: Vec<_> = renames
            .into_iter()
            .filter_map(|(index, to)| {
                let entry = self.entries.get_mut(index)?;
                if entry.path == to {
                    return None;
                }
                let from = std::mem::replace(&mut entry.path, to.clone());
                Some((index, from, to))
            })
            .collect();
        tracing::debug!(backend = self.backend.name(), moves = moves.len(), "Committed renames to live tree");
        self.dispatch(moves);
    }
}

impl FileStorage for LiveStorage {
    fn options(&self) -> &Options {
        &self.options
    }

    fn files_count(&self) -> usize {
        self.entries.len()
    }

    fn file_path(&self, index: FileIndex) -> Result<&str> {
        self.entry(index).map(|entry| entry.path.as_str())
    }

    fn file_size(&self, index: FileIndex) -> Result<u64> {
        self.entry(index).map(|entry| entry.size)
    }
}

fn report(pending: &watch::Sender<usize>, events: &broadcast::Sender<RenameEvent>, event: RenameEvent) {
    // No subscribers is fine.
    _ = events.send(event);
    pending.send_modify(|pending| *pending = pending.saturating_sub(1));
}

/// Run queued moves against the backend until the owning tree is dropped
/// and the queue is drained.
async fn run_queue(
    backend: BackendHandle,
    mut moves: mpsc::UnboundedReceiver<Move>,
    pending: Arc<watch::Sender<usize>>,
    events: broadcast::Sender<RenameEvent>,
) {
    let mut abandoned = HashSet::new();
    while let Some(step) = moves.recv().await {
        if step.step == Step::Finish && abandoned.remove(&step.index) {
            continue;
        }
        let result = backend.rename(&step.from, &step.to).await;
        let event = match result {
            Ok(()) if matches!(step.step, Step::Stage(_)) => continue,
            Ok(()) => {
                let index = step.index;
                tracing::debug!(backend = backend.name(), index, from = step.from, to = step.to, "Renamed");
                RenameEvent::Completed { index: step.index, path: step.to }
            },
            Err(err) => {
                if matches!(step.step, Step::Stage(_)) {
                    abandoned.insert(step.index);
                }
                tracing::warn!(
                    backend = backend.name(),
                    index = step.index,
                    from = step.from,
                    to = step.target(),
                    error = %err,
                    "Physical rename failed"
                );
                RenameEvent::Failed { index: step.index, path: step.target().to_string(), reason: err.to_string() }
            },
        };
        report(&pending, &events, event);
    }
    tracing::trace!(backend = backend.name(), "Rename queue closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LocalBackend, MockBackend};
    use crate::entry::RenameBatch;
    use crate::options::CaseSensitivity;
    use std::time::Duration;

    fn live(paths: &[&str], backend: BackendHandle) -> LiveStorage {
        live_with(paths, backend, Options::default().with_case_sensitivity(CaseSensitivity::Sensitive))
    }

    fn live_with(paths: &[&str], backend: BackendHandle, options: Options) -> LiveStorage {
        let snapshot = ContentSnapshot::new(paths.iter().map(|path| (*path, 1)), options).unwrap();
        LiveStorage::new(snapshot, backend).unwrap()
    }

    async fn settle(storage: &LiveStorage) {
        tokio::time::timeout(Duration::from_secs(5), storage.settled()).await.unwrap();
    }

    #[test]
    fn test_new_requires_runtime() {
        let snapshot = ContentSnapshot::new([("a", 1)], Options::default()).unwrap();
        let err = LiveStorage::new(snapshot, Arc::new(MockBackend::default())).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Backend(_)));
    }

    #[tokio::test]
    async fn test_rename_folder_moves_files() {
        let backend = Arc::new(MockBackend::with_files(["a/x", "a/y", "b/z"]));
        let mut storage = live(&["a/x", "a/y", "b/z"], backend.clone());
        let mut events = storage.subscribe();

        storage.rename_folder("a", "c").unwrap();
        // The tree is updated before the backend catches up.
        assert_eq!(storage.file_path(0).unwrap(), "c/x");
        assert_eq!(storage.pending(), 2);

        settle(&storage).await;
        assert!(storage.is_settled());
        assert_eq!(backend.files().await, vec!["b/z", "c/x", "c/y"]);
        assert_eq!(events.recv().await.unwrap(), RenameEvent::Completed { index: 0, path: "c/x".into() });
        assert_eq!(events.recv().await.unwrap(), RenameEvent::Completed { index: 1, path: "c/y".into() });
    }

    #[tokio::test]
    async fn test_unchanged_paths_are_not_dispatched() {
        let backend = Arc::new(MockBackend::with_files(["a"]));
        let mut storage = live(&["a"], backend.clone());
        storage.rename_file_checked(0, "a").unwrap();
        assert!(storage.is_settled());
        assert_eq!(backend.files().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_failed_rename_is_reported() {
        let backend = Arc::new(MockBackend::with_files(["other"]));
        let mut storage = live(&["a"], backend.clone());
        let mut events = storage.subscribe();

        storage.rename_file_checked(0, "b").unwrap();
        settle(&storage).await;
        let event = events.recv().await.unwrap();
        assert!(matches!(event, RenameEvent::Failed { index: 0, ref path, .. } if path == "b"));
        // The tree keeps the new path.
        assert_eq!(storage.file_path(0).unwrap(), "b");
    }

    #[tokio::test]
    async fn test_marker_is_kept_physically() {
        let backend = Arc::new(MockBackend::with_files(["movie.mkv.part"]));
        let mut storage = live(&["movie.mkv.part"], backend.clone());
        storage.rename_file("movie.mkv", "films/movie.mkv").unwrap();
        settle(&storage).await;
        assert_eq!(backend.files().await, vec!["films/movie.mkv.part"]);
    }

    #[tokio::test]
    async fn test_case_only_rename_goes_through_temporary_name() {
        let backend = Arc::new(MockBackend::with_files(["readme"]));
        let options = Options::default().with_case_sensitivity(CaseSensitivity::Insensitive);
        let mut storage = live_with(&["readme"], backend.clone(), options);
        let mut events = storage.subscribe();

        storage.rename_file_checked(0, "README").unwrap();
        settle(&storage).await;
        assert_eq!(backend.files().await, vec!["README"]);
        assert_eq!(events.recv().await.unwrap(), RenameEvent::Completed { index: 0, path: "README".into() });
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_swap_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one"), "1").unwrap();
        std::fs::write(dir.path().join("two"), "2").unwrap();
        let backend = Arc::new(LocalBackend::new("disk", dir.path()).unwrap());
        let mut storage = live(&["one", "two"], backend);

        storage.rename_files(&RenameBatch::from_iter([(0, "two"), (1, "one")])).unwrap();
        settle(&storage).await;
        assert_eq!(std::fs::read_to_string(dir.path().join("one")).unwrap(), "2");
        assert_eq!(std::fs::read_to_string(dir.path().join("two")).unwrap(), "1");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_failed_stage_is_reported_once() {
        let backend = Arc::new(MockBackend::with_files(["two"]));
        let mut storage = live(&["one", "two"], backend.clone());
        let mut events = storage.subscribe();

        storage.rename_files(&RenameBatch::from_iter([(0, "two"), (1, "one")])).unwrap();
        settle(&storage).await;
        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(received.len(), 2);
        assert!(matches!(&received[0], RenameEvent::Failed { index: 0, path, .. } if path == "two"));
        assert_eq!(received[1], RenameEvent::Completed { index: 1, path: "one".into() });
        assert_eq!(backend.files().await, vec!["one"]);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let backend = Arc::new(MockBackend::with_files(["a"]));
        let mut storage = live(&["a"], backend);
        let before = storage.snapshot();
        storage.rename_file_checked(0, "b").unwrap();
        assert_eq!(before.file_path(0).unwrap(), "a");
        assert_eq!(storage.snapshot().file_path(0).unwrap(), "b");
        assert_eq!(storage.backend_name(), "mock");
        settle(&storage).await;
    }
}
