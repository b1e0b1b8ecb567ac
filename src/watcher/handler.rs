//! Handler seam between the watcher loop and whatever consumes settled files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Receives files from a [`DirectoryWatcher`](super::DirectoryWatcher).
///
/// The watcher owns its handler and calls it from a single task, so
/// implementations may keep mutable state without locking. Handlers deal
/// with their own failures; the watcher only stops when watching itself
/// fails.
#[async_trait]
pub trait WatchHandler: Send {
    /// Handler name for logging.
    fn name(&self) -> &str;

    /// Whether events for this path are worth debouncing at all.
    fn matches(&self, path: &Path) -> bool;

    /// Files already present when watching started, in sorted order.
    async fn on_initial_batch(&mut self, paths: Vec<PathBuf>);

    /// A file that has been quiet for the full debounce period.
    async fn on_settled(&mut self, path: &Path);
}
