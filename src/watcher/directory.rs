//! Watches one directory tree and hands settled files to a handler.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use walkdir::WalkDir;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::handler::WatchHandler;

/// Recursive watcher over the mirrored results directory.
///
/// Startup order matters: the directory is watched before it is scanned,
/// so a file that lands between the two is seen by at least one of them.
pub struct DirectoryWatcher<H> {
    root: PathBuf,
    handler: H,
    debouncer: Debouncer,
    tick: Duration,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    watcher: notify::RecommendedWatcher,
}

impl DirectoryWatcher<()> {
    /// The handler type is fixed later by [`DirectoryWatcherBuilder::build`].
    pub fn builder(root: impl Into<PathBuf>) -> DirectoryWatcherBuilder {
        DirectoryWatcherBuilder::new(root)
    }
}

impl<H: WatchHandler> DirectoryWatcher<H> {
    /// Run until the event channel closes or watching fails.
    ///
    /// Errors from individual events are logged and skipped.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        self.watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.root.clone(),
                reason: e.to_string(),
            })?;
        crate::log_event!(
            "watcher",
            "watching",
            "{} (quiet period {:?})",
            self.root.display(),
            self.debouncer.quiet_period()
        );

        let existing = self.scan()?;
        crate::log_event!("watcher", "initial batch", "{} files", existing.len());
        self.handler.on_initial_batch(existing).await;

        // Ticks on its own schedule, independent of incoming events
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                received = self.event_rx.recv() => {
                    match received {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => tracing::error!("[watcher] file watch error: {e}"),
                        None => return Err(WatchError::ChannelClosed),
                    }
                }

                _ = ticker.tick() => {
                    for path in self.debouncer.take_settled() {
                        self.process_settled(&path).await;
                    }
                }
            }
        }
    }

    /// Every regular file under the root that the handler cares about.
    ///
    /// An unreadable root fails the scan; unreadable entries below it are
    /// logged and skipped.
    fn scan(&self) -> Result<Vec<PathBuf>, WatchError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WatchError::ScanFailed {
                        path: self.root.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("[watcher] scan error: {e}");
                    continue;
                }
            };

            if entry.file_type().is_file() && self.handler.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    fn handle_event(&mut self, event: Event) {
        for path in event.paths {
            if !self.handler.matches(&path) {
                crate::debug_event!(
                    "watcher",
                    "unmatched",
                    "{:?} {}",
                    event.kind,
                    path.display()
                );
                continue;
            }

            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    if self.debouncer.record(path.clone()) {
                        crate::debug_event!("watcher", "pending", "{}", path.display());
                    }
                }
                EventKind::Remove(_) => {
                    if self.debouncer.cancel(&path) {
                        crate::debug_event!("watcher", "cancelled", "{}", path.display());
                    }
                }
                _ => {}
            }
        }
    }

    async fn process_settled(&mut self, path: &Path) {
        // Renamed away or replaced by a directory while pending
        if !path.is_file() {
            crate::debug_event!("watcher", "vanished", "{}", path.display());
            return;
        }

        crate::debug_event!(self.handler.name(), "settled", "{}", path.display());
        self.handler.on_settled(path).await;
    }
}

/// Builder for a [`DirectoryWatcher`].
pub struct DirectoryWatcherBuilder {
    root: PathBuf,
    debounce_ms: u64,
    tick_ms: u64,
    channel_capacity: usize,
}

impl DirectoryWatcherBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce_ms: 5000,
            tick_ms: 100,
            channel_capacity: 100,
        }
    }

    /// Quiet period a file needs before it is handled.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// How often settled files are collected.
    pub fn tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn build<H: WatchHandler>(self, handler: H) -> Result<DirectoryWatcher<H>, WatchError> {
        let (tx, rx) = mpsc::channel(self.channel_capacity.max(1));

        // notify calls back on its own thread
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(DirectoryWatcher {
            root: self.root,
            handler,
            debouncer: Debouncer::new(self.debounce_ms),
            tick: Duration::from_millis(self.tick_ms.max(1)),
            event_rx: rx,
            watcher,
        })
    }
}
