//! Per-path quiet-period tracking.
//!
//! A file mirrored over FTP shows up as a burst of create and modify events
//! while it is being written. A path is only handed on once no event has
//! arrived for it during the quiet period.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    /// Path -> time of the most recent event.
    pending: HashMap<PathBuf, Instant>,
    quiet: Duration,
}

impl Debouncer {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            quiet: Duration::from_millis(quiet_ms),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record an event for `path` at the current time.
    ///
    /// Returns `false` when the path was already pending; its timer restarts.
    pub fn record(&mut self, path: PathBuf) -> bool {
        self.record_at(path, Instant::now())
    }

    pub fn record_at(&mut self, path: PathBuf, at: Instant) -> bool {
        self.pending.insert(path, at).is_none()
    }

    /// Drop a pending path, e.g. after it was deleted.
    pub fn cancel(&mut self, path: &Path) -> bool {
        self.pending.remove(path).is_some()
    }

    /// Remove and return every path quiet for at least the quiet period.
    pub fn take_settled(&mut self) -> Vec<PathBuf> {
        self.take_settled_at(Instant::now())
    }

    /// Same as [`take_settled`](Self::take_settled) against an explicit clock.
    ///
    /// Settled paths come back sorted so that processing order is stable.
    pub fn take_settled_at(&mut self, now: Instant) -> Vec<PathBuf> {
        let quiet = self.quiet;
        let mut settled = Vec::new();

        self.pending.retain(|path, last_event| {
            if now.saturating_duration_since(*last_event) >= quiet {
                settled.push(path.clone());
                false
            } else {
                true
            }
        });

        settled.sort();
        settled
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
