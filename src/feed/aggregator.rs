//! Running snapshot of everything accepted so far.

use indexmap::IndexMap;
use indexmap::map::Entry;
use std::collections::HashMap;

use super::FileCategory;
use super::model::{FeedRecord, RawFeed, ResultRecord};

/// What a merge did to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First record for this key or category.
    Inserted,
    /// Existing entry replaced with different content.
    Updated,
    /// Identical content was already present.
    Unchanged,
}

impl MergeOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, MergeOutcome::Unchanged)
    }
}

/// Accumulated results for the lifetime of the process.
///
/// Keyed results keep the order in which keys were first seen, so the
/// published document is stable across re-publishes.
#[derive(Debug, Default)]
pub struct Snapshot {
    results: IndexMap<String, ResultRecord>,
    raw: HashMap<FileCategory, RawFeed>,
    dirty: bool,
}

impl Snapshot {
    pub fn results(&self) -> &IndexMap<String, ResultRecord> {
        &self.results
    }

    pub fn get(&self, key: &str) -> Option<&ResultRecord> {
        self.results.get(key)
    }

    pub fn raw(&self, category: FileCategory) -> Option<&RawFeed> {
        self.raw.get(&category)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when keyed results changed since the last successful publish.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Serialize keyed results as a JSON object, key -> record.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.results)
    }
}

/// The only writer of the [`Snapshot`].
#[derive(Debug, Default)]
pub struct Aggregator {
    snapshot: Snapshot,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Merge a record using the category's policy.
    ///
    /// Keyed results are upserted by key; raw feeds replace the category's
    /// previous content wholesale.
    pub fn merge(&mut self, category: FileCategory, record: FeedRecord) -> MergeOutcome {
        match record {
            FeedRecord::Result(result) => self.upsert(result),
            FeedRecord::Raw(feed) => self.replace_raw(category, feed),
        }
    }

    /// Clear the dirty flag after the snapshot has been published.
    pub fn mark_clean(&mut self) {
        self.snapshot.dirty = false;
    }

    fn upsert(&mut self, record: ResultRecord) -> MergeOutcome {
        let outcome = match self.snapshot.results.entry(record.key().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                MergeOutcome::Inserted
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() == record {
                    MergeOutcome::Unchanged
                } else {
                    slot.insert(record);
                    MergeOutcome::Updated
                }
            }
        };

        if outcome.changed() {
            self.snapshot.dirty = true;
        }
        outcome
    }

    fn replace_raw(&mut self, category: FileCategory, feed: RawFeed) -> MergeOutcome {
        let outcome = match self.snapshot.raw.get(&category) {
            None => MergeOutcome::Inserted,
            Some(previous) if *previous == feed => MergeOutcome::Unchanged,
            Some(_) => MergeOutcome::Updated,
        };
        self.snapshot.raw.insert(category, feed);
        outcome
    }
}
