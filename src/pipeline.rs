//! The ingestion pipeline: classify, select, parse, merge, publish.
//!
//! [`FeedPipeline`] is the single owner of the version pointers, the
//! snapshot and the publisher. The watcher drives it from one task, so
//! nothing here is shared or locked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::FeedConfig;
use crate::feed::{
    Aggregator, FeedError, FeedRecord, FeedResult, FileCategory, FileClassifier, Grammar,
    MergeOutcome, RawFeed, ResultRecord, Snapshot, VersionSelector, VersionedFile, parser,
};
use crate::publish::Publisher;
use crate::watcher::WatchHandler;

/// What processing one settled file led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Not a feed file.
    Ignored,
    /// A versioned file no newer than the category's latest.
    Stale {
        category: FileCategory,
        latest: Option<u64>,
    },
    /// A result identical to what the snapshot already holds.
    Unchanged { key: String },
    /// A result merged into the snapshot and the snapshot published.
    Merged { key: String, outcome: MergeOutcome },
    /// A newer raw file validated and published.
    RawPublished { category: FileCategory, version: u64 },
}

/// Counts from the startup batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub results_merged: usize,
    pub raw_published: usize,
    pub structured_published: bool,
    pub failures: usize,
}

pub struct FeedPipeline {
    classifier: FileClassifier,
    grammar: Grammar,
    selector: VersionSelector,
    aggregator: Aggregator,
    publisher: Publisher,
}

impl FeedPipeline {
    pub fn new(config: &FeedConfig, publisher: Publisher) -> Self {
        Self {
            classifier: FileClassifier::new(&config.result_match),
            grammar: config.kind,
            selector: VersionSelector::new(),
            aggregator: Aggregator::new(),
            publisher,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.aggregator.snapshot()
    }

    pub fn latest_version(&self, category: FileCategory) -> Option<u64> {
        self.selector.latest(category)
    }

    /// Handle one settled file.
    ///
    /// A publish failure after a successful merge is returned as an error;
    /// the merged data stays in the snapshot and goes out with the next
    /// change.
    pub async fn process_file(&mut self, path: &Path) -> FeedResult<FileOutcome> {
        let Some(category) = self.classifier.classify(path) else {
            return Ok(FileOutcome::Ignored);
        };

        if category.is_raw() {
            self.process_raw(category, path).await
        } else {
            self.process_result(path).await
        }
    }

    /// Handle the files present at startup.
    ///
    /// Every result file is merged, but only the newest raw file per
    /// category is published, followed by a single structured publish.
    pub async fn ingest_initial(&mut self, paths: Vec<PathBuf>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut newest: HashMap<FileCategory, VersionedFile> = HashMap::new();

        for path in paths {
            let Some(category) = self.classifier.classify(&path) else {
                continue;
            };

            if !category.is_raw() {
                match self.read_record(&path).await {
                    Ok(record) => {
                        self.aggregator
                            .merge(category, FeedRecord::Result(record));
                        summary.results_merged += 1;
                    }
                    Err(e) => {
                        summary.failures += 1;
                        report(&path, &e);
                    }
                }
                continue;
            }

            match self.selector.candidate(category, &path) {
                Ok(Some(file)) => {
                    // Sorted input, so on equal versions the first file stays
                    if newest
                        .get(&category)
                        .is_none_or(|current| file.version > current.version)
                    {
                        newest.insert(category, file);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    summary.failures += 1;
                    report(&path, &e);
                }
            }
        }

        for category in FileCategory::ALL {
            let Some(file) = newest.remove(&category) else {
                continue;
            };
            crate::log_event!("pipeline", "latest", "{category} v{}", file.version);
            match self.publish_raw(file).await {
                Ok(_) => summary.raw_published += 1,
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!("[pipeline] initial {category} publish failed: {e}");
                }
            }
        }

        if !self.snapshot().is_empty() {
            match self.flush().await {
                Ok(published) => summary.structured_published = published,
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!("[pipeline] initial results publish failed: {e}");
                }
            }
        }

        summary
    }

    /// Publish the snapshot if it holds unpublished changes.
    ///
    /// Returns whether anything was uploaded.
    pub async fn flush(&mut self) -> FeedResult<bool> {
        if !self.snapshot().is_dirty() {
            return Ok(false);
        }
        self.publish_snapshot().await?;
        Ok(true)
    }

    async fn process_result(&mut self, path: &Path) -> FeedResult<FileOutcome> {
        let record = self.read_record(path).await?;
        let key = record.key().to_string();

        let outcome = self
            .aggregator
            .merge(FileCategory::LocalResult, FeedRecord::Result(record));
        if !outcome.changed() {
            return Ok(FileOutcome::Unchanged { key });
        }

        self.publish_snapshot().await?;
        Ok(FileOutcome::Merged { key, outcome })
    }

    async fn process_raw(&mut self, category: FileCategory, path: &Path) -> FeedResult<FileOutcome> {
        match self.selector.candidate(category, path)? {
            Some(file) => {
                let version = self.publish_raw(file).await?;
                Ok(FileOutcome::RawPublished { category, version })
            }
            None => Ok(FileOutcome::Stale {
                category,
                latest: self.selector.latest(category),
            }),
        }
    }

    /// Validate and upload a raw file, then move the category pointer.
    ///
    /// The pointer stays put when validation or upload fails, so a later
    /// event for the same file gets another chance.
    async fn publish_raw(&mut self, file: VersionedFile) -> FeedResult<u64> {
        let key = self.publisher.remote_key_for(file.category);
        let bytes = self.publisher.publish_raw(&file.path, &key).await?;

        self.selector.commit(&file);
        let version = file.version;
        self.aggregator.merge(
            file.category,
            FeedRecord::Raw(RawFeed {
                version,
                path: file.path,
                bytes,
            }),
        );
        Ok(version)
    }

    async fn publish_snapshot(&mut self) -> FeedResult<()> {
        self.publisher
            .publish_structured(self.aggregator.snapshot())
            .await?;
        self.aggregator.mark_clean();
        Ok(())
    }

    async fn read_record(&self, path: &Path) -> FeedResult<ResultRecord> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FeedError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        parser::parse(self.grammar, &bytes).map_err(|source| {
            crate::warn_event!(
                "pipeline",
                "rejected",
                "{} ({source}):\n{}",
                path.display(),
                String::from_utf8_lossy(&bytes)
            );
            FeedError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

fn report(path: &Path, error: &FeedError) {
    match error {
        FeedError::Publish(_) => tracing::error!("[pipeline] {}: {error}", path.display()),
        _ => crate::warn_event!("pipeline", "skipped", "{error}"),
    }
}

#[async_trait]
impl WatchHandler for FeedPipeline {
    fn name(&self) -> &str {
        "pipeline"
    }

    fn matches(&self, path: &Path) -> bool {
        self.classifier.classify(path).is_some()
    }

    async fn on_initial_batch(&mut self, paths: Vec<PathBuf>) {
        let summary = self.ingest_initial(paths).await;
        crate::log_event!(
            "pipeline",
            "initial batch",
            "{} results, {} raw feeds published, {} failures",
            summary.results_merged,
            summary.raw_published,
            summary.failures
        );
    }

    async fn on_settled(&mut self, path: &Path) {
        match self.process_file(path).await {
            Ok(FileOutcome::Ignored) => {}
            Ok(FileOutcome::Stale { category, latest }) => {
                crate::debug_event!(
                    "pipeline",
                    "stale",
                    "{} (latest {category} is {latest:?})",
                    path.display()
                );
            }
            Ok(FileOutcome::Unchanged { key }) => {
                crate::debug_event!("pipeline", "unchanged", "{key}");
            }
            Ok(FileOutcome::Merged { key, outcome }) => {
                crate::log_event!("pipeline", "merged", "{key} ({outcome:?})");
            }
            Ok(FileOutcome::RawPublished { category, version }) => {
                crate::log_event!("pipeline", "published", "{category} v{version}");
            }
            Err(e) => report(path, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishConfig;
    use crate::publish::{NotificationBroadcaster, ObjectStore, PublishArtifact, StoreError};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryStore {
        puts: Mutex<Vec<PublishArtifact>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        async fn put(&self, artifact: &PublishArtifact) -> Result<(), StoreError> {
            self.puts.lock().unwrap().push(artifact.clone());
            Ok(())
        }
    }

    fn pipeline(store: Arc<MemoryStore>, kind: Grammar) -> FeedPipeline {
        let publisher = Publisher::new(
            store,
            Arc::new(NotificationBroadcaster::new(8)),
            PublishConfig::default(),
        );
        let config = FeedConfig {
            kind,
            ..FeedConfig::default()
        };
        FeedPipeline::new(&config, publisher)
    }

    fn council(region: &str, winner: &str) -> String {
        format!(
            r#"<FirstPastThePostResult>
<Council name="{region}" winningParty="{winner}" sittingParty="Labour" gainOrHold="Gain"/>
<Changes><Party name="{winner}" change="+1"/></Changes>
<NewCouncil><Party name="{winner}" seats="10"/></NewCouncil>
</FirstPastThePostResult>"#
        )
    }

    #[tokio::test]
    async fn test_unrelated_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readme.txt");
        std::fs::write(&path, "hello").unwrap();

        let store = Arc::new(MemoryStore::default());
        let mut pipeline = pipeline(store.clone(), Grammar::Local);

        assert_eq!(
            pipeline.process_file(&path).await.unwrap(),
            FileOutcome::Ignored
        );
        assert!(!pipeline.matches(&path));
        assert!(store.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reprocessing_same_result_publishes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_result_Fife.xml");
        std::fs::write(&path, council("Fife", "SNP")).unwrap();

        let store = Arc::new(MemoryStore::default());
        let mut pipeline = pipeline(store.clone(), Grammar::Local);

        let first = pipeline.process_file(&path).await.unwrap();
        assert_eq!(
            first,
            FileOutcome::Merged {
                key: "Fife".to_string(),
                outcome: MergeOutcome::Inserted
            }
        );

        let second = pipeline.process_file(&path).await.unwrap();
        assert_eq!(
            second,
            FileOutcome::Unchanged {
                key: "Fife".to_string()
            }
        );
        assert_eq!(store.puts.lock().unwrap().len(), 1);
        assert!(!pipeline.snapshot().is_dirty());
    }

    #[tokio::test]
    async fn test_bad_sop_does_not_move_pointer() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("Local_SOP_2.xml");
        std::fs::write(&broken, "<SOP><Party").unwrap();

        let store = Arc::new(MemoryStore::default());
        let mut pipeline = pipeline(store.clone(), Grammar::Local);

        let err = pipeline.process_file(&broken).await.unwrap_err();
        assert!(matches!(err, FeedError::Publish(_)));
        assert_eq!(pipeline.latest_version(FileCategory::StateOfParties), None);

        // Once the mirror finishes writing, the same file goes through
        std::fs::write(&broken, "<SOP><Party name=\"SNP\" seats=\"4\"/></SOP>").unwrap();
        assert_eq!(
            pipeline.process_file(&broken).await.unwrap(),
            FileOutcome::RawPublished {
                category: FileCategory::StateOfParties,
                version: 2
            }
        );
        assert_eq!(pipeline.latest_version(FileCategory::StateOfParties), Some(2));
        assert_eq!(
            pipeline
                .snapshot()
                .raw(FileCategory::StateOfParties)
                .map(|feed| feed.version),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_initial_batch_publishes_newest_raw_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("Local_SOP_1.xml"), "<SOP v=\"1\"/>").unwrap();
        std::fs::write(root.join("Local_SOP_3.xml"), "<SOP v=\"3\"/>").unwrap();
        std::fs::write(root.join("Local_SOP_2.xml"), "<SOP v=\"2\"/>").unwrap();
        std::fs::write(root.join("local_result_A.xml"), council("A", "SNP")).unwrap();
        std::fs::write(root.join("local_result_B.xml"), council("B", "Labour")).unwrap();
        std::fs::write(root.join("local_result_bad.xml"), "<oops").unwrap();

        let mut paths: Vec<PathBuf> = std::fs::read_dir(root)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        paths.sort();

        let store = Arc::new(MemoryStore::default());
        let mut pipeline = pipeline(store.clone(), Grammar::Local);
        let summary = pipeline.ingest_initial(paths).await;

        assert_eq!(summary.results_merged, 2);
        assert_eq!(summary.raw_published, 1);
        assert_eq!(summary.failures, 1);
        assert!(summary.structured_published);

        let puts = store.puts.lock().unwrap();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].bytes, b"<SOP v=\"3\"/>");
        assert!(puts[1].remote_key.ends_with("results.json"));
        assert_eq!(pipeline.latest_version(FileCategory::StateOfParties), Some(3));
    }

    #[tokio::test]
    async fn test_empty_initial_batch_publishes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let mut pipeline = pipeline(store.clone(), Grammar::Referendum);

        let summary = pipeline.ingest_initial(Vec::new()).await;

        assert_eq!(summary, BatchSummary::default());
        assert!(store.puts.lock().unwrap().is_empty());
    }
}
