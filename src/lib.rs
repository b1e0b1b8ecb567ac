//! Versioned election-result feed ingestion.
//!
//! Files mirrored from a results FTP server land in a local directory. The
//! [`watcher`] waits for each file to settle, the [`pipeline`] decides
//! whether it supersedes what was already seen, [`feed`] parses and merges
//! it, and [`publish`] uploads the result and tells live clients.

pub mod logging;
pub mod cli;
pub mod config;
pub mod feed;
#[cfg(feature = "http-server")]
pub mod live;
pub mod pipeline;
pub mod publish;
pub mod sync;
pub mod watcher;

pub use config::Settings;
pub use feed::{
    Aggregator, FeedError, FileCategory, Grammar, MergeOutcome, ParseError, ResultRecord,
    Snapshot, VersionSelector,
};
pub use pipeline::{BatchSummary, FeedPipeline, FileOutcome};
pub use publish::{
    FeedEvent, NotificationBroadcaster, ObjectStore, PublishArtifact, PublishError, Publisher,
    StoreError,
};
pub use watcher::{DirectoryWatcher, WatchError, WatchHandler};
