//! Turns snapshot state and raw feed files into uploads.

use std::path::Path;
use std::sync::Arc;

use crate::config::PublishConfig;
use crate::feed::{FileCategory, Snapshot, parser};

use super::error::PublishError;
use super::notifications::{FeedEvent, NotificationBroadcaster};
use super::store::{
    CONTENT_TYPE_JSON, CONTENT_TYPE_XML, ObjectStore, PublishArtifact, remote_key,
};

/// Uploads artifacts and announces them to live subscribers.
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    broadcaster: Arc<NotificationBroadcaster>,
    config: PublishConfig,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        broadcaster: Arc<NotificationBroadcaster>,
        config: PublishConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            config,
        }
    }

    /// Object key a category is published under.
    pub fn remote_key_for(&self, category: FileCategory) -> String {
        let filename = match category {
            FileCategory::LocalResult => &self.config.results_filename,
            FileCategory::StateOfParties => &self.config.sop_filename,
            FileCategory::ReferendumRunningTotal => &self.config.referendum_filename,
        };
        remote_key(&self.config.base_dir, filename)
    }

    /// Publish the snapshot's keyed results as JSON.
    ///
    /// Returns the number of bytes uploaded.
    pub async fn publish_structured(&self, snapshot: &Snapshot) -> Result<usize, PublishError> {
        let artifact = PublishArtifact {
            bytes: snapshot.to_json()?,
            remote_key: self.remote_key_for(FileCategory::LocalResult),
            content_type: CONTENT_TYPE_JSON,
            public_read: self.config.public_read,
        };

        self.upload(&artifact).await?;
        crate::log_event!(
            "publish",
            "results",
            "{} entries -> {}",
            snapshot.len(),
            artifact.remote_key
        );
        Ok(artifact.bytes.len())
    }

    /// Publish a raw XML file as-is.
    ///
    /// The file is re-read and checked for well-formedness right before the
    /// upload; a file that is mid-overwrite is rejected rather than published.
    /// Returns the bytes that were uploaded.
    pub async fn publish_raw(&self, path: &Path, remote_key: &str) -> Result<Vec<u8>, PublishError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PublishError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        parser::check_well_formed(&bytes).map_err(|source| PublishError::InvalidXml {
            path: path.to_path_buf(),
            source,
        })?;

        let artifact = PublishArtifact {
            bytes,
            remote_key: remote_key.to_string(),
            content_type: CONTENT_TYPE_XML,
            public_read: self.config.public_read,
        };

        self.upload(&artifact).await?;
        crate::log_event!(
            "publish",
            "raw",
            "{} -> {}",
            path.display(),
            artifact.remote_key
        );
        Ok(artifact.bytes)
    }

    async fn upload(&self, artifact: &PublishArtifact) -> Result<(), PublishError> {
        self.store
            .put(artifact)
            .await
            .map_err(|source| PublishError::Store {
                store: self.store.name().to_string(),
                key: artifact.remote_key.clone(),
                source,
            })?;

        self.broadcaster.send(FeedEvent::ResultsUpdated);
        Ok(())
    }
}
