//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use election_feed::config::{FeedConfig, PublishConfig};
use election_feed::feed::Grammar;
use election_feed::{
    FeedPipeline, NotificationBroadcaster, ObjectStore, PublishArtifact, Publisher, StoreError,
};

/// Object store that keeps every upload in memory.
#[derive(Default)]
pub struct RecordingStore {
    puts: Mutex<Vec<PublishArtifact>>,
    offline: AtomicBool,
}

impl RecordingStore {
    pub fn puts(&self) -> Vec<PublishArtifact> {
        self.puts.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts().into_iter().map(|put| put.remote_key).collect()
    }

    /// Make subsequent puts fail until turned back on.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn last_json(&self) -> serde_json::Value {
        let put = self
            .puts()
            .into_iter()
            .rev()
            .find(|put| put.remote_key.ends_with("results.json"))
            .expect("no results.json upload");
        serde_json::from_slice(&put.bytes).unwrap()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn put(&self, artifact: &PublishArtifact) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Config {
                reason: "store offline".to_string(),
            });
        }
        self.puts.lock().unwrap().push(artifact.clone());
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub broadcaster: Arc<NotificationBroadcaster>,
    pub pipeline: FeedPipeline,
}

pub fn harness(kind: Grammar) -> Harness {
    let store = Arc::new(RecordingStore::default());
    let broadcaster = Arc::new(NotificationBroadcaster::new(16));
    let publisher = Publisher::new(
        store.clone(),
        broadcaster.clone(),
        PublishConfig {
            base_dir: "/2014/Results/".to_string(),
            ..PublishConfig::default()
        },
    );
    let feed = FeedConfig {
        kind,
        ..FeedConfig::default()
    };

    Harness {
        store,
        broadcaster,
        pipeline: FeedPipeline::new(&feed, publisher),
    }
}

pub fn council_xml(region: &str, winner: &str, sitting: &str, seats: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<FirstPastThePostResult>
  <Council name="{region}" winningParty="{winner}" sittingParty="{sitting}" gainOrHold="Gain">
    <Changes>
      <Party name="{winner}" change="+1"/>
    </Changes>
    <NewCouncil>
      <Party name="{winner}" seats="{seats}"/>
    </NewCouncil>
  </Council>
</FirstPastThePostResult>"#
    )
}

pub fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
