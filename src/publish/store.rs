//! Object-store seam and its backends.
//!
//! The pipeline only needs "put these bytes under this key". Retries and
//! consistency guarantees are the backend's business.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use super::error::StoreError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// One upload, built per publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishArtifact {
    pub bytes: Vec<u8>,
    pub remote_key: String,
    pub content_type: &'static str,
    pub public_read: bool,
}

/// Destination for published artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Store the artifact under its remote key, replacing any previous object.
    async fn put(&self, artifact: &PublishArtifact) -> Result<(), StoreError>;
}

/// Join a base directory and a logical file name into an object key.
///
/// Leading and duplicate slashes are dropped: `("/2014/Results/", "results.json")`
/// becomes `2014/Results/results.json`.
pub fn remote_key(base_dir: &str, filename: &str) -> String {
    base_dir
        .split('/')
        .chain(filename.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Which backend `run` publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// S3-compatible HTTP endpoint.
    #[default]
    Http,
    /// Directory on local disk.
    Local,
}

/// S3-compatible store addressed as `<endpoint>/<bucket>/<key>`.
///
/// Requests are unsigned; use a pre-authorised endpoint or a bearer token.
pub struct HttpObjectStore {
    endpoint: String,
    bucket: String,
    bearer_token: Option<String>,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into().trim_matches('/').to_string(),
            bearer_token: None,
            client: Client::new(),
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.bucket.is_empty() {
            format!("{}/{key}", self.endpoint)
        } else {
            format!("{}/{}/{key}", self.endpoint, self.bucket)
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn put(&self, artifact: &PublishArtifact) -> Result<(), StoreError> {
        let url = self.object_url(&artifact.remote_key);

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, artifact.content_type)
            .body(artifact.bytes.clone());
        if artifact.public_read {
            request = request.header("x-amz-acl", "public-read");
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| StoreError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Writes artifacts below a local root, one file per key.
///
/// Files are written to a sibling temp file first and renamed into place so
/// readers never see a partial object.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, artifact: &PublishArtifact) -> Result<(), StoreError> {
        let target = self.path_for(&artifact.remote_key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut staging = target.clone().into_os_string();
        staging.push(".partial");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, &artifact.bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|source| StoreError::Io {
                path: target.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Build the configured backend.
pub fn from_config(config: &crate::config::StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match config.backend {
        StoreBackend::Http => {
            if config.endpoint.trim().is_empty() {
                return Err(StoreError::Config {
                    reason: "store.endpoint is empty".to_string(),
                });
            }
            let store = HttpObjectStore::new(config.endpoint.clone(), config.bucket.clone())
                .with_bearer_token(config.bearer_token.clone());
            Ok(Arc::new(store))
        }
        StoreBackend::Local => Ok(Arc::new(LocalDirStore::new(config.local_root.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remote_key_normalises_slashes() {
        assert_eq!(
            remote_key("/2014/ReferendumResults/", "results.json"),
            "2014/ReferendumResults/results.json"
        );
        assert_eq!(remote_key("", "/SOP.xml"), "SOP.xml");
        assert_eq!(remote_key("a//b", "c"), "a/b/c");
    }

    #[test]
    fn test_object_url() {
        let store = HttpObjectStore::new("https://s3.example.com/", "/bucket/");
        assert_eq!(
            store.object_url("/2014/results.json"),
            "https://s3.example.com/bucket/2014/results.json"
        );

        let bucketless = HttpObjectStore::new("https://bucket.s3.example.com", "");
        assert_eq!(
            bucketless.object_url("SOP.xml"),
            "https://bucket.s3.example.com/SOP.xml"
        );
    }

    #[tokio::test]
    async fn test_local_store_writes_and_replaces() {
        let dir = TempDir::new().unwrap();
        let store = LocalDirStore::new(dir.path());

        let mut artifact = PublishArtifact {
            bytes: b"{}".to_vec(),
            remote_key: "2014/results.json".to_string(),
            content_type: CONTENT_TYPE_JSON,
            public_read: true,
        };
        store.put(&artifact).await.unwrap();

        artifact.bytes = b"{\"A\":1}".to_vec();
        store.put(&artifact).await.unwrap();

        let written = std::fs::read(dir.path().join("2014/results.json")).unwrap();
        assert_eq!(written, b"{\"A\":1}");
        assert!(!dir.path().join("2014/results.json.partial").exists());
    }
}
