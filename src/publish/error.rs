//! Error types for object-store uploads and publishing.

use std::path::PathBuf;
use thiserror::Error;

use crate::feed::ParseError;

/// Failures reported by an [`ObjectStore`](super::ObjectStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store misconfigured: {reason}")]
    Config { reason: String },
}

/// Failures while preparing or uploading an artifact.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid XML any more: {source}")]
    InvalidXml {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cannot serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("upload of {key} to {store} failed: {source}")]
    Store {
        store: String,
        key: String,
        #[source]
        source: StoreError,
    },
}
