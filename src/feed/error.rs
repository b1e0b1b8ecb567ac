//! Error types for feed classification and parsing.

use std::path::PathBuf;
use thiserror::Error;

use super::FileCategory;
use crate::publish::PublishError;

/// Structural problems with a feed document.
///
/// Missing elements and attributes are reported separately so logs say what
/// was absent, but callers treat every variant the same way: the document is
/// skipped for this cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is not valid UTF-8: {reason}")]
    NotUtf8 { reason: String },

    #[error("malformed XML: {reason}")]
    Malformed { reason: String },

    #[error("missing <{element}> element")]
    MissingElement { element: &'static str },

    #[error("<{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{element}> has invalid '{attribute}' value '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },
}

impl ParseError {
    /// True when the XML was well-formed but lacked a required field.
    pub fn is_missing_field(&self) -> bool {
        matches!(
            self,
            ParseError::MissingElement { .. } | ParseError::MissingAttribute { .. }
        )
    }
}

/// Errors from handling a single feed file.
///
/// None of these stop the pipeline; the file is dropped and the next update
/// for its category recovers.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{file_name} does not carry a {category} version")]
    FilenamePatternMismatch {
        file_name: String,
        category: FileCategory,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Publish(#[from] PublishError),
}

pub type FeedResult<T> = Result<T, FeedError>;
