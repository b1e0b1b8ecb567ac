//! File categories and filename classification.
//!
//! The mirror drops three kinds of file into the results directory. Local
//! result files are recognised by a configurable substring and are not
//! versioned; running totals and state-of-parties files carry an ordinal
//! suffix (`..._running_totals_12.xml`, `Local_SOP_3.xml`) and only the
//! highest one matters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

static RUNNING_TOTALS_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)_running_totals_(\d+)\.xml$").expect("static regex")
});

static SOP_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_SOP_(\d+)\.xml$").expect("static regex"));

/// The kind of result a feed file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// Per-council (or per-voting-area) result, accumulated by key.
    LocalResult,
    /// Cumulative referendum totals, published as raw XML.
    ReferendumRunningTotal,
    /// State of parties across councils, published as raw XML.
    StateOfParties,
}

impl FileCategory {
    pub const ALL: [FileCategory; 3] = [
        FileCategory::LocalResult,
        FileCategory::ReferendumRunningTotal,
        FileCategory::StateOfParties,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::LocalResult => "local_result",
            FileCategory::ReferendumRunningTotal => "running_totals",
            FileCategory::StateOfParties => "state_of_parties",
        }
    }

    /// Whether files of this category carry an ordinal version.
    pub fn is_versioned(self) -> bool {
        !matches!(self, FileCategory::LocalResult)
    }

    /// Whether the category is published as raw XML rather than merged data.
    pub fn is_raw(self) -> bool {
        self.is_versioned()
    }

    /// Extract the ordinal suffix from a file name.
    ///
    /// Returns `None` for unversioned categories, for names that don't fit the
    /// category pattern, and for numbers that overflow `u64`.
    pub fn extract_version(self, file_name: &str) -> Option<u64> {
        let pattern = match self {
            FileCategory::LocalResult => return None,
            FileCategory::ReferendumRunningTotal => &*RUNNING_TOTALS_VERSION,
            FileCategory::StateOfParties => &*SOP_VERSION,
        };

        pattern
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps file names onto categories.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    /// Lowercased substring that identifies local result files.
    result_match: String,
}

impl FileClassifier {
    pub fn new(result_match: &str) -> Self {
        Self {
            result_match: result_match.to_lowercase(),
        }
    }

    /// Classify a path by its file name.
    ///
    /// Local results are checked first, so a result file whose name happens
    /// to contain "SOP" is still treated as a result.
    pub fn classify(&self, path: &Path) -> Option<FileCategory> {
        let name = path.file_name()?.to_str()?.to_lowercase();

        if !self.result_match.is_empty() && name.contains(&self.result_match) {
            Some(FileCategory::LocalResult)
        } else if name.contains("running_totals") {
            Some(FileCategory::ReferendumRunningTotal)
        } else if name.contains("_sop_") {
            Some(FileCategory::StateOfParties)
        } else {
            None
        }
    }
}
