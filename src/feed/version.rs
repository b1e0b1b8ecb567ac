//! Latest-version tracking per file category.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::FileCategory;
use super::error::{FeedError, FeedResult};

/// A feed file together with the ordinal parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedFile {
    pub category: FileCategory,
    pub path: PathBuf,
    pub version: u64,
}

/// Owns the "latest version" pointer of every versioned category.
///
/// Pointers only ever move forward. A file whose version is equal to the
/// current pointer is stale, so when two files share a version the first one
/// committed wins.
#[derive(Debug, Default)]
pub struct VersionSelector {
    latest: HashMap<FileCategory, u64>,
}

impl VersionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pointer for a category, if any file has been committed.
    pub fn latest(&self, category: FileCategory) -> Option<u64> {
        self.latest.get(&category).copied()
    }

    /// Check whether `path` would supersede the category's latest file.
    ///
    /// Does not move the pointer; call [`commit`](Self::commit) once the
    /// file has actually been used.
    ///
    /// Returns `Ok(None)` for stale files and an error when no version can be
    /// read from the file name.
    pub fn candidate(
        &self,
        category: FileCategory,
        path: &Path,
    ) -> FeedResult<Option<VersionedFile>> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        let version = category.extract_version(file_name).ok_or_else(|| {
            FeedError::FilenamePatternMismatch {
                file_name: file_name.to_string(),
                category,
            }
        })?;

        if self.latest(category).is_some_and(|current| version <= current) {
            return Ok(None);
        }

        Ok(Some(VersionedFile {
            category,
            path: path.to_path_buf(),
            version,
        }))
    }

    /// Move the category pointer to `file.version` if that is an advance.
    ///
    /// Returns whether the pointer moved.
    pub fn commit(&mut self, file: &VersionedFile) -> bool {
        match self.latest.get(&file.category) {
            Some(&current) if file.version <= current => false,
            _ => {
                self.latest.insert(file.category, file.version);
                true
            }
        }
    }

    /// Check and commit in one step.
    pub fn select_if_newer(
        &mut self,
        category: FileCategory,
        path: &Path,
    ) -> FeedResult<Option<VersionedFile>> {
        let selected = self.candidate(category, path)?;
        if let Some(file) = &selected {
            self.commit(file);
        }
        Ok(selected)
    }
}
