//! Snapshot of the paths a run operates on.

use crate::core::filter::FilterChain;
use serde::Serialize;
use std::path::PathBuf;

/// Added, modified and deleted paths for one pass of a run.
///
/// Built by a [`crate::core::git::Vcs`] and never mutated afterwards; the
/// orchestrator asks for a fresh one after fix commands have run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Newly added (or untracked) paths.
    pub added: Vec<PathBuf>,
    /// Modified paths.
    pub modified: Vec<PathBuf>,
    /// Deleted paths.
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    /// Creates a change set from its three lists.
    #[must_use]
    pub fn new(added: Vec<PathBuf>, modified: Vec<PathBuf>, deleted: Vec<PathBuf>) -> Self {
        Self {
            added,
            modified,
            deleted,
        }
    }

    /// Returns true if no path changed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Returns the number of changed paths, deletions included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Returns the paths that still exist on disk: added, then modified.
    ///
    /// These are what a check sees; deleted paths are never handed to a
    /// command.
    #[must_use]
    pub fn existing(&self) -> Vec<PathBuf> {
        self.added.iter().chain(&self.modified).cloned().collect()
    }

    /// Narrows every list through `chain`.
    #[must_use]
    pub fn filtered(&self, chain: &FilterChain) -> Self {
        Self {
            added: chain.apply(&self.added),
            modified: chain.apply(&self.modified),
            deleted: chain.apply(&self.deleted),
        }
    }
}
