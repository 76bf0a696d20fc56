use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::diagnostics::{DiagnosticCounts, DiagnosticSnapshot};
use crate::status::{Aggregate, GitSnapshot, GitStatus};
use crate::sync::{read, write};

/// Files and buffers with unsaved changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedSnapshot {
    paths: BTreeSet<PathBuf>,
    bufnrs: BTreeSet<u32>,
}

impl ModifiedSnapshot {
    pub fn new(
        entries: impl IntoIterator<Item = (u32, Option<PathBuf>)>,
    ) -> Self {
        let mut snapshot = Self::default();
        for (bufnr, path) in entries {
            snapshot.bufnrs.insert(bufnr);
            if let Some(path) = path {
                snapshot.paths.insert(path);
            }
        }
        snapshot
    }

    pub fn is_path_modified(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn is_buffer_modified(&self, bufnr: u32) -> bool {
        self.bufnrs.contains(&bufnr)
    }

    /// Paths and buffer numbers present in exactly one of the snapshots.
    pub fn changes(
        &self,
        previous: &ModifiedSnapshot,
    ) -> (BTreeSet<PathBuf>, BTreeSet<u32>) {
        (
            self.paths
                .symmetric_difference(&previous.paths)
                .cloned()
                .collect(),
            self.bufnrs
                .symmetric_difference(&previous.bufnrs)
                .copied()
                .collect(),
        )
    }
}

/// Computed statuses shared by every source and binder of the process.
///
/// Git snapshots are keyed by repository root, so sources showing the
/// same repository read the same snapshot.
#[derive(Debug, Default)]
pub struct StatusCache {
    git: RwLock<HashMap<PathBuf, Arc<GitSnapshot>>>,
    diagnostics: RwLock<Arc<DiagnosticSnapshot>>,
    modified: RwLock<Arc<ModifiedSnapshot>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn git(&self, root: &Path) -> Option<Arc<GitSnapshot>> {
        read(&self.git).get(root).cloned()
    }

    /// Store the snapshot of `snapshot.root()`, returning the one replaced.
    pub fn replace_git(
        &self,
        snapshot: GitSnapshot,
    ) -> Option<Arc<GitSnapshot>> {
        write(&self.git).insert(snapshot.root().to_path_buf(), Arc::new(snapshot))
    }

    pub fn diagnostics(&self) -> Arc<DiagnosticSnapshot> {
        read(&self.diagnostics).clone()
    }

    pub fn replace_diagnostics(
        &self,
        snapshot: DiagnosticSnapshot,
    ) -> Arc<DiagnosticSnapshot> {
        std::mem::replace(&mut *write(&self.diagnostics), Arc::new(snapshot))
    }

    pub fn modified(&self) -> Arc<ModifiedSnapshot> {
        read(&self.modified).clone()
    }

    pub fn replace_modified(
        &self,
        snapshot: ModifiedSnapshot,
    ) -> Arc<ModifiedSnapshot> {
        std::mem::replace(&mut *write(&self.modified), Arc::new(snapshot))
    }

    /// Consistent view of every status for one render batch.
    pub fn view(&self) -> StatusView {
        StatusView {
            git: read(&self.git).values().cloned().collect(),
            diagnostics: self.diagnostics(),
            modified: self.modified(),
        }
    }
}

/// Statuses captured once per render batch.
#[derive(Debug, Clone, Default)]
pub struct StatusView {
    git: Vec<Arc<GitSnapshot>>,
    diagnostics: Arc<DiagnosticSnapshot>,
    modified: Arc<ModifiedSnapshot>,
}

impl StatusView {
    /// Git status of `path` from the innermost repository containing it.
    pub fn git_status(&self, path: &Path) -> Option<Aggregate<GitStatus>> {
        self.git
            .iter()
            .filter(|snapshot| path.starts_with(snapshot.root()))
            .max_by_key(|snapshot| snapshot.root().components().count())
            .and_then(|snapshot| snapshot.status_of(path))
    }

    pub fn diagnostics(&self, path: &Path) -> DiagnosticCounts {
        self.diagnostics.counts(path)
    }

    pub fn is_path_modified(&self, path: &Path) -> bool {
        self.modified.is_path_modified(path)
    }

    pub fn is_buffer_modified(&self, bufnr: u32) -> bool {
        self.modified.is_buffer_modified(bufnr)
    }
}
