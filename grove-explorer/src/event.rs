use std::collections::BTreeSet;
use std::path::PathBuf;

use grove_tree::NodeUid;

use crate::action::OpenStrategy;
use crate::errors::Result;
use crate::model::SourceKind;
use crate::provider::LoadedSubtree;

/// Change notifications published by the host on the [`EventBus`].
///
/// [`EventBus`]: crate::bus::EventBus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalEvent {
    /// Repository state may have changed (commit, checkout, stage).
    VcsChanged,
    DiagnosticsChanged,
    /// A buffer's text changed without being saved.
    BufferChanged { bufnr: u32 },
    BufferSaved { bufnr: u32, path: Option<PathBuf> },
    BufferListChanged,
    /// Something below `path` changed on disk.
    FileSystemChanged { path: PathBuf },
}

/// Status concern a binder keeps fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConcernKind {
    Git,
    Diagnostics,
    BufferModified,
}

/// What a status refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub paths: BTreeSet<PathBuf>,
    pub bufnrs: BTreeSet<u32>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.bufnrs.is_empty()
    }

    pub fn extend(&mut self, other: ChangeSet) {
        self.paths.extend(other.paths);
        self.bufnrs.extend(other.bufnrs);
    }
}

/// Work delivered back to the explorer from background tasks.
#[derive(Debug)]
pub enum ExplorerEvent {
    /// Statuses changed; redraw the rows showing these paths or buffers.
    Redraw {
        concern: ConcernKind,
        changes: ChangeSet,
    },
    /// A load that outlived the reload timeout finished.
    LoadFinished {
        source: SourceKind,
        generation: u64,
        uid: NodeUid,
        result: Result<LoadedSubtree>,
    },
    /// The host's buffer list changed.
    BuffersChanged,
    /// Entries below `path` changed on disk.
    PathChanged { path: PathBuf },
}

/// Requests the explorer hands back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerEffect {
    OpenFile {
        path: PathBuf,
        line: Option<u32>,
        strategy: OpenStrategy,
    },
    OpenBuffer {
        bufnr: u32,
        strategy: OpenStrategy,
    },
    Deleted { paths: Vec<PathBuf> },
    Renamed { from: PathBuf, to: PathBuf },
    Pasted { paths: Vec<PathBuf> },
}
