use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Version control status of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GitStatus {
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Ignored,
}

impl GitStatus {
    /// Whether the status marks a change worth jumping to.
    pub fn is_changed(self) -> bool {
        !matches!(self, Self::Unmodified | Self::Ignored)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Unmodified => " ",
            Self::Modified => "M",
            Self::Added => "A",
            Self::Deleted => "D",
            Self::Renamed => "R",
            Self::Copied => "C",
            Self::Unmerged => "U",
            Self::Untracked => "?",
            Self::Ignored => "!",
        }
    }

    pub fn highlight_group(self) -> &'static str {
        match self {
            Self::Unmodified => "GroveGitUnmodified",
            Self::Modified => "GroveGitModified",
            Self::Added => "GroveGitAdded",
            Self::Deleted => "GroveGitDeleted",
            Self::Renamed => "GroveGitRenamed",
            Self::Copied => "GroveGitCopied",
            Self::Unmerged => "GroveGitUnmerged",
            Self::Untracked => "GroveGitUntracked",
            Self::Ignored => "GroveGitIgnored",
        }
    }
}

/// Status of a directory folded from the statuses below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate<S> {
    /// Every folded value was equal.
    Uniform(S),
    /// At least two folded values differed.
    Mixed,
}

impl<S: PartialEq + Copy> Aggregate<S> {
    /// Pairwise fold: equal values stay, anything else is mixed.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Uniform(left), Self::Uniform(right)) if left == right => {
                Self::Uniform(left)
            },
            _ => Self::Mixed,
        }
    }
}

impl Aggregate<GitStatus> {
    pub fn is_changed(self) -> bool {
        match self {
            Self::Uniform(status) => status.is_changed(),
            Self::Mixed => true,
        }
    }
}

/// Statuses of one repository with directory aggregates precomputed.
///
/// Directories are folded from the reported files below them only; ignored
/// files do not take part in the fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitSnapshot {
    root: PathBuf,
    files: HashMap<PathBuf, GitStatus>,
    dirs: HashMap<PathBuf, Aggregate<GitStatus>>,
}

impl GitSnapshot {
    pub fn new(root: PathBuf, files: HashMap<PathBuf, GitStatus>) -> Self {
        let mut dirs: HashMap<PathBuf, Aggregate<GitStatus>> = HashMap::new();
        for (path, status) in &files {
            if *status == GitStatus::Ignored {
                continue;
            }
            let leaf = Aggregate::Uniform(*status);
            for dir in path.ancestors().skip(1) {
                if !dir.starts_with(&root) {
                    break;
                }
                let folded = match dirs.get(dir) {
                    Some(current) => current.combine(leaf),
                    None => leaf,
                };
                dirs.insert(dir.to_path_buf(), folded);
            }
        }
        Self { root, files, dirs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status_of(&self, path: &Path) -> Option<Aggregate<GitStatus>> {
        self.files
            .get(path)
            .map(|status| Aggregate::Uniform(*status))
            .or_else(|| self.dirs.get(path).copied())
    }

    /// Paths whose status differs between `previous` and `self`.
    pub fn changed_paths(&self, previous: &GitSnapshot) -> BTreeSet<PathBuf> {
        let candidates = self
            .files
            .keys()
            .chain(self.dirs.keys())
            .chain(previous.files.keys())
            .chain(previous.dirs.keys());
        candidates
            .filter(|path| self.status_of(path) != previous.status_of(path))
            .cloned()
            .collect()
    }
}
