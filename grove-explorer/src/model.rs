use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bitflags::bitflags;
use grove_tree::{Node, NodeSeed, NodeUid, Tree};
use serde::{Deserialize, Serialize};

use crate::errors::ExplorerError;

/// Kind of node provider behind a source.
///
/// An explorer shows at most one source of each kind, so the kind doubles
/// as the source identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    File,
    Buffer,
    Bookmark,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Buffer => "buffer",
            Self::Bookmark => "bookmark",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "file" => Ok(Self::File),
            "buffer" => Ok(Self::Buffer),
            "bookmark" => Ok(Self::Bookmark),
            other => Err(ExplorerError::UnknownSource(other.to_string())),
        }
    }
}

bitflags! {
    /// File attributes shown by the filename column.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct EntryFlags: u8 {
        const HIDDEN = 1;
        const SYMLINK = 1 << 1;
        const READONLY = 1 << 2;
        const EXECUTABLE = 1 << 3;
    }
}

/// Root row of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootEntry {
    pub label: String,
    /// Directory shown by a file source.
    pub path: Option<PathBuf>,
}

/// File system entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub flags: EntryFlags,
    /// Byte size of regular files.
    pub size: Option<u64>,
}

/// Listed editor buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEntry {
    pub bufnr: u32,
    pub name: String,
    pub path: Option<PathBuf>,
    pub modified: bool,
    pub visible: bool,
    pub current: bool,
}

/// File grouping the bookmarks placed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkFileEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Bookmarked line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEntry {
    pub path: PathBuf,
    pub line: u32,
    pub annotation: Option<String>,
}

/// Provider data attached to every explorer node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Root(RootEntry),
    File(FileEntry),
    Buffer(BufferEntry),
    BookmarkFile(BookmarkFileEntry),
    Bookmark(BookmarkEntry),
}

impl Payload {
    /// File system path the node stands for, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Root(root) => root.path.as_deref(),
            Self::File(file) => Some(&file.path),
            Self::Buffer(buffer) => buffer.path.as_deref(),
            Self::BookmarkFile(file) => Some(&file.path),
            Self::Bookmark(bookmark) => Some(&bookmark.path),
        }
    }

    /// Text identifying the node in its row.
    pub fn label(&self) -> &str {
        match self {
            Self::Root(root) => &root.label,
            Self::File(file) => &file.name,
            Self::Buffer(buffer) => &buffer.name,
            Self::BookmarkFile(file) => &file.name,
            Self::Bookmark(bookmark) => bookmark
                .annotation
                .as_deref()
                .unwrap_or_default(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::File(file) if file.is_dir)
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

pub type ExplorerNode = Node<Payload>;
pub type ExplorerTree = Tree<Payload>;
pub type Seed = NodeSeed<Payload>;

/// Owned copy of the parts of a node a provider needs to list children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub uid: NodeUid,
    pub payload: Payload,
}

impl From<&ExplorerNode> for NodeSnapshot {
    fn from(node: &ExplorerNode) -> Self {
        Self {
            uid: node.uid().clone(),
            payload: node.payload().clone(),
        }
    }
}

impl From<&Seed> for NodeSnapshot {
    fn from(seed: &Seed) -> Self {
        Self {
            uid: seed.uid.clone(),
            payload: seed.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_source_names_when_parsed_then_unknown_names_fail() {
        assert_eq!("file".parse::<SourceKind>().ok(), Some(SourceKind::File));
        assert_eq!(
            "bookmark".parse::<SourceKind>().ok(),
            Some(SourceKind::Bookmark)
        );
        assert!(matches!(
            "tabs".parse::<SourceKind>(),
            Err(ExplorerError::UnknownSource(name)) if name == "tabs"
        ));
    }

    #[test]
    fn given_payloads_when_queried_then_paths_follow_variant() {
        let buffer = Payload::Buffer(BufferEntry {
            bufnr: 3,
            name: String::from("[No Name]"),
            path: None,
            modified: false,
            visible: false,
            current: false,
        });
        let dir = Payload::File(FileEntry {
            name: String::from("src"),
            path: PathBuf::from("/r/src"),
            is_dir: true,
            flags: EntryFlags::empty(),
            size: None,
        });

        assert_eq!(buffer.path(), None);
        assert_eq!(dir.path(), Some(Path::new("/r/src")));
        assert!(dir.is_dir());
        assert!(!buffer.is_dir());
    }
}
