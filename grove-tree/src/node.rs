use std::fmt;
use std::path::{Component, Path};

/// Stable identity of a node within one source.
///
/// Uids are derived from a source-scoped key (a normalized path, a buffer
/// number, ...) so the same entity maps to the same uid across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeUid(String);

impl NodeUid {
    /// Build a uid from a scope (usually the source name) and a key.
    pub fn new(scope: &str, key: &str) -> Self {
        Self(format!("{scope}://{key}"))
    }

    /// Build a uid from a file system path, normalizing it first.
    pub fn from_path(scope: &str, path: &Path) -> Self {
        Self::new(scope, &normalize_path(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lexically normalize a path into a `/`-separated key.
///
/// `.` segments are dropped, `..` pops the previous segment when there is
/// one, and trailing separators disappear.
pub fn normalize_path(path: &Path) -> String {
    let mut prefix = String::new();
    let mut absolute = false;
    let mut parts: Vec<String> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(value) => {
                prefix = value.as_os_str().to_string_lossy().into_owned();
            },
            Component::RootDir => absolute = true,
            Component::CurDir => {},
            Component::ParentDir => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push(String::from(".."));
                }
            },
            Component::Normal(part) => {
                parts.push(part.to_string_lossy().into_owned());
            },
        }
    }

    let joined = parts.join("/");
    match (prefix.is_empty(), absolute) {
        (true, true) => format!("/{joined}"),
        (true, false) => joined,
        (false, true) => format!("{prefix}/{joined}"),
        (false, false) => format!("{prefix}{joined}"),
    }
}

/// Discriminates the single synthetic root from entity nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Child,
}

/// Provider output: everything needed to create a node, minus the links the
/// tree maintains itself.
#[derive(Debug, Clone)]
pub struct NodeSeed<P> {
    pub uid: NodeUid,
    pub expandable: bool,
    pub payload: P,
}

impl<P> NodeSeed<P> {
    /// Seed for a node that may have children.
    pub fn branch(uid: NodeUid, payload: P) -> Self {
        Self {
            uid,
            expandable: true,
            payload,
        }
    }

    /// Seed for a node that never has children.
    pub fn leaf(uid: NodeUid, payload: P) -> Self {
        Self {
            uid,
            expandable: false,
            payload,
        }
    }
}

/// Node stored in the [`crate::Tree`] arena.
///
/// `children` distinguishes "not loaded" (`None`) from "loaded, empty"
/// (`Some(vec![])`). `level` and the sibling links are view-derived and are
/// rewritten by every [`crate::flatten`] pass.
#[derive(Debug, Clone)]
pub struct Node<P> {
    pub(crate) uid: NodeUid,
    pub(crate) kind: NodeKind,
    pub(crate) expandable: bool,
    pub(crate) payload: P,
    pub(crate) parent: Option<NodeUid>,
    pub(crate) children: Option<Vec<NodeUid>>,
    pub(crate) level: usize,
    pub(crate) prev_sibling: Option<NodeUid>,
    pub(crate) next_sibling: Option<NodeUid>,
}

impl<P> Node<P> {
    pub(crate) fn from_seed(seed: NodeSeed<P>, parent: NodeUid) -> Self {
        Self {
            uid: seed.uid,
            kind: NodeKind::Child,
            expandable: seed.expandable,
            payload: seed.payload,
            parent: Some(parent),
            children: None,
            level: 0,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub(crate) fn root(uid: NodeUid, payload: P) -> Self {
        Self {
            uid,
            kind: NodeKind::Root,
            expandable: true,
            payload,
            parent: None,
            children: None,
            level: 0,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn uid(&self) -> &NodeUid {
        &self.uid
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::Root
    }

    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn parent(&self) -> Option<&NodeUid> {
        self.parent.as_ref()
    }

    /// Child uids, or `None` when the children were never loaded.
    pub fn children(&self) -> Option<&[NodeUid]> {
        self.children.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    /// Depth in the last flattened view (`0` for the root).
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn prev_sibling(&self) -> Option<&NodeUid> {
        self.prev_sibling.as_ref()
    }

    pub fn next_sibling(&self) -> Option<&NodeUid> {
        self.next_sibling.as_ref()
    }

    /// Whether this node is the last one among its siblings.
    pub fn is_last_sibling(&self) -> bool {
        self.next_sibling.is_none()
    }
}
