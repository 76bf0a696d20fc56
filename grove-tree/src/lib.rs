//! Tree model helpers for the grove explorer.
//!
//! This crate is UI-agnostic and synchronous. It owns:
//! - the node arena ([`Tree`]) keyed by stable [`NodeUid`]s, so parent and
//!   sibling back-references are plain identifiers instead of pointers;
//! - the expand/collapse state ([`ExpandStore`]) including directory
//!   compaction chains;
//! - flattening of the expanded tree into display order ([`flatten`]) and
//!   the inverse mapping from line index to node ([`Locator`]);
//! - directional scans used by "next/previous X" navigation
//!   ([`scan_index_next`], [`scan_index_prev`]);
//! - natural name ordering for providers ([`compare_names`]).
//!
//! Loading children is not done here: providers produce [`NodeSeed`]s and
//! the caller attaches them with [`Tree::set_children`].
//!
//! # Quick Example
//!
//! ```
//! use grove_tree::{ExpandStore, NodeSeed, NodeUid, Tree, flatten};
//!
//! let root = NodeUid::new("file", "/repo");
//! let src = NodeUid::new("file", "/repo/src");
//! let mut tree = Tree::new(root.clone(), "repo");
//! tree.set_children(
//!     &root,
//!     vec![
//!         NodeSeed::branch(src.clone(), "src"),
//!         NodeSeed::leaf(NodeUid::new("file", "/repo/README.md"), "README.md"),
//!     ],
//! )
//! .unwrap();
//!
//! let store = ExpandStore::default();
//! let lines = flatten(&mut tree, &store);
//! assert_eq!(lines.len(), 3);
//! assert_eq!(tree.get(&src).map(|node| node.level()), Some(1));
//! ```

mod error;
mod expand;
mod flatten;
mod locator;
mod node;
mod scan;
mod sort;
mod tree;

pub use error::{Result, TreeError};
pub use expand::{
    CollapseOptions, CompactState, DEFAULT_MAX_DEPTH, ExpandOptions,
    ExpandStore, single_expandable_child,
};
pub use flatten::flatten;
pub use locator::{Locator, clamp_index};
pub use node::{Node, NodeKind, NodeSeed, NodeUid, normalize_path};
pub use scan::{
    scan_index_next, scan_index_next_by, scan_index_prev, scan_index_prev_by,
};
pub use sort::{compare_entries, compare_names};
pub use tree::Tree;
