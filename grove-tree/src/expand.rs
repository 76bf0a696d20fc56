use std::collections::{HashMap, HashSet};

use crate::node::NodeUid;
use crate::tree::Tree;

/// Depth bound for recursive expansion.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Options accepted by an expand request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Expand every expandable descendant, bounded by `max_depth`.
    pub recursive: bool,
    /// Merge a chain of single-child directories into one row.
    pub compact: bool,
    /// Release an existing compaction chain before expanding.
    pub uncompact: bool,
    /// Keep descending while each level has exactly one expandable child.
    pub recursive_single: bool,
    pub max_depth: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            compact: false,
            uncompact: false,
            recursive_single: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Options accepted by a collapse request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseOptions {
    /// Also forget the expanded state of every descendant.
    pub recursive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactState {
    None,
    Compacted,
}

/// Expanded uids plus directory compaction chains.
///
/// Everything is keyed by uid, so the state survives reloads that rebuild
/// the node objects. A compaction chain is stored on its head (the visible
/// row); `members` lists the hidden single-child directories below it in
/// order, the last one being the chain terminal.
#[derive(Debug, Clone, Default)]
pub struct ExpandStore {
    expanded: HashSet<NodeUid>,
    chains: HashMap<NodeUid, Vec<NodeUid>>,
    heads: HashMap<NodeUid, NodeUid>,
}

impl ExpandStore {
    pub fn is_expanded(&self, uid: &NodeUid) -> bool {
        self.expanded.contains(uid)
    }

    /// Mark `uid` expanded. Returns `false` when it already was.
    pub fn mark_expanded(&mut self, uid: &NodeUid) -> bool {
        self.expanded.insert(uid.clone())
    }

    /// Mark `uid` collapsed. Returns `false` when it was not expanded.
    pub fn mark_collapsed(&mut self, uid: &NodeUid) -> bool {
        self.expanded.remove(uid)
    }

    /// Collapse `uid`; with `recursive` every loaded descendant is reset
    /// too, including compaction chains, so re-expanding starts clean.
    ///
    /// Returns whether anything changed.
    pub fn collapse<P>(
        &mut self,
        tree: &Tree<P>,
        uid: &NodeUid,
        options: CollapseOptions,
    ) -> bool {
        let mut changed = self.mark_collapsed(uid);
        if !options.recursive {
            return changed;
        }

        if self.uncompact(uid).is_some() {
            changed = true;
        }
        for descendant in tree.descendants(uid) {
            changed |= self.mark_collapsed(&descendant);
            changed |= self.uncompact(&descendant).is_some();
        }
        changed
    }

    pub fn expanded(&self) -> impl Iterator<Item = &NodeUid> {
        self.expanded.iter()
    }

    /// Install a compaction chain for `head`.
    ///
    /// Any chain previously owned by `head` or by one of the members is
    /// released first. Returns `false` for an empty chain.
    pub fn compact(&mut self, head: &NodeUid, members: Vec<NodeUid>) -> bool {
        if members.is_empty() {
            return false;
        }

        self.uncompact(head);
        for member in &members {
            self.uncompact(member);
            if let Some(owner) = self.heads.get(member).cloned() {
                self.uncompact(&owner);
            }
        }
        for member in &members {
            self.heads.insert(member.clone(), head.clone());
        }
        self.chains.insert(head.clone(), members);
        true
    }

    /// Release the chain owned by `head`, returning its members.
    pub fn uncompact(&mut self, head: &NodeUid) -> Option<Vec<NodeUid>> {
        let members = self.chains.remove(head)?;
        for member in &members {
            self.heads.remove(member);
        }
        Some(members)
    }

    pub fn compact_state(&self, uid: &NodeUid) -> CompactState {
        if self.chains.contains_key(uid) {
            CompactState::Compacted
        } else {
            CompactState::None
        }
    }

    /// Hidden members of the chain headed by `head` (empty when none).
    pub fn chain(&self, head: &NodeUid) -> &[NodeUid] {
        self.chains.get(head).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every compaction chain as `(head, members)`.
    pub fn chains(&self) -> impl Iterator<Item = (&NodeUid, &[NodeUid])> {
        self.chains
            .iter()
            .map(|(head, members)| (head, members.as_slice()))
    }

    /// Head of the chain `uid` is a hidden member of.
    pub fn head_of(&self, uid: &NodeUid) -> Option<&NodeUid> {
        self.heads.get(uid)
    }

    /// Deepest node represented by the row of `uid`.
    ///
    /// Actions on a compacted row (open, delete, rename, loading children)
    /// apply to this node rather than to the visual head.
    pub fn terminal<'a>(&'a self, uid: &'a NodeUid) -> &'a NodeUid {
        self.chains
            .get(uid)
            .and_then(|members| members.last())
            .unwrap_or(uid)
    }

    /// Drop state for uids rejected by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&NodeUid) -> bool) {
        self.expanded.retain(|uid| keep(uid));
        let dropped: Vec<NodeUid> = self
            .chains
            .keys()
            .filter(|head| !keep(head))
            .cloned()
            .collect();
        for head in dropped {
            self.uncompact(&head);
        }
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
        self.chains.clear();
        self.heads.clear();
    }
}

/// The only child of `uid` when it has exactly one loaded child and that
/// child is expandable.
///
/// Compaction walks this relation to find single-child directory chains.
pub fn single_expandable_child<'a, P>(
    tree: &'a Tree<P>,
    uid: &NodeUid,
) -> Option<&'a NodeUid> {
    match tree.children(uid)? {
        [only] if tree.get(only).is_some_and(|node| node.is_expandable()) => {
            Some(only)
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSeed;

    fn uid(key: &str) -> NodeUid {
        NodeUid::new("test", key)
    }

    fn chain_tree() -> Tree<()> {
        let mut tree = Tree::new(uid("root"), ());
        tree.set_children(&uid("root"), vec![NodeSeed::branch(uid("a"), ())])
            .expect("attach a");
        tree.set_children(&uid("a"), vec![NodeSeed::branch(uid("a/b"), ())])
            .expect("attach b");
        tree.set_children(
            &uid("a/b"),
            vec![NodeSeed::branch(uid("a/b/c"), ())],
        )
        .expect("attach c");
        tree.set_children(
            &uid("a/b/c"),
            vec![NodeSeed::leaf(uid("a/b/c/f"), ())],
        )
        .expect("attach f");
        tree
    }

    #[test]
    fn given_expanded_node_when_expanded_again_then_no_change_is_reported() {
        let mut store = ExpandStore::default();

        assert!(store.mark_expanded(&uid("a")));
        assert!(!store.mark_expanded(&uid("a")));
    }

    #[test]
    fn given_never_expanded_node_when_collapsed_then_no_change_is_reported() {
        let tree = chain_tree();
        let mut store = ExpandStore::default();

        assert!(!store.collapse(&tree, &uid("a"), CollapseOptions::default()));
    }

    #[test]
    fn given_recursive_collapse_when_applied_then_descendants_reset() {
        let tree = chain_tree();
        let mut store = ExpandStore::default();
        for key in ["a", "a/b", "a/b/c"] {
            store.mark_expanded(&uid(key));
        }

        store.collapse(&tree, &uid("a"), CollapseOptions { recursive: true });

        assert_eq!(store.expanded().count(), 0);
    }

    #[test]
    fn given_chain_when_compacted_then_terminal_and_heads_resolve() {
        let mut store = ExpandStore::default();

        assert!(store.compact(&uid("a"), vec![uid("a/b"), uid("a/b/c")]));

        assert_eq!(store.compact_state(&uid("a")), CompactState::Compacted);
        assert_eq!(store.terminal(&uid("a")), &uid("a/b/c"));
        assert_eq!(store.head_of(&uid("a/b")), Some(&uid("a")));
        assert_eq!(store.terminal(&uid("a/b")), &uid("a/b"));
    }

    #[test]
    fn given_compacted_chain_when_uncompacted_then_members_are_released() {
        let mut store = ExpandStore::default();
        store.compact(&uid("a"), vec![uid("a/b"), uid("a/b/c")]);

        let members = store.uncompact(&uid("a")).expect("chain exists");

        assert_eq!(members, vec![uid("a/b"), uid("a/b/c")]);
        assert_eq!(store.compact_state(&uid("a")), CompactState::None);
        assert!(store.head_of(&uid("a/b")).is_none());
    }

    #[test]
    fn given_member_of_chain_when_compacted_as_head_then_old_chain_released() {
        let mut store = ExpandStore::default();
        store.compact(&uid("a"), vec![uid("a/b"), uid("a/b/c")]);

        store.compact(&uid("a/b"), vec![uid("a/b/c")]);

        assert_eq!(store.compact_state(&uid("a")), CompactState::None);
        assert_eq!(store.head_of(&uid("a/b/c")), Some(&uid("a/b")));
    }

    #[test]
    fn given_empty_chain_when_compacted_then_rejected() {
        let mut store = ExpandStore::default();

        assert!(!store.compact(&uid("a"), Vec::new()));
        assert_eq!(store.compact_state(&uid("a")), CompactState::None);
    }

    #[test]
    fn given_single_child_dirs_when_walked_then_chain_is_found() {
        let tree = chain_tree();

        assert_eq!(single_expandable_child(&tree, &uid("a")), Some(&uid("a/b")));
        assert_eq!(single_expandable_child(&tree, &uid("a/b/c")), None);
    }
}
