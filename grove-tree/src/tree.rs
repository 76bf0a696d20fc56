use std::collections::{HashMap, HashSet};

use crate::error::{Result, TreeError};
use crate::node::{Node, NodeSeed, NodeUid};

/// Arena of nodes keyed by uid.
///
/// The arena is the only owner of nodes; parents, children and siblings
/// refer to each other by [`NodeUid`]. A source keeps exactly one tree and
/// replaces the root with [`Tree::reset_root`] when its root changes, which
/// bumps the generation counter so late async results can be discarded.
#[derive(Debug, Clone)]
pub struct Tree<P> {
    root: NodeUid,
    nodes: HashMap<NodeUid, Node<P>>,
    generation: u64,
}

impl<P> Tree<P> {
    /// Create a tree holding only its root node.
    pub fn new(root: NodeUid, payload: P) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), Node::root(root.clone(), payload));
        Self {
            root,
            nodes,
            generation: 0,
        }
    }

    /// Drop every node and start a new root generation.
    pub fn reset_root(&mut self, root: NodeUid, payload: P) {
        self.nodes.clear();
        self.nodes
            .insert(root.clone(), Node::root(root.clone(), payload));
        self.root = root;
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn root_uid(&self) -> &NodeUid {
        &self.root
    }

    pub fn root(&self) -> &Node<P> {
        // The root entry is inserted on construction and on every reset and
        // is never removed by `set_children`.
        &self.nodes[&self.root]
    }

    pub fn get(&self, uid: &NodeUid) -> Option<&Node<P>> {
        self.nodes.get(uid)
    }

    pub fn contains(&self, uid: &NodeUid) -> bool {
        self.nodes.contains_key(uid)
    }

    /// Mutable access to a node payload. Structure stays owned by the tree.
    pub fn payload_mut(&mut self, uid: &NodeUid) -> Option<&mut P> {
        self.nodes.get_mut(uid).map(|node| &mut node.payload)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node<P>> {
        self.nodes.values()
    }

    /// Child uids of a loaded node.
    pub fn children(&self, uid: &NodeUid) -> Option<&[NodeUid]> {
        self.nodes.get(uid).and_then(Node::children)
    }

    pub fn parent(&self, uid: &NodeUid) -> Option<&NodeUid> {
        self.nodes.get(uid).and_then(Node::parent)
    }

    /// Ancestors of `uid`, nearest first, ending with the root.
    pub fn ancestors(&self, uid: &NodeUid) -> Vec<NodeUid> {
        let mut out = Vec::new();
        let mut current = self.parent(uid);
        while let Some(parent) = current {
            out.push(parent.clone());
            current = self.parent(parent);
        }
        out
    }

    /// Whether `ancestor` is a strict ancestor of `uid`.
    pub fn is_ancestor(&self, ancestor: &NodeUid, uid: &NodeUid) -> bool {
        let mut current = self.parent(uid);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Loaded descendants of `uid` in pre-order, excluding `uid` itself.
    pub fn descendants(&self, uid: &NodeUid) -> Vec<NodeUid> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeUid> = self
            .children(uid)
            .map(|children| children.iter().rev().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            out.push(current.clone());
            if let Some(children) = self.children(current) {
                stack.extend(children.iter().rev());
            }
        }
        out
    }

    /// Replace the children of `parent` wholesale.
    ///
    /// Previous children and their loaded descendants leave the arena; nodes
    /// with the same uid are recreated from the seeds, so no node object
    /// survives a reload. Returns the new child uids in order.
    pub fn set_children(
        &mut self,
        parent: &NodeUid,
        seeds: Vec<NodeSeed<P>>,
    ) -> Result<Vec<NodeUid>> {
        let node = self
            .nodes
            .get(parent)
            .ok_or_else(|| TreeError::UnknownNode(parent.clone()))?;
        if !node.expandable {
            return Err(TreeError::NotExpandable(parent.clone()));
        }

        let previous: HashSet<NodeUid> =
            self.descendants(parent).into_iter().collect();
        let mut seen = HashSet::with_capacity(seeds.len());
        for seed in &seeds {
            let reused = previous.contains(&seed.uid);
            let clashes = self.nodes.contains_key(&seed.uid) && !reused;
            if clashes || !seen.insert(seed.uid.clone()) {
                return Err(TreeError::DuplicateUid(seed.uid.clone()));
            }
        }

        for uid in &previous {
            self.nodes.remove(uid);
        }

        let mut children = Vec::with_capacity(seeds.len());
        for seed in seeds {
            children.push(seed.uid.clone());
            let node = Node::from_seed(seed, parent.clone());
            self.nodes.insert(node.uid.clone(), node);
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children = Some(children.clone());
        }
        Ok(children)
    }

    /// Forget the children of `uid`, returning it to the "not loaded" state.
    pub fn unload(&mut self, uid: &NodeUid) -> Result<()> {
        if !self.nodes.contains_key(uid) {
            return Err(TreeError::UnknownNode(uid.clone()));
        }
        for descendant in self.descendants(uid) {
            self.nodes.remove(&descendant);
        }
        if let Some(node) = self.nodes.get_mut(uid) {
            node.children = None;
        }
        Ok(())
    }

    pub(crate) fn link(
        &mut self,
        uid: &NodeUid,
        level: usize,
        prev_sibling: Option<NodeUid>,
        next_sibling: Option<NodeUid>,
    ) {
        if let Some(node) = self.nodes.get_mut(uid) {
            node.level = level;
            node.prev_sibling = prev_sibling;
            node.next_sibling = next_sibling;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(key: &str) -> NodeUid {
        NodeUid::new("test", key)
    }

    fn sample() -> Tree<&'static str> {
        let mut tree = Tree::new(uid("root"), "root");
        tree.set_children(
            &uid("root"),
            vec![
                NodeSeed::branch(uid("a"), "a"),
                NodeSeed::leaf(uid("b"), "b"),
            ],
        )
        .expect("root children attach");
        tree.set_children(&uid("a"), vec![NodeSeed::leaf(uid("a/x"), "x")])
            .expect("a children attach");
        tree
    }

    #[test]
    fn given_new_tree_when_inspected_then_root_is_not_loaded() {
        let tree = Tree::new(uid("root"), ());

        assert!(tree.root().is_root());
        assert!(!tree.root().is_loaded());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn given_empty_seed_list_when_attached_then_children_are_loaded_empty() {
        let mut tree = Tree::new(uid("root"), ());
        tree.set_children(&uid("root"), Vec::new())
            .expect("empty children attach");

        assert_eq!(tree.children(&uid("root")), Some(&[][..]));
    }

    #[test]
    fn given_reload_when_children_replaced_then_old_descendants_leave_arena() {
        let mut tree = sample();

        tree.set_children(
            &uid("root"),
            vec![
                NodeSeed::branch(uid("a"), "a2"),
                NodeSeed::leaf(uid("c"), "c"),
            ],
        )
        .expect("reload attaches");

        assert!(!tree.contains(&uid("a/x")));
        assert!(!tree.contains(&uid("b")));
        assert_eq!(tree.get(&uid("a")).map(|n| *n.payload()), Some("a2"));
        assert!(!tree.get(&uid("a")).is_some_and(|n| n.is_loaded()));
    }

    #[test]
    fn given_leaf_parent_when_children_attached_then_not_expandable_error() {
        let mut tree = sample();

        let err = tree
            .set_children(&uid("b"), Vec::new())
            .expect_err("leaf rejects children");

        assert_eq!(err, TreeError::NotExpandable(uid("b")));
    }

    #[test]
    fn given_duplicate_seeds_when_attached_then_error_and_tree_unchanged() {
        let mut tree = sample();

        let err = tree
            .set_children(
                &uid("a"),
                vec![NodeSeed::leaf(uid("b"), "dup")],
            )
            .expect_err("uid owned elsewhere");

        assert_eq!(err, TreeError::DuplicateUid(uid("b")));
        assert!(tree.contains(&uid("a/x")));
    }

    #[test]
    fn given_nested_node_when_walking_up_then_ancestors_end_at_root() {
        let tree = sample();

        assert_eq!(tree.ancestors(&uid("a/x")), vec![uid("a"), uid("root")]);
        assert!(tree.is_ancestor(&uid("root"), &uid("a/x")));
        assert!(!tree.is_ancestor(&uid("b"), &uid("a/x")));
    }

    #[test]
    fn given_loaded_tree_when_descendants_listed_then_preorder_is_used() {
        let tree = sample();

        assert_eq!(
            tree.descendants(&uid("root")),
            vec![uid("a"), uid("a/x"), uid("b")]
        );
    }

    #[test]
    fn given_unload_when_applied_then_children_become_unknown() {
        let mut tree = sample();

        tree.unload(&uid("a")).expect("known node");

        assert!(tree.children(&uid("a")).is_none());
        assert!(!tree.contains(&uid("a/x")));
    }

    #[test]
    fn given_reset_root_when_applied_then_generation_advances() {
        let mut tree = sample();
        let before = tree.generation();

        tree.reset_root(uid("other"), "other");

        assert_eq!(tree.generation(), before + 1);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_uid(), &uid("other"));
    }
}
