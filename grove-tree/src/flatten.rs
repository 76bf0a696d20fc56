use crate::expand::ExpandStore;
use crate::node::NodeUid;
use crate::tree::Tree;

/// Flatten a tree into its visible rows, in display order.
///
/// The traversal is a pre-order depth-first walk that only descends into
/// nodes marked expanded in `store`; the root is always descended into.
/// Nodes whose children were never loaded contribute no descendants.
///
/// For a compacted head the children shown are those of the chain
/// terminal, one level below the head; hidden chain members get no row.
///
/// As a side effect every visited node gets its `level` and sibling links
/// rewritten. The result depends only on the tree and the store, so the
/// function can be re-run at any time.
pub fn flatten<P>(tree: &mut Tree<P>, store: &ExpandStore) -> Vec<NodeUid> {
    let root = tree.root_uid().clone();
    let mut lines = Vec::with_capacity(tree.len());

    tree.link(&root, 0, None, None);
    lines.push(root.clone());
    push_children(tree, store, &root, 1, &mut lines);

    lines
}

fn push_children<P>(
    tree: &mut Tree<P>,
    store: &ExpandStore,
    row: &NodeUid,
    level: usize,
    lines: &mut Vec<NodeUid>,
) {
    let source = store.terminal(row);
    let Some(children) = tree.children(source).map(<[NodeUid]>::to_vec)
    else {
        return;
    };

    for (index, child) in children.iter().enumerate() {
        let prev = index
            .checked_sub(1)
            .and_then(|prev| children.get(prev))
            .cloned();
        let next = children.get(index + 1).cloned();
        tree.link(child, level, prev, next);
        lines.push(child.clone());

        let descend = store.is_expanded(child)
            && tree.get(child).is_some_and(|node| node.is_expandable());
        if descend {
            push_children(tree, store, child, level + 1, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSeed;

    fn uid(key: &str) -> NodeUid {
        NodeUid::new("test", key)
    }

    /// root
    /// ├ a/
    /// │ ├ a/x
    /// │ └ a/y/
    /// │   └ a/y/z
    /// ├ b/        (never loaded)
    /// └ c
    fn sample() -> Tree<()> {
        let mut tree = Tree::new(uid("root"), ());
        tree.set_children(
            &uid("root"),
            vec![
                NodeSeed::branch(uid("a"), ()),
                NodeSeed::branch(uid("b"), ()),
                NodeSeed::leaf(uid("c"), ()),
            ],
        )
        .expect("root");
        tree.set_children(
            &uid("a"),
            vec![
                NodeSeed::leaf(uid("a/x"), ()),
                NodeSeed::branch(uid("a/y"), ()),
            ],
        )
        .expect("a");
        tree.set_children(&uid("a/y"), vec![NodeSeed::leaf(uid("a/y/z"), ())])
            .expect("a/y");
        tree
    }

    fn keys(lines: &[NodeUid]) -> Vec<String> {
        lines
            .iter()
            .map(|uid| uid.as_str().trim_start_matches("test://").to_owned())
            .collect()
    }

    #[test]
    fn given_nothing_expanded_when_flattened_then_root_children_are_visible() {
        let mut tree = sample();

        let lines = flatten(&mut tree, &ExpandStore::default());

        assert_eq!(keys(&lines), vec!["root", "a", "b", "c"]);
    }

    #[test]
    fn given_expanded_chain_when_flattened_then_preorder_with_levels() {
        let mut tree = sample();
        let mut store = ExpandStore::default();
        store.mark_expanded(&uid("a"));
        store.mark_expanded(&uid("a/y"));

        let lines = flatten(&mut tree, &store);

        assert_eq!(
            keys(&lines),
            vec!["root", "a", "a/x", "a/y", "a/y/z", "b", "c"]
        );
        let levels: Vec<usize> = lines
            .iter()
            .map(|uid| tree.get(uid).map(|node| node.level()).unwrap_or(99))
            .collect();
        assert_eq!(levels, vec![0, 1, 2, 2, 3, 1, 1]);
    }

    #[test]
    fn given_collapsed_parent_when_flattened_then_expanded_child_is_hidden() {
        let mut tree = sample();
        let mut store = ExpandStore::default();
        store.mark_expanded(&uid("a/y"));

        let lines = flatten(&mut tree, &store);

        assert!(!lines.contains(&uid("a/y/z")));
        assert!(!lines.contains(&uid("a/y")));
    }

    #[test]
    fn given_unloaded_expanded_node_when_flattened_then_no_descendants() {
        let mut tree = sample();
        let mut store = ExpandStore::default();
        store.mark_expanded(&uid("b"));

        let lines = flatten(&mut tree, &store);

        assert_eq!(keys(&lines), vec!["root", "a", "b", "c"]);
    }

    #[test]
    fn given_flattened_tree_when_siblings_inspected_then_links_are_set() {
        let mut tree = sample();
        let _ = flatten(&mut tree, &ExpandStore::default());

        let b = tree.get(&uid("b")).expect("b exists");
        assert_eq!(b.prev_sibling(), Some(&uid("a")));
        assert_eq!(b.next_sibling(), Some(&uid("c")));
        assert!(tree.get(&uid("c")).is_some_and(|c| c.is_last_sibling()));
    }

    #[test]
    fn given_any_expand_subset_when_flattened_then_visibility_matches_ancestors()
    {
        let expandable = [uid("a"), uid("a/y"), uid("b")];

        for mask in 0..(1u32 << expandable.len()) {
            let mut tree = sample();
            let mut store = ExpandStore::default();
            for (bit, key) in expandable.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    store.mark_expanded(key);
                }
            }

            let lines = flatten(&mut tree, &store);
            let all: Vec<NodeUid> = std::iter::once(uid("root"))
                .chain(tree.descendants(&uid("root")))
                .collect();

            for node in all {
                let ancestors = tree.ancestors(&node);
                let visible = ancestors
                    .iter()
                    .filter(|ancestor| **ancestor != uid("root"))
                    .all(|ancestor| store.is_expanded(ancestor));
                assert_eq!(lines.contains(&node), visible, "mask {mask}");
                if visible {
                    let level = tree.get(&node).map(|n| n.level());
                    assert_eq!(level, Some(ancestors.len()), "mask {mask}");
                }
            }
        }
    }

    #[test]
    fn given_compacted_head_when_flattened_then_terminal_children_follow_head()
    {
        let mut tree = Tree::new(uid("root"), ());
        tree.set_children(&uid("root"), vec![NodeSeed::branch(uid("a"), ())])
            .expect("root");
        tree.set_children(&uid("a"), vec![NodeSeed::branch(uid("a/b"), ())])
            .expect("a");
        tree.set_children(&uid("a/b"), vec![NodeSeed::leaf(uid("a/b/f"), ())])
            .expect("a/b");
        let mut store = ExpandStore::default();
        store.mark_expanded(&uid("a"));
        store.mark_expanded(&uid("a/b"));
        store.compact(&uid("a"), vec![uid("a/b")]);

        let lines = flatten(&mut tree, &store);

        assert_eq!(keys(&lines), vec!["root", "a", "a/b/f"]);
        assert_eq!(tree.get(&uid("a/b/f")).map(|n| n.level()), Some(2));
    }
}
