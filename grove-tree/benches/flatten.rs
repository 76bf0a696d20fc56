use criterion::{Criterion, black_box, criterion_group, criterion_main};
use grove_tree::{ExpandStore, Locator, NodeSeed, NodeUid, Tree, flatten};

/// Build a directory-like tree `width` wide and `depth` deep, everything
/// loaded and expanded.
fn build_tree(width: usize, depth: usize) -> (Tree<()>, ExpandStore) {
    let root = NodeUid::new("bench", "root");
    let mut tree = Tree::new(root.clone(), ());
    let mut store = ExpandStore::default();
    let mut frontier = vec![(root, String::from("root"), 0)];

    while let Some((parent, key, level)) = frontier.pop() {
        if level == depth {
            continue;
        }
        let seeds: Vec<NodeSeed<()>> = (0..width)
            .map(|index| {
                let uid = NodeUid::new("bench", &format!("{key}/{index}"));
                NodeSeed::branch(uid, ())
            })
            .collect();
        let children = tree
            .set_children(&parent, seeds)
            .expect("bench tree uids are unique");
        for child in children {
            store.mark_expanded(&child);
            let child_key = child.as_str().to_owned();
            frontier.push((child, child_key, level + 1));
        }
    }

    (tree, store)
}

fn bench_flatten(c: &mut Criterion) {
    let (mut tree, store) = build_tree(8, 4);

    c.bench_function("flatten_expanded_4681_nodes", |b| {
        b.iter(|| {
            let lines = flatten(&mut tree, &store);
            black_box(Locator::new(lines).len());
        });
    });
}

criterion_group!(tree, bench_flatten);
criterion_main!(tree);
