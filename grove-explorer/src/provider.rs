use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use grove_tree::{ExpandStore, NodeUid};

use crate::errors::Result;
use crate::host::BoxFuture;
use crate::model::{ExplorerTree, NodeSnapshot, Seed, SourceKind};

/// Settings a provider consults while listing children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadContext {
    pub show_hidden: bool,
}

/// Supplies the nodes of one source.
pub trait NodeProvider: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Root node of the source, optionally anchored at a directory.
    fn root(&self, path: Option<&Path>) -> Seed;

    /// List the children of `parent`, in display order.
    fn load_children(
        &self,
        parent: NodeSnapshot,
        context: LoadContext,
    ) -> BoxFuture<'static, Result<Vec<Seed>>>;
}

/// Which loaded children a subtree load descends into.
#[derive(Debug, Clone)]
pub enum Descend {
    /// Only the direct children.
    Children,
    /// Children that were expanded before the load (reload).
    Expanded(Arc<HashSet<NodeUid>>),
    /// Every expandable child.
    Recursive,
    /// Only while a level has exactly one expandable child.
    RecursiveSingle,
}

impl Descend {
    /// Snapshot of the expanded uids of `store`.
    pub fn expanded(store: &ExpandStore) -> Self {
        Self::Expanded(Arc::new(store.expanded().cloned().collect()))
    }
}

/// Children loaded below `parent`, with the subtrees loaded below them.
#[derive(Debug, Clone)]
pub struct LoadedSubtree {
    pub parent: NodeUid,
    pub children: Vec<LoadedChild>,
}

#[derive(Debug, Clone)]
pub struct LoadedChild {
    pub seed: Seed,
    pub subtree: Option<LoadedSubtree>,
}

/// Load the children of `parent` and descend according to `descend`.
///
/// A failure below the first level only leaves that child unloaded; a
/// failure listing `parent` itself fails the whole load.
pub fn load_subtree(
    provider: Arc<dyn NodeProvider>,
    parent: NodeSnapshot,
    context: LoadContext,
    descend: Descend,
    max_depth: usize,
) -> BoxFuture<'static, Result<LoadedSubtree>> {
    Box::pin(async move {
        let seeds = provider.load_children(parent.clone(), context).await?;
        let expandable = seeds.iter().filter(|seed| seed.expandable).count();

        let mut children = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let go = max_depth > 0
                && seed.expandable
                && match &descend {
                    Descend::Children => false,
                    Descend::Expanded(expanded) => expanded.contains(&seed.uid),
                    Descend::Recursive => true,
                    Descend::RecursiveSingle => expandable == 1,
                };
            let subtree = if go {
                let loaded = load_subtree(
                    provider.clone(),
                    NodeSnapshot::from(&seed),
                    context,
                    descend.clone(),
                    max_depth - 1,
                )
                .await;
                match loaded {
                    Ok(subtree) => Some(subtree),
                    Err(err) => {
                        log::warn!("failed to load {}: {err}", seed.uid);
                        None
                    },
                }
            } else {
                None
            };
            children.push(LoadedChild { seed, subtree });
        }

        Ok(LoadedSubtree {
            parent: parent.uid,
            children,
        })
    })
}

/// Install a loaded subtree, replacing the children of its parent.
///
/// With `mark_expanded` every node that received children is marked
/// expanded (recursive expand); otherwise the store is left untouched.
pub fn apply_subtree(
    tree: &mut ExplorerTree,
    store: &mut ExpandStore,
    subtree: LoadedSubtree,
    mark_expanded: bool,
) -> Result<()> {
    let mut nested = Vec::new();
    let mut seeds = Vec::with_capacity(subtree.children.len());
    for child in subtree.children {
        if let Some(below) = child.subtree {
            nested.push(below);
        }
        seeds.push(child.seed);
    }

    tree.set_children(&subtree.parent, seeds)?;
    for below in nested {
        if mark_expanded {
            store.mark_expanded(&below.parent);
        }
        apply_subtree(tree, store, below, mark_expanded)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeFs;
    use crate::sources::FileProvider;

    fn provider() -> Arc<dyn NodeProvider> {
        let fs = FakeFs::new()
            .with_file("/r/a/b/c/deep.txt", 1)
            .with_file("/r/a/side.txt", 1)
            .with_file("/r/z/only.txt", 1);
        Arc::new(FileProvider::new(Arc::new(fs)))
    }

    fn root(provider: &Arc<dyn NodeProvider>) -> NodeSnapshot {
        let seed = provider.root(Some(Path::new("/r")));
        NodeSnapshot::from(&seed)
    }

    fn names(subtree: &LoadedSubtree) -> Vec<String> {
        subtree
            .children
            .iter()
            .map(|child| child.seed.payload.label().to_string())
            .collect()
    }

    #[tokio::test]
    async fn given_recursive_descend_when_loaded_then_every_level_is_present() {
        let provider = provider();
        let root = root(&provider);

        let loaded = load_subtree(
            provider,
            root,
            LoadContext::default(),
            Descend::Recursive,
            20,
        )
        .await
        .expect("load should succeed");

        assert_eq!(names(&loaded), vec!["a", "z"]);
        let a = loaded.children[0].subtree.as_ref().expect("a loaded");
        assert_eq!(names(a), vec!["b", "side.txt"]);
        let b = a.children[0].subtree.as_ref().expect("b loaded");
        assert!(b.children[0].subtree.is_some());
    }

    #[tokio::test]
    async fn given_recursive_single_when_loaded_then_forks_stop_descent() {
        let provider = provider();
        let root = root(&provider);

        let loaded = load_subtree(
            provider,
            root,
            LoadContext::default(),
            Descend::RecursiveSingle,
            20,
        )
        .await
        .expect("load should succeed");

        assert!(loaded.children.iter().all(|child| child.subtree.is_none()));
    }

    #[tokio::test]
    async fn given_depth_limit_when_loaded_then_descent_stops() {
        let provider = provider();
        let root = root(&provider);

        let loaded = load_subtree(
            provider,
            root,
            LoadContext::default(),
            Descend::Recursive,
            1,
        )
        .await
        .expect("load should succeed");

        let a = loaded.children[0].subtree.as_ref().expect("a loaded");
        assert!(a.children.iter().all(|child| child.subtree.is_none()));
    }
}
