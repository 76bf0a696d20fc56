use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_render::{
    Damage, DrawnLine, LineBuilder, RenderPatch, Renderer, compose_line,
};
use grove_tree::{
    CollapseOptions, ExpandOptions, ExpandStore, Locator, NodeUid, flatten,
    single_expandable_child,
};

use crate::cache::{StatusCache, StatusView};
use crate::columns::{
    BoxedColumn, DrawItem, DrawOptions, IndexKind, build_column, column_concern,
};
use crate::config::SourceColumns;
use crate::errors::Result;
use crate::event::ConcernKind;
use crate::host::BoxFuture;
use crate::model::{ExplorerNode, ExplorerTree, NodeSnapshot, Payload, SourceKind};
use crate::provider::{
    Descend, LoadContext, LoadedSubtree, NodeProvider, apply_subtree,
    load_subtree,
};
use crate::sources::BufferProvider;

/// Rows of each secondary index, by line within the source.
#[derive(Debug, Clone, Default)]
pub struct LineIndexes {
    lines: BTreeMap<IndexKind, BTreeSet<usize>>,
}

impl LineIndexes {
    pub fn contains(&self, kind: IndexKind, line: usize) -> bool {
        self.lines.get(&kind).is_some_and(|lines| lines.contains(&line))
    }

    pub fn lines(&self, kind: IndexKind) -> impl Iterator<Item = usize> + '_ {
        self.lines.get(&kind).into_iter().flatten().copied()
    }

    fn clear(&mut self) {
        self.lines.clear();
    }

    fn record(&mut self, line: usize, marks: &[IndexKind]) {
        for lines in self.lines.values_mut() {
            lines.remove(&line);
        }
        for mark in marks {
            self.lines.entry(*mark).or_default().insert(line);
        }
    }
}

/// Pending load of the children of `uid`, detached from the source.
pub struct LoadJob {
    pub uid: NodeUid,
    /// Tree generation the load was started against.
    pub generation: u64,
    pub future: BoxFuture<'static, Result<LoadedSubtree>>,
}

/// One provider's tree with its view state and the region it draws.
pub struct Source {
    kind: SourceKind,
    provider: Arc<dyn NodeProvider>,
    status: Arc<StatusCache>,
    tree: ExplorerTree,
    store: ExpandStore,
    selection: HashSet<NodeUid>,
    locator: Locator,
    renderer: Renderer,
    damage: Damage<NodeUid>,
    root_columns: Vec<BoxedColumn>,
    child_columns: Vec<BoxedColumn>,
    concerns: BTreeSet<ConcernKind>,
    indexes: LineIndexes,
    path_index: HashMap<PathBuf, Vec<NodeUid>>,
    context: LoadContext,
    options: DrawOptions,
    expand_defaults: ExpandOptions,
}

impl Source {
    pub fn new(
        provider: Arc<dyn NodeProvider>,
        status: Arc<StatusCache>,
        columns: &SourceColumns,
        options: DrawOptions,
        expand_defaults: ExpandOptions,
        context: LoadContext,
    ) -> Result<Self> {
        let build = |names: &[String]| {
            names
                .iter()
                .map(|name| build_column(name))
                .collect::<Result<Vec<_>>>()
        };
        let root_columns = build(&columns.root)?;
        let child_columns = build(&columns.child)?;
        let concerns = columns
            .root
            .iter()
            .chain(&columns.child)
            .filter_map(|name| column_concern(name))
            .collect();

        let root = provider.root(None);
        Ok(Self {
            kind: provider.kind(),
            provider,
            status,
            tree: ExplorerTree::new(root.uid, root.payload),
            store: ExpandStore::default(),
            selection: HashSet::new(),
            locator: Locator::default(),
            renderer: Renderer::new(),
            damage: Damage::Full,
            root_columns,
            child_columns,
            concerns,
            indexes: LineIndexes::default(),
            path_index: HashMap::new(),
            context,
            options,
            expand_defaults,
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn tree(&self) -> &ExplorerTree {
        &self.tree
    }

    pub fn expand_store(&self) -> &ExpandStore {
        &self.store
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn indexes(&self) -> &LineIndexes {
        &self.indexes
    }

    /// Status concerns the configured columns depend on.
    pub fn concerns(&self) -> &BTreeSet<ConcernKind> {
        &self.concerns
    }

    /// Number of lines drawn in the host buffer.
    pub fn line_count(&self) -> usize {
        self.renderer.line_count()
    }

    pub fn generation(&self) -> u64 {
        self.tree.generation()
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.tree.root().payload().path()
    }

    pub fn context(&self) -> LoadContext {
        self.context
    }

    pub fn set_show_hidden(&mut self, show_hidden: bool) {
        self.context.show_hidden = show_hidden;
    }

    pub fn expand_defaults(&self) -> ExpandOptions {
        self.expand_defaults
    }

    /// Uid shown on `line` of the last drawn frame.
    pub fn row_at(&self, line: usize) -> Option<&NodeUid> {
        self.locator.node_at(line)
    }

    pub fn node_at(&self, line: usize) -> Option<&ExplorerNode> {
        self.row_at(line).and_then(|uid| self.tree.get(uid))
    }

    /// Line showing `uid`, resolving hidden compaction members to their
    /// head.
    pub fn line_of(&self, uid: &NodeUid) -> Option<usize> {
        self.locator.visual_index_of(uid, &self.store)
    }

    /// Node actions on the row of `uid` apply to.
    pub fn resolve<'a>(&'a self, uid: &'a NodeUid) -> &'a NodeUid {
        self.store.terminal(uid)
    }

    /// Visible row representing `uid`.
    fn row_of(&self, uid: &NodeUid) -> NodeUid {
        self.store.head_of(uid).unwrap_or(uid).clone()
    }

    pub fn is_expanded(&self, uid: &NodeUid) -> bool {
        self.store.is_expanded(&self.row_of(uid))
    }

    /// Uids carrying `path`.
    pub fn uids_for_path(&self, path: &Path) -> &[NodeUid] {
        self.path_index.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Start a new root generation and load it.
    ///
    /// Selection is cleared; expanded uids and compaction chains are kept
    /// and re-applied where the new tree contains them.
    pub async fn open(&mut self, root: Option<&Path>) -> Result<()> {
        let seed = self.provider.root(root);
        self.tree.reset_root(seed.uid, seed.payload);
        self.selection.clear();
        self.renderer.invalidate();
        self.path_index.clear();
        self.damage.damage_all();
        let root = self.tree.root_uid().clone();
        self.load(&root, Descend::expanded(&self.store), false).await
    }

    /// Detached reload of `uid` (the root when `None`) that descends into
    /// previously expanded children.
    pub fn reload_job(&self, uid: Option<&NodeUid>) -> Option<LoadJob> {
        let uid = match uid {
            Some(uid) => self.reload_target(uid)?,
            None => self.tree.root_uid().clone(),
        };
        self.load_job(&uid, Descend::expanded(&self.store), usize::MAX)
    }

    fn reload_target(&self, uid: &NodeUid) -> Option<NodeUid> {
        let target = self.resolve(uid);
        let node = self.tree.get(target)?;
        if node.is_expandable() {
            Some(target.clone())
        } else {
            node.parent().cloned()
        }
    }

    fn load_job(
        &self,
        uid: &NodeUid,
        descend: Descend,
        max_depth: usize,
    ) -> Option<LoadJob> {
        let node = self.tree.get(uid)?;
        if !node.is_expandable() {
            return None;
        }
        Some(LoadJob {
            uid: uid.clone(),
            generation: self.tree.generation(),
            future: load_subtree(
                self.provider.clone(),
                NodeSnapshot::from(node),
                self.context,
                descend,
                max_depth,
            ),
        })
    }

    /// Install the result of a load.
    ///
    /// Returns `Ok(false)` without touching anything when the root was
    /// reset since the load started or `uid` is gone. A failed load
    /// returns the node to the "not loaded" state and reports the error.
    pub fn apply_load(
        &mut self,
        generation: u64,
        uid: &NodeUid,
        result: Result<LoadedSubtree>,
        mark_expanded: bool,
    ) -> Result<bool> {
        if generation != self.tree.generation() || !self.tree.contains(uid) {
            log::debug!("dropping stale load of {uid}");
            return Ok(false);
        }
        self.damage.damage_all();
        let applied = match result {
            Ok(subtree) => apply_subtree(
                &mut self.tree,
                &mut self.store,
                subtree,
                mark_expanded,
            ),
            Err(err) => {
                self.tree.unload(uid)?;
                Err(err)
            },
        };
        self.drop_broken_chains();
        self.prune_selection();
        self.rebuild_path_index();
        applied.map(|()| true)
    }

    async fn load(
        &mut self,
        uid: &NodeUid,
        descend: Descend,
        mark_expanded: bool,
    ) -> Result<()> {
        let max_depth = match descend {
            Descend::Recursive | Descend::RecursiveSingle => {
                self.expand_defaults.max_depth
            },
            Descend::Children | Descend::Expanded(_) => usize::MAX,
        };
        self.load_with_depth(uid, descend, max_depth, mark_expanded)
            .await
    }

    async fn load_with_depth(
        &mut self,
        uid: &NodeUid,
        descend: Descend,
        max_depth: usize,
        mark_expanded: bool,
    ) -> Result<()> {
        let Some(job) = self.load_job(uid, descend, max_depth) else {
            return Ok(());
        };
        let result = job.future.await;
        self.apply_load(job.generation, &job.uid, result, mark_expanded)
            .map(|_| ())
    }

    /// Reload the children of the row of `uid`, or of its parent for a
    /// leaf.
    pub async fn reload(&mut self, uid: &NodeUid) -> Result<()> {
        let Some(target) = self.reload_target(uid) else {
            log::debug!("reload of unknown node {uid} ignored");
            return Ok(());
        };
        self.load(&target, Descend::expanded(&self.store), false)
            .await
    }

    /// Expand the row of `uid`, loading children first when needed.
    ///
    /// Unknown uids, leaves and the root are ignored.
    pub async fn expand(
        &mut self,
        uid: &NodeUid,
        options: ExpandOptions,
    ) -> Result<()> {
        let Some(node) = self.tree.get(uid) else {
            log::debug!("expand of unknown node {uid} ignored");
            return Ok(());
        };
        if node.is_root() || !node.is_expandable() {
            return Ok(());
        }

        let row = self.row_of(uid);
        if options.uncompact && self.store.uncompact(&row).is_some() {
            self.damage.damage_all();
        }
        let target = self.store.terminal(&row).clone();
        let loaded = self.tree.get(&target).is_some_and(|node| node.is_loaded());

        if options.recursive {
            self.load_with_depth(
                &target,
                Descend::Recursive,
                options.max_depth,
                true,
            )
            .await?;
        } else if options.recursive_single {
            self.load_with_depth(
                &target,
                Descend::RecursiveSingle,
                options.max_depth,
                true,
            )
            .await?;
        } else if !loaded {
            self.load(&target, Descend::expanded(&self.store), false)
                .await?;
        }

        self.store.mark_expanded(&row);
        self.store.mark_expanded(&target);
        if options.compact {
            self.compact(&row, options.max_depth).await;
        }
        self.damage.damage_all();
        Ok(())
    }

    /// Merge the chain of single-child directories below `head` into its
    /// row, loading each link on the way.
    async fn compact(&mut self, head: &NodeUid, max_depth: usize) {
        let mut members = Vec::new();
        let mut current = head.clone();
        for _ in 0..max_depth {
            let loaded =
                self.tree.get(&current).is_some_and(|node| node.is_loaded());
            if !loaded {
                let descend = Descend::Children;
                if let Err(err) = self.load(&current, descend, false).await {
                    log::warn!("compaction stopped at {current}: {err}");
                    break;
                }
            }
            let Some(child) =
                single_expandable_child(&self.tree, &current).cloned()
            else {
                break;
            };
            members.push(child.clone());
            current = child;
        }

        for member in &members {
            self.store.mark_expanded(member);
        }
        if self.store.compact(head, members) {
            self.damage.damage_all();
        }
    }

    /// Release the compaction chain shown on the row of `uid`.
    ///
    /// The former members become ordinary rows and keep their expanded
    /// state.
    pub fn uncompact(&mut self, uid: &NodeUid) {
        let row = self.row_of(uid);
        if self.store.uncompact(&row).is_some() {
            self.damage.damage_all();
        }
    }

    pub fn collapse(&mut self, uid: &NodeUid, options: CollapseOptions) {
        let Some(node) = self.tree.get(uid) else {
            log::debug!("collapse of unknown node {uid} ignored");
            return;
        };
        if node.is_root() {
            return;
        }
        let row = self.row_of(uid);
        if self.store.collapse(&self.tree, &row, options) {
            self.damage.damage_all();
        }
    }

    pub async fn expand_or_collapse(&mut self, uid: &NodeUid) -> Result<()> {
        if self.is_expanded(uid) {
            self.collapse(uid, CollapseOptions::default());
            Ok(())
        } else {
            self.expand(uid, self.expand_defaults).await
        }
    }

    /// Expand every ancestor of `path` below the root and return the uid
    /// carrying it.
    pub async fn reveal(&mut self, path: &Path) -> Result<Option<NodeUid>> {
        let Some(root) = self.root_path().map(Path::to_path_buf) else {
            return Ok(None);
        };
        let Ok(relative) = path.strip_prefix(&root) else {
            return Ok(None);
        };

        let mut parent = self.tree.root_uid().clone();
        if !self.tree.root().is_loaded() {
            self.load(&parent, Descend::expanded(&self.store), false)
                .await?;
        }
        let mut current = root;
        for component in relative.components() {
            current.push(component);
            let Some(uid) = self.child_with_path(&parent, &current) else {
                return Ok(None);
            };
            if current.as_path() != path {
                let options = ExpandOptions {
                    compact: false,
                    ..self.expand_defaults
                };
                self.expand(&uid, options).await?;
            }
            parent = uid;
        }
        Ok(Some(parent))
    }

    fn child_with_path(&self, parent: &NodeUid, path: &Path) -> Option<NodeUid> {
        self.uids_for_path(path)
            .iter()
            .find(|uid| self.tree.parent(uid) == Some(parent))
            .cloned()
    }

    pub fn is_selected(&self, uid: &NodeUid) -> bool {
        self.selection.contains(&self.row_of(uid))
    }

    pub fn selected(&self) -> impl Iterator<Item = &NodeUid> {
        self.selection.iter()
    }

    pub fn select(&mut self, uid: &NodeUid) {
        if !self.tree.contains(uid) {
            return;
        }
        let row = self.row_of(uid);
        if self.selection.insert(row.clone()) {
            self.damage.damage(row);
        }
    }

    pub fn unselect(&mut self, uid: &NodeUid) {
        let row = self.row_of(uid);
        if self.selection.remove(&row) {
            self.damage.damage(row);
        }
    }

    pub fn toggle_selection(&mut self, uid: &NodeUid) {
        if self.is_selected(uid) {
            self.unselect(uid);
        } else {
            self.select(uid);
        }
    }

    pub fn clear_selection(&mut self) {
        for uid in self.selection.drain() {
            self.damage.damage(uid);
        }
    }

    /// Mark rows for redraw without structural change.
    pub fn request_redraw<'a>(&mut self, uids: impl IntoIterator<Item = &'a NodeUid>) {
        for uid in uids {
            if self.tree.contains(uid) {
                let row = self.row_of(uid);
                self.damage.damage(row);
            }
        }
    }

    /// Redraw every row carrying one of `paths`.
    pub fn redraw_paths<'a>(&mut self, paths: impl IntoIterator<Item = &'a PathBuf>) {
        let uids: Vec<NodeUid> = paths
            .into_iter()
            .flat_map(|path| self.uids_for_path(path).iter().cloned())
            .collect();
        self.request_redraw(&uids);
    }

    /// Redraw the rows of buffers `bufnrs`.
    pub fn redraw_buffers(&mut self, bufnrs: impl IntoIterator<Item = u32>) {
        if self.kind != SourceKind::Buffer {
            return;
        }
        let uids: Vec<NodeUid> =
            bufnrs.into_iter().map(BufferProvider::uid).collect();
        self.request_redraw(&uids);
    }

    /// Force every line to be redrawn on the next render.
    pub fn invalidate(&mut self) {
        self.renderer.invalidate();
        self.damage.damage_all();
    }

    pub fn is_damaged(&self) -> bool {
        !matches!(self.damage, Damage::None)
    }

    /// Turn accumulated damage into a patch of this source's region.
    ///
    /// Structural damage re-flattens the tree and diffs the whole frame;
    /// row damage only redraws the rows in place.
    pub fn render(&mut self) -> RenderPatch {
        match self.damage.take() {
            Damage::None => RenderPatch::default(),
            Damage::Full => self.render_full(),
            Damage::Partial(uids) => self.render_rows(uids),
        }
    }

    fn render_full(&mut self) -> RenderPatch {
        self.locator = Locator::new(flatten(&mut self.tree, &self.store));
        let view = self.status.view();
        let drawn: Vec<DrawnLine<IndexKind>> = self
            .locator
            .lines()
            .iter()
            .map(|uid| self.draw(uid, &view))
            .collect();

        self.indexes.clear();
        let mut frame = Vec::with_capacity(drawn.len());
        for (line, row) in drawn.into_iter().enumerate() {
            self.indexes.record(line, &row.marks);
            frame.push(row.line);
        }
        self.renderer.render_all(&frame)
    }

    fn render_rows(&mut self, uids: BTreeSet<NodeUid>) -> RenderPatch {
        let view = self.status.view();
        let mut rows = Vec::with_capacity(uids.len());
        for uid in &uids {
            let Some(line) = self.line_of(uid) else {
                continue;
            };
            if let Some(row) = self.locator.node_at(line) {
                rows.push((line, self.draw(row, &view)));
            }
        }

        let mut updates = Vec::with_capacity(rows.len());
        for (line, row) in rows {
            self.indexes.record(line, &row.marks);
            updates.push((line, row.line));
        }
        self.renderer.render_lines(updates)
    }

    fn draw(&self, uid: &NodeUid, view: &StatusView) -> DrawnLine<IndexKind> {
        let Some(node) = self.tree.get(uid) else {
            log::warn!("flattened row {uid} missing from tree");
            return LineBuilder::new().finish();
        };
        let item = DrawItem {
            node,
            tree: &self.tree,
            expand: &self.store,
            selected: self.selection.contains(uid),
            status: view,
            options: &self.options,
        };
        let columns = if node.is_root() {
            &self.root_columns
        } else {
            &self.child_columns
        };
        compose_line(columns.iter().map(|column| &**column), &item)
    }

    fn rebuild_path_index(&mut self) {
        self.path_index.clear();
        for node in self.tree.iter() {
            let path = match node.payload() {
                Payload::Bookmark(_) => continue,
                payload => payload.path(),
            };
            if let Some(path) = path {
                self.path_index
                    .entry(path.to_path_buf())
                    .or_default()
                    .push(node.uid().clone());
            }
        }
    }

    /// Release chains whose links are no longer single expandable children
    /// after a reload.
    /// Forget selected rows whose node left the tree.
    fn prune_selection(&mut self) {
        let tree = &self.tree;
        self.selection.retain(|uid| {
            let alive = tree.contains(uid);
            if !alive {
                log::debug!("unselecting vanished {uid}");
            }
            alive
        });
    }

    fn drop_broken_chains(&mut self) {
        let broken: Vec<NodeUid> = self
            .store
            .chains()
            .filter(|(head, members)| {
                let mut parent = *head;
                members.iter().any(|member| {
                    let intact =
                        single_expandable_child(&self.tree, parent) == Some(member);
                    parent = member;
                    !intact
                })
            })
            .map(|(head, _)| head.clone())
            .collect();
        for head in broken {
            log::debug!("releasing compaction chain of {head}");
            self.store.uncompact(&head);
        }
    }
}
