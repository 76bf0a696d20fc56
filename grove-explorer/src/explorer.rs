//! Multi-source explorer drawn into one host buffer.
//!
//! Sources are stacked top to bottom; each owns a contiguous region of the
//! buffer. Every mutation (actions, background events) only records damage
//! on the affected source. [`Explorer::flush`] turns the damage of all
//! sources into patches and applies them in one host batch, keeping the
//! cursor on the node it was on.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use grove_render::{BufferSink, apply_patch};
use grove_tree::{
    ExpandOptions, NodeUid, clamp_index, scan_index_next_by,
    scan_index_prev_by,
};
use tokio::task::JoinHandle;

use crate::action::{Action, OpenStrategy, Target};
use crate::binder::{
    BindGuard, Binder, Concern, DiagnosticConcern, GitConcern,
    ModifiedConcern,
};
use crate::bus::EventBus;
use crate::cache::StatusCache;
use crate::clipboard::{Clipboard, ClipboardMode, ClipboardState};
use crate::columns::{DrawOptions, IndexKind};
use crate::config::ExplorerConfig;
use crate::errors::{ExplorerError, Result};
use crate::event::{ConcernKind, ExplorerEffect, ExplorerEvent, ExternalEvent};
use crate::host::{
    BookmarkStore, BufferList, CursorControl, DiagnosticProvider, FileSystem,
    StateStore, VcsStatusProvider,
};
use crate::model::{Payload, SourceKind};
use crate::provider::{LoadContext, NodeProvider};
use crate::root::{RootContext, resolve_root};
use crate::source::{LoadJob, Source};
use crate::sources::{BookmarkProvider, BufferProvider, FileProvider};
use crate::task::{Raced, race_timeout};

/// Host services an explorer reads from and acts through.
#[derive(Clone)]
pub struct Collaborators {
    pub fs: Arc<dyn FileSystem>,
    pub vcs: Arc<dyn VcsStatusProvider>,
    pub diagnostics: Arc<dyn DiagnosticProvider>,
    pub buffers: Arc<dyn BufferList>,
    pub bookmarks: Arc<dyn BookmarkStore>,
    pub state: Arc<dyn StateStore>,
}

/// Services shared by every explorer of a host.
#[derive(Debug, Clone, Default)]
pub struct Services {
    pub bus: Arc<EventBus>,
    pub status: Arc<StatusCache>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Explorer panel bound to host `H`.
pub struct Explorer<H: BufferSink + CursorControl> {
    host: H,
    config: ExplorerConfig,
    sources: Vec<Source>,
    fs: Arc<dyn FileSystem>,
    clipboard: Clipboard,
    services: Services,
    git: Arc<Binder<GitConcern>>,
    diagnostics: Arc<Binder<DiagnosticConcern>>,
    modified: Arc<Binder<ModifiedConcern>>,
    guards: Vec<BindGuard>,
    watched_root: Option<PathBuf>,
    watcher: Option<JoinHandle<()>>,
    outlet: Sender<ExplorerEvent>,
    inbox: Receiver<ExplorerEvent>,
    show_hidden: bool,
}

impl<H: BufferSink + CursorControl> Explorer<H> {
    /// Build the configured sources. Nothing is loaded or drawn until
    /// [`Explorer::open`].
    pub fn new(
        host: H,
        config: ExplorerConfig,
        collaborators: Collaborators,
        services: Services,
    ) -> Result<Self> {
        let (outlet, inbox) = flume::unbounded();
        let options = DrawOptions {
            indent_guides: config.indent_guides,
            name_width: config.name_width,
            size_width: config.size_width,
        };
        let context = LoadContext {
            show_hidden: config.show_hidden,
        };

        let mut sources: Vec<Source> = Vec::with_capacity(config.sources.len());
        for kind in &config.sources {
            if sources.iter().any(|source| source.kind() == *kind) {
                log::warn!("source {kind} configured twice, keeping the first");
                continue;
            }
            let provider: Arc<dyn NodeProvider> = match kind {
                SourceKind::File => {
                    Arc::new(FileProvider::new(collaborators.fs.clone()))
                },
                SourceKind::Buffer => {
                    Arc::new(BufferProvider::new(collaborators.buffers.clone()))
                },
                SourceKind::Bookmark => Arc::new(BookmarkProvider::new(
                    collaborators.bookmarks.clone(),
                )),
            };
            sources.push(Source::new(
                provider,
                services.status.clone(),
                &config.columns_for(*kind),
                options,
                config.expand_options(),
                context,
            )?);
        }

        let debounce = config.debounce;
        let git = Binder::new(
            GitConcern::new(
                collaborators.vcs.clone(),
                services.status.clone(),
                Duration::from_millis(debounce.git),
            ),
            services.bus.clone(),
            outlet.clone(),
        );
        let diagnostics = Binder::new(
            DiagnosticConcern::new(
                collaborators.diagnostics.clone(),
                services.status.clone(),
                Duration::from_millis(debounce.diagnostics),
            ),
            services.bus.clone(),
            outlet.clone(),
        );
        let modified = Binder::new(
            ModifiedConcern::new(
                collaborators.buffers.clone(),
                services.status.clone(),
                Duration::from_millis(debounce.buffer_modified),
            ),
            services.bus.clone(),
            outlet.clone(),
        );

        Ok(Self {
            host,
            show_hidden: config.show_hidden,
            config,
            sources,
            fs: collaborators.fs,
            clipboard: Clipboard::new(collaborators.state),
            services,
            git,
            diagnostics,
            modified,
            guards: Vec::new(),
            watched_root: None,
            watcher: None,
            outlet,
            inbox,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, kind: SourceKind) -> Option<&Source> {
        self.sources.iter().find(|source| source.kind() == kind)
    }

    fn source_index(&self, kind: SourceKind) -> Option<usize> {
        self.sources.iter().position(|source| source.kind() == kind)
    }

    /// Resolve roots, load every source, bind status concerns and draw.
    ///
    /// Opening again starts a new root generation; expanded state is kept
    /// by uid.
    pub async fn open(&mut self, context: RootContext) -> Result<()> {
        let root = resolve_root(
            &self.config.root_strategies,
            &self.config.root_patterns,
            &context,
            self.fs.as_ref(),
        )
        .await;
        if root.is_none() {
            log::warn!("no root strategy resolved a directory, using /");
        }

        for source in &mut self.sources {
            let anchor = match source.kind() {
                SourceKind::File => root.as_deref(),
                SourceKind::Buffer | SourceKind::Bookmark => None,
            };
            source.open(anchor).await?;
        }

        self.watch_git_root();
        self.bind_concerns();
        self.refresh_concerns().await;
        if self.watcher.is_none() {
            self.watcher =
                Some(spawn_watcher(&self.services.bus, self.outlet.clone()));
        }
        self.flush();

        if let Some(path) = context.reveal {
            self.reveal(&path).await?;
        }
        Ok(())
    }

    fn watch_git_root(&mut self) {
        let root = self
            .source(SourceKind::File)
            .and_then(Source::root_path)
            .map(Path::to_path_buf);
        if let Some(previous) = self.watched_root.take() {
            self.git.concern().unwatch_root(&previous);
        }
        if let Some(root) = &root {
            self.git.concern().watch_root(root);
        }
        self.watched_root = root;
    }

    fn bind_concerns(&mut self) {
        self.guards.clear();
        for source in &self.sources {
            for concern in source.concerns() {
                let guard = match concern {
                    ConcernKind::Git => self.git.bind(source.kind()),
                    ConcernKind::Diagnostics => {
                        self.diagnostics.bind(source.kind())
                    },
                    ConcernKind::BufferModified => {
                        self.modified.bind(source.kind())
                    },
                };
                self.guards.push(guard);
            }
        }
    }

    /// Fill the status cache once so the first frame shows statuses.
    async fn refresh_concerns(&self) {
        let mut refreshes = Vec::new();
        if self.git.is_subscribed() {
            refreshes.push(self.git.concern().refresh());
        }
        if self.diagnostics.is_subscribed() {
            refreshes.push(self.diagnostics.concern().refresh());
        }
        if self.modified.is_subscribed() {
            refreshes.push(self.modified.concern().refresh());
        }
        for refresh in refreshes {
            if let Err(err) = refresh.await {
                log::warn!("initial status refresh failed: {err}");
            }
        }
    }

    /// Run one action, then flush.
    ///
    /// Targets that no longer exist are ignored. Failed actions leave the
    /// tree consistent; whatever changed before the failure is still
    /// drawn.
    pub async fn dispatch(
        &mut self,
        action: Action,
    ) -> Result<Vec<ExplorerEffect>> {
        log::debug!("dispatching {}", action.name());
        let effects = self.perform(action).await;
        self.flush();
        effects
    }

    async fn perform(&mut self, action: Action) -> Result<Vec<ExplorerEffect>> {
        match action {
            Action::Expand { target, options } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    let options =
                        options.unwrap_or_else(|| source.expand_defaults());
                    source.expand(&uid, options).await?;
                }
            },
            Action::Collapse { target, options } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    source.collapse(&uid, options);
                }
            },
            Action::ExpandOrCollapse { target } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    source.expand_or_collapse(&uid).await?;
                }
            },
            Action::Compact { target } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    let options = ExpandOptions {
                        compact: true,
                        uncompact: false,
                        ..source.expand_defaults()
                    };
                    source.expand(&uid, options).await?;
                }
            },
            Action::Uncompact { target } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    source.uncompact(&uid);
                }
            },
            Action::Select { target } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    source.select(&uid);
                }
            },
            Action::Unselect { target } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    source.unselect(&uid);
                }
            },
            Action::ToggleSelection { target } => {
                if let Some((source, uid)) = self.target_source(&target) {
                    source.toggle_selection(&uid);
                }
            },
            Action::ClearSelection => {
                self.sources.iter_mut().for_each(Source::clear_selection);
            },
            Action::Reload { target } => {
                if let Some((index, uid)) = self.resolve_target(&target) {
                    self.reload(index, Some(uid)).await?;
                }
            },
            Action::Open { target, strategy } => {
                return self.open_node(&target, strategy).await;
            },
            Action::Delete { target } => return self.delete(&target).await,
            Action::Rename { target, to } => {
                return self.rename(&target, to).await;
            },
            Action::Copy { target } => {
                self.store_clipboard(&target, ClipboardMode::Copy)?;
            },
            Action::Cut { target } => {
                self.store_clipboard(&target, ClipboardMode::Cut)?;
            },
            Action::Paste { target } => return self.paste(&target).await,
            Action::ToggleHidden => self.toggle_hidden().await?,
            Action::GotoNext(kind) => {
                self.goto_next(kind);
            },
            Action::GotoPrev(kind) => {
                self.goto_prev(kind);
            },
            Action::NodeNext => {
                self.node_next();
            },
            Action::NodePrev => {
                self.node_prev();
            },
            Action::GotoSource(kind) => {
                self.goto_source_line(kind, 0);
            },
            Action::Reveal(path) => {
                self.reveal(&path).await?;
            },
        }
        Ok(Vec::new())
    }

    /// Source index and uid a target refers to right now.
    fn resolve_target(&self, target: &Target) -> Option<(usize, NodeUid)> {
        match target {
            Target::Cursor => self.cursor_row(),
            Target::Node { source, uid } => {
                let index = self.source_index(*source)?;
                if !self.sources[index].tree().contains(uid) {
                    log::debug!("stale target {uid} ignored");
                    return None;
                }
                Some((index, uid.clone()))
            },
        }
    }

    fn target_source(&mut self, target: &Target) -> Option<(&mut Source, NodeUid)> {
        let (index, uid) = self.resolve_target(target)?;
        Some((self.sources.get_mut(index)?, uid))
    }

    async fn open_node(
        &mut self,
        target: &Target,
        strategy: OpenStrategy,
    ) -> Result<Vec<ExplorerEffect>> {
        let Some((source, uid)) = self.target_source(target) else {
            return Ok(Vec::new());
        };
        let Some(node) = source.tree().get(source.resolve(&uid)) else {
            return Ok(Vec::new());
        };
        let effect = match node.payload() {
            Payload::Root(_) => {
                return Err(ExplorerError::invalid_action(
                    "the root row cannot be opened",
                ));
            },
            Payload::File(file) if file.is_dir => None,
            Payload::BookmarkFile(_) => None,
            Payload::File(file) => Some(ExplorerEffect::OpenFile {
                path: file.path.clone(),
                line: None,
                strategy,
            }),
            Payload::Buffer(buffer) => Some(ExplorerEffect::OpenBuffer {
                bufnr: buffer.bufnr,
                strategy,
            }),
            Payload::Bookmark(bookmark) => Some(ExplorerEffect::OpenFile {
                path: bookmark.path.clone(),
                line: Some(bookmark.line),
                strategy,
            }),
        };
        match effect {
            Some(effect) => Ok(vec![effect]),
            None => {
                source.expand_or_collapse(&uid).await?;
                Ok(Vec::new())
            },
        }
    }

    /// Paths a file operation on `uid` applies to: the selection of the
    /// file source, or the node itself when nothing is selected.
    fn file_paths(&self, index: usize, uid: &NodeUid) -> Result<Vec<PathBuf>> {
        let source = &self.sources[index];
        if source.kind() != SourceKind::File {
            return Err(ExplorerError::invalid_action(format!(
                "file operations do not apply to the {} source",
                source.kind()
            )));
        }
        let mut uids: Vec<&NodeUid> = source
            .selected()
            .filter(|selected| source.tree().contains(selected))
            .collect();
        if uids.is_empty() {
            uids.push(uid);
        }
        let mut paths: Vec<PathBuf> = uids
            .into_iter()
            .filter_map(|uid| file_path(source, uid))
            .collect();
        paths.sort();
        paths.dedup();
        if paths.is_empty() {
            return Err(ExplorerError::invalid_action(
                "no file or directory to operate on",
            ));
        }
        Ok(paths)
    }

    async fn delete(&mut self, target: &Target) -> Result<Vec<ExplorerEffect>> {
        let Some((index, uid)) = self.resolve_target(target) else {
            return Ok(Vec::new());
        };
        let paths = self.file_paths(index, &uid)?;
        let outermost: Vec<PathBuf> = paths
            .iter()
            .filter(|path| {
                !paths
                    .iter()
                    .any(|other| other != *path && path.starts_with(other))
            })
            .cloned()
            .collect();

        let mut deleted = Vec::with_capacity(outermost.len());
        let mut failure = None;
        for path in outermost {
            match self.fs.remove(&path).await {
                Ok(()) => deleted.push(path),
                Err(err) => {
                    log::warn!("failed to delete {}: {err}", path.display());
                    failure.get_or_insert(ExplorerError::Io(err));
                },
            }
        }

        self.sources[index].clear_selection();
        let dirs = deleted
            .iter()
            .filter_map(|path| path.parent())
            .map(Path::to_path_buf)
            .collect();
        self.reload_dirs(index, dirs).await?;
        match failure {
            Some(err) => Err(err),
            None => Ok(vec![ExplorerEffect::Deleted { paths: deleted }]),
        }
    }

    async fn rename(
        &mut self,
        target: &Target,
        to: PathBuf,
    ) -> Result<Vec<ExplorerEffect>> {
        let Some((index, uid)) = self.resolve_target(target) else {
            return Ok(Vec::new());
        };
        let from = file_path(&self.sources[index], &uid).ok_or_else(|| {
            ExplorerError::invalid_action("only files and directories can be renamed")
        })?;
        if self.fs.exists(&to).await {
            return Err(ExplorerError::invalid_action(format!(
                "{} already exists",
                to.display()
            )));
        }
        self.fs.rename(&from, &to).await?;

        let dirs = [from.parent(), to.parent()]
            .into_iter()
            .flatten()
            .map(Path::to_path_buf)
            .collect();
        self.reload_dirs(index, dirs).await?;
        Ok(vec![ExplorerEffect::Renamed { from, to }])
    }

    fn store_clipboard(&mut self, target: &Target, mode: ClipboardMode) -> Result<()> {
        let Some((index, uid)) = self.resolve_target(target) else {
            return Ok(());
        };
        let paths = self.file_paths(index, &uid)?;
        log::debug!("{mode:?} {} paths to the clipboard", paths.len());
        self.clipboard.save(&ClipboardState { mode, paths })?;
        self.sources[index].clear_selection();
        Ok(())
    }

    async fn paste(&mut self, target: &Target) -> Result<Vec<ExplorerEffect>> {
        let Some((index, uid)) = self.resolve_target(target) else {
            return Ok(Vec::new());
        };
        let dir = paste_dir(&self.sources[index], &uid).ok_or_else(|| {
            ExplorerError::invalid_action("paste needs a directory of the file source")
        })?;
        let Some(state) = self.clipboard.load() else {
            return Err(ExplorerError::invalid_action("the clipboard is empty"));
        };

        let mut pasted = Vec::with_capacity(state.paths.len());
        for path in &state.paths {
            let Some(name) = path.file_name() else {
                continue;
            };
            if dir.starts_with(path) {
                return Err(ExplorerError::invalid_action(format!(
                    "cannot paste {} into itself",
                    path.display()
                )));
            }
            let destination = unique_destination(self.fs.as_ref(), &dir, name).await;
            match state.mode {
                ClipboardMode::Copy => self.fs.copy(path, &destination).await?,
                ClipboardMode::Cut => self.fs.rename(path, &destination).await?,
            }
            pasted.push(destination);
        }

        let mut dirs = BTreeSet::from([dir]);
        if state.mode == ClipboardMode::Cut {
            self.clipboard.clear();
            dirs.extend(
                state
                    .paths
                    .iter()
                    .filter_map(|path| path.parent())
                    .map(Path::to_path_buf),
            );
        }
        self.reload_dirs(index, dirs).await?;
        Ok(vec![ExplorerEffect::Pasted { paths: pasted }])
    }

    async fn toggle_hidden(&mut self) -> Result<()> {
        self.show_hidden = !self.show_hidden;
        for index in 0..self.sources.len() {
            if self.sources[index].kind() != SourceKind::File {
                continue;
            }
            self.sources[index].set_show_hidden(self.show_hidden);
            self.reload(index, None).await?;
        }
        Ok(())
    }

    /// Reload every node showing one of `dirs`.
    async fn reload_dirs(&mut self, index: usize, dirs: BTreeSet<PathBuf>) -> Result<()> {
        for dir in dirs {
            let uids = self.sources[index].uids_for_path(&dir).to_vec();
            for uid in uids {
                self.reload(index, Some(uid)).await?;
            }
        }
        Ok(())
    }

    /// Reload `target` (the root when `None`) of source `index`.
    ///
    /// A reload slower than the configured timeout keeps running in the
    /// background; its result arrives as [`ExplorerEvent::LoadFinished`]
    /// and is dropped if the root changed meanwhile.
    async fn reload(&mut self, index: usize, target: Option<NodeUid>) -> Result<()> {
        let Some(source) = self.sources.get(index) else {
            return Ok(());
        };
        let kind = source.kind();
        let Some(LoadJob {
            uid,
            generation,
            future,
        }) = source.reload_job(target.as_ref())
        else {
            return Ok(());
        };

        match race_timeout(future, self.config.reload_timeout()).await {
            Raced::Completed(result) => {
                self.sources[index].apply_load(generation, &uid, result, false)?;
            },
            Raced::TimedOut(handle) => {
                log::debug!("reload of {uid} outlived the timeout, finishing in background");
                let outlet = self.outlet.clone();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(result) => {
                            let event = ExplorerEvent::LoadFinished {
                                source: kind,
                                generation,
                                uid,
                                result,
                            };
                            if outlet.send(event).is_err() {
                                log::debug!("late reload dropped: explorer gone");
                            }
                        },
                        Err(err) => {
                            log::warn!("background reload did not finish: {err}");
                        },
                    }
                });
            },
            Raced::Aborted => {},
        }
        Ok(())
    }

    /// Reload a whole source and flush.
    pub async fn reload_source(&mut self, kind: SourceKind) -> Result<()> {
        if let Some(index) = self.source_index(kind) {
            self.reload(index, None).await?;
        }
        self.flush();
        Ok(())
    }

    /// Apply one background event. Call [`Explorer::flush`] afterwards.
    pub async fn handle_event(&mut self, event: ExplorerEvent) -> Result<()> {
        match event {
            ExplorerEvent::Redraw { concern, changes } => {
                for source in &mut self.sources {
                    if !source.concerns().contains(&concern) {
                        continue;
                    }
                    source.redraw_paths(&changes.paths);
                    source.redraw_buffers(changes.bufnrs.iter().copied());
                }
            },
            ExplorerEvent::LoadFinished {
                source,
                generation,
                uid,
                result,
            } => {
                if let Some(index) = self.source_index(source) {
                    self.sources[index].apply_load(generation, &uid, result, false)?;
                }
            },
            ExplorerEvent::BuffersChanged => {
                if let Some(index) = self.source_index(SourceKind::Buffer) {
                    self.reload(index, None).await?;
                }
            },
            ExplorerEvent::PathChanged { path } => {
                if let Some(index) = self.source_index(SourceKind::File) {
                    self.reload_changed_path(index, &path).await?;
                }
            },
        }
        Ok(())
    }

    /// Reload the innermost loaded node at or above `path`.
    async fn reload_changed_path(&mut self, index: usize, path: &Path) -> Result<()> {
        let mut candidate = Some(path);
        while let Some(path) = candidate {
            let source = &self.sources[index];
            let uids: Vec<NodeUid> = source
                .uids_for_path(path)
                .iter()
                .filter(|uid| {
                    source
                        .tree()
                        .get(uid)
                        .is_some_and(|node| !node.is_expandable() || node.is_loaded())
                })
                .cloned()
                .collect();
            if !uids.is_empty() {
                for uid in uids {
                    self.reload(index, Some(uid)).await?;
                }
                return Ok(());
            }
            candidate = path.parent();
        }
        Ok(())
    }

    /// Handle every queued background event, then flush once.
    ///
    /// Failures are logged; returns how many events were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            handled += 1;
            if let Err(err) = self.handle_event(event).await {
                log::warn!("explorer event failed: {err}");
            }
        }
        self.flush();
        handled
    }

    /// Wait for the next background event, then handle it together with
    /// everything queued behind it.
    pub async fn process_next(&mut self) -> Result<usize> {
        let event = self
            .inbox
            .recv_async()
            .await
            .map_err(|_| ExplorerError::ChannelClosed)?;
        if let Err(err) = self.handle_event(event).await {
            log::warn!("explorer event failed: {err}");
        }
        Ok(1 + self.process_pending().await)
    }

    /// Render every damaged source and apply the patches in one batch.
    ///
    /// Patches are applied bottom-up with the region offsets they were
    /// computed against. The cursor follows the node it was on.
    pub fn flush(&mut self) {
        let anchor = self.cursor_row();
        let mut base = 0;
        let mut patches = Vec::new();
        for source in &mut self.sources {
            let lines = source.line_count();
            let patch = source.render();
            if !patch.is_empty() {
                patches.push((base, patch));
            }
            base += lines;
        }
        if patches.is_empty() {
            return;
        }

        self.host.begin_batch();
        for (base, patch) in patches.iter().rev() {
            apply_patch(&mut self.host, *base, patch);
        }
        self.host.end_batch();
        self.restore_cursor(anchor);
    }

    fn restore_cursor(&mut self, anchor: Option<(usize, NodeUid)>) {
        let line = anchor.and_then(|(index, uid)| {
            let line = self.sources.get(index)?.line_of(&uid)?;
            Some(self.base_of(index) + line)
        });
        let line = line.or_else(|| {
            clamp_index(self.host.cursor_line() as isize, self.total_lines())
        });
        if let Some(line) = line {
            self.host.set_cursor_line(line);
        }
    }

    /// Number of lines drawn by all sources.
    pub fn total_lines(&self) -> usize {
        self.sources.iter().map(Source::line_count).sum()
    }

    fn base_of(&self, index: usize) -> usize {
        self.sources[..index].iter().map(Source::line_count).sum()
    }

    /// Source index and line within it of buffer line `line`.
    fn locate(&self, line: usize) -> Option<(usize, usize)> {
        let mut base = 0;
        for (index, source) in self.sources.iter().enumerate() {
            let count = source.line_count();
            if line < base + count {
                return Some((index, line - base));
            }
            base += count;
        }
        None
    }

    fn cursor_row(&self) -> Option<(usize, NodeUid)> {
        let (index, line) = self.locate(self.host.cursor_line())?;
        let uid = self.sources[index].row_at(line)?.clone();
        Some((index, uid))
    }

    /// Source and uid of the row under the cursor.
    pub fn cursor_node(&self) -> Option<(SourceKind, NodeUid)> {
        self.cursor_row()
            .map(|(index, uid)| (self.sources[index].kind(), uid))
    }

    /// Move the cursor to buffer line `line`, clamped into the buffer.
    pub fn goto_line(&mut self, line: isize) -> Option<usize> {
        let line = clamp_index(line, self.total_lines())?;
        self.host.set_cursor_line(line);
        Some(line)
    }

    /// Move the cursor to line `line` of source `kind`.
    ///
    /// Out of range lines continue into the adjacent source when wrap
    /// scan is on (past the end onto the next source's first line, before
    /// the start onto the previous source's last line) and are ignored
    /// otherwise.
    pub fn goto_source_line(&mut self, kind: SourceKind, line: isize) -> Option<usize> {
        let index = self.source_index(kind)?;
        let count = self.sources[index].line_count();
        let target = if line >= 0 && (line as usize) < count {
            Some(self.base_of(index) + line as usize)
        } else if !self.config.wrap_scan {
            None
        } else {
            self.adjacent_source_line(index, line >= 0)
        };
        if let Some(target) = target {
            self.host.set_cursor_line(target);
        }
        target
    }

    fn adjacent_source_line(&self, index: usize, forward: bool) -> Option<usize> {
        let len = self.sources.len();
        (1..=len)
            .map(|step| {
                if forward {
                    (index + step) % len
                } else {
                    (index + len - step % len) % len
                }
            })
            .find(|next| self.sources[*next].line_count() > 0)
            .map(|next| {
                let base = self.base_of(next);
                if forward {
                    base
                } else {
                    base + self.sources[next].line_count() - 1
                }
            })
    }

    /// Move the cursor onto the row of `uid`.
    pub fn goto_node(&mut self, kind: SourceKind, uid: &NodeUid) -> Option<usize> {
        let index = self.source_index(kind)?;
        let line = self.base_of(index) + self.sources[index].line_of(uid)?;
        self.host.set_cursor_line(line);
        Some(line)
    }

    fn has_mark(&self, kind: IndexKind, line: usize) -> bool {
        self.locate(line).is_some_and(|(index, line)| {
            self.sources[index].indexes().contains(kind, line)
        })
    }

    /// Move to the nearest following row marked `kind`, across sources.
    pub fn goto_next(&mut self, kind: IndexKind) -> Option<usize> {
        let found = scan_index_next_by(
            self.total_lines(),
            self.host.cursor_line(),
            self.config.wrap_scan,
            |line| self.has_mark(kind, line),
        )?;
        self.host.set_cursor_line(found);
        Some(found)
    }

    pub fn goto_prev(&mut self, kind: IndexKind) -> Option<usize> {
        let found = scan_index_prev_by(
            self.total_lines(),
            self.host.cursor_line(),
            self.config.wrap_scan,
            |line| self.has_mark(kind, line),
        )?;
        self.host.set_cursor_line(found);
        Some(found)
    }

    pub fn node_next(&mut self) -> Option<usize> {
        let found = scan_index_next_by(
            self.total_lines(),
            self.host.cursor_line(),
            self.config.wrap_scan,
            |_| true,
        )?;
        self.host.set_cursor_line(found);
        Some(found)
    }

    pub fn node_prev(&mut self) -> Option<usize> {
        let found = scan_index_prev_by(
            self.total_lines(),
            self.host.cursor_line(),
            self.config.wrap_scan,
            |_| true,
        )?;
        self.host.set_cursor_line(found);
        Some(found)
    }

    /// Expand the file source down to `path` and put the cursor on it.
    pub async fn reveal(&mut self, path: &Path) -> Result<Option<usize>> {
        let Some(index) = self.source_index(SourceKind::File) else {
            return Ok(None);
        };
        let Some(uid) = self.sources[index].reveal(path).await? else {
            log::debug!("{} is not below the file root", path.display());
            return Ok(None);
        };
        self.flush();
        Ok(self.goto_node(SourceKind::File, &uid))
    }
}

impl<H: BufferSink + CursorControl> Drop for Explorer<H> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Forward structural host events (buffer list, disk changes) to the
/// explorer's inbox.
fn spawn_watcher(bus: &EventBus, outlet: Sender<ExplorerEvent>) -> JoinHandle<()> {
    let subscription = bus.subscribe();
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let forwarded = match event {
                ExternalEvent::BufferListChanged => ExplorerEvent::BuffersChanged,
                ExternalEvent::FileSystemChanged { path } => {
                    ExplorerEvent::PathChanged { path }
                },
                _ => continue,
            };
            if outlet.send(forwarded).is_err() {
                break;
            }
        }
    })
}

/// Path of the file or directory shown on the row of `uid`.
fn file_path(source: &Source, uid: &NodeUid) -> Option<PathBuf> {
    let node = source.tree().get(source.resolve(uid))?;
    match node.payload() {
        Payload::File(file) => Some(file.path.clone()),
        _ => None,
    }
}

/// Directory a paste onto the row of `uid` lands in.
fn paste_dir(source: &Source, uid: &NodeUid) -> Option<PathBuf> {
    if source.kind() != SourceKind::File {
        return None;
    }
    let node = source.tree().get(source.resolve(uid))?;
    match node.payload() {
        Payload::Root(root) => root.path.clone(),
        Payload::File(file) if file.is_dir => Some(file.path.clone()),
        Payload::File(file) => file.path.parent().map(Path::to_path_buf),
        _ => None,
    }
}

/// `dir/name`, or `dir/stem_N.ext` with the first free `N`.
async fn unique_destination(fs: &dyn FileSystem, dir: &Path, name: &OsStr) -> PathBuf {
    let candidate = dir.join(name);
    if !fs.exists(&candidate).await {
        return candidate;
    }
    let name = Path::new(name);
    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = name
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default();
    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{extension}"));
        if !fs.exists(&candidate).await {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeFs, FakeHost, FakeWorld};

    fn config() -> ExplorerConfig {
        ExplorerConfig {
            sources: vec![SourceKind::File],
            root_strategies: vec![crate::config::RootStrategy::Cwd],
            auto_expand_options: Vec::new(),
            ..ExplorerConfig::default()
        }
    }

    async fn opened(world: &FakeWorld) -> Explorer<FakeHost> {
        let mut explorer = Explorer::new(
            FakeHost::new(),
            config(),
            world.collaborators(),
            Services::new(),
        )
        .expect("explorer");
        explorer
            .open(RootContext {
                cwd: Some(PathBuf::from("/r")),
                ..RootContext::default()
            })
            .await
            .expect("open");
        explorer
    }

    #[tokio::test]
    async fn given_copied_file_when_pasted_in_same_dir_then_name_is_unique() {
        let world = FakeWorld::new(FakeFs::new().with_file("/r/a.txt", 3));
        let mut explorer = opened(&world).await;
        let file = Target::node(SourceKind::File, FileProvider::uid(Path::new("/r/a.txt")));

        explorer
            .dispatch(Action::Copy { target: file.clone() })
            .await
            .expect("copy");
        let effects = explorer
            .dispatch(Action::Paste { target: file })
            .await
            .expect("paste");

        assert_eq!(effects, vec![ExplorerEffect::Pasted {
            paths: vec![PathBuf::from("/r/a_1.txt")],
        }]);
        assert!(world.fs.contains("/r/a_1.txt"));
        assert!(explorer.host().lines().iter().any(|line| line.contains("a_1.txt")));
    }

    #[tokio::test]
    async fn given_cursor_on_last_line_when_moving_forward_then_scan_wraps() {
        let world = FakeWorld::new(FakeFs::new().with_file("/r/a", 1).with_file("/r/b", 1));
        let mut explorer = opened(&world).await;
        explorer.goto_line(2);

        assert_eq!(explorer.node_next(), Some(0));
        assert_eq!(explorer.goto_line(99), Some(2));
        assert_eq!(explorer.goto_line(-4), Some(0));
    }

    #[tokio::test]
    async fn given_root_row_when_opened_then_action_is_rejected() {
        let world = FakeWorld::new(FakeFs::new().with_file("/r/a", 1));
        let mut explorer = opened(&world).await;
        explorer.goto_line(0);

        let result = explorer
            .dispatch(Action::Open {
                target: Target::Cursor,
                strategy: OpenStrategy::Select,
            })
            .await;

        assert!(matches!(result, Err(ExplorerError::InvalidAction { .. })));
        assert_eq!(explorer.host().lines().len(), 2);
    }
}
