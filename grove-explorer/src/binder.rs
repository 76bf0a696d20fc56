//! Keeps status caches fresh in response to host change events.
//!
//! A [`Binder`] subscribes to the [`EventBus`] while at least one source
//! is bound to it. Matching events are debounced; the trailing call
//! refreshes the concern's statuses in the shared [`StatusCache`] and asks
//! the explorer to redraw the rows whose status changed.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use flume::Sender;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::cache::{ModifiedSnapshot, StatusCache};
use crate::diagnostics::DiagnosticSnapshot;
use crate::errors::Result;
use crate::event::{ChangeSet, ConcernKind, ExplorerEvent, ExternalEvent};
use crate::host::{BoxFuture, BufferList, DiagnosticProvider, VcsStatusProvider};
use crate::model::SourceKind;
use crate::status::GitSnapshot;
use crate::sync::lock;
use crate::task::{Debouncer, Outcome};

/// One kind of status a binder maintains.
pub trait Concern: Send + Sync + 'static {
    fn kind(&self) -> ConcernKind;

    /// Debounce delay between the last matching event and the refresh.
    fn delay(&self) -> Duration;

    fn is_interested(&self, event: &ExternalEvent) -> bool;

    /// Recompute the statuses, store them in the cache and report which
    /// paths or buffers changed.
    fn refresh(&self) -> BoxFuture<'static, Result<ChangeSet>>;
}

/// Git status of every watched repository root.
pub struct GitConcern {
    vcs: Arc<dyn VcsStatusProvider>,
    cache: Arc<StatusCache>,
    roots: Arc<Mutex<BTreeSet<PathBuf>>>,
    delay: Duration,
}

impl GitConcern {
    pub fn new(
        vcs: Arc<dyn VcsStatusProvider>,
        cache: Arc<StatusCache>,
        delay: Duration,
    ) -> Self {
        Self {
            vcs,
            cache,
            roots: Arc::default(),
            delay,
        }
    }

    /// Include the repository at `root` in future refreshes.
    pub fn watch_root(&self, root: &Path) {
        lock(&self.roots).insert(root.to_path_buf());
    }

    pub fn unwatch_root(&self, root: &Path) {
        lock(&self.roots).remove(root);
    }
}

impl Concern for GitConcern {
    fn kind(&self) -> ConcernKind {
        ConcernKind::Git
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn is_interested(&self, event: &ExternalEvent) -> bool {
        matches!(
            event,
            ExternalEvent::VcsChanged
                | ExternalEvent::BufferSaved { .. }
                | ExternalEvent::FileSystemChanged { .. }
        )
    }

    fn refresh(&self) -> BoxFuture<'static, Result<ChangeSet>> {
        let roots: Vec<PathBuf> = lock(&self.roots).iter().cloned().collect();
        let vcs = self.vcs.clone();
        let cache = self.cache.clone();
        Box::pin(async move {
            let mut changes = ChangeSet::default();
            for root in roots {
                let files = vcs.status(&root).await?;
                let snapshot = GitSnapshot::new(root.clone(), files);
                let previous = cache
                    .git(&root)
                    .unwrap_or_else(|| Arc::new(GitSnapshot::default()));
                changes.paths.extend(snapshot.changed_paths(&previous));
                cache.replace_git(snapshot);
            }
            Ok(changes)
        })
    }
}

/// Error and warning counts.
pub struct DiagnosticConcern {
    provider: Arc<dyn DiagnosticProvider>,
    cache: Arc<StatusCache>,
    delay: Duration,
}

impl DiagnosticConcern {
    pub fn new(
        provider: Arc<dyn DiagnosticProvider>,
        cache: Arc<StatusCache>,
        delay: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            delay,
        }
    }
}

impl Concern for DiagnosticConcern {
    fn kind(&self) -> ConcernKind {
        ConcernKind::Diagnostics
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn is_interested(&self, event: &ExternalEvent) -> bool {
        matches!(event, ExternalEvent::DiagnosticsChanged)
    }

    fn refresh(&self) -> BoxFuture<'static, Result<ChangeSet>> {
        let listing = self.provider.diagnostics();
        let cache = self.cache.clone();
        Box::pin(async move {
            let snapshot = DiagnosticSnapshot::new(listing.await);
            let paths = snapshot.changed_paths(&cache.diagnostics());
            cache.replace_diagnostics(snapshot);
            Ok(ChangeSet {
                paths,
                bufnrs: BTreeSet::new(),
            })
        })
    }
}

/// Unsaved-change markers of buffers and their files.
pub struct ModifiedConcern {
    buffers: Arc<dyn BufferList>,
    cache: Arc<StatusCache>,
    delay: Duration,
}

impl ModifiedConcern {
    pub fn new(
        buffers: Arc<dyn BufferList>,
        cache: Arc<StatusCache>,
        delay: Duration,
    ) -> Self {
        Self {
            buffers,
            cache,
            delay,
        }
    }
}

impl Concern for ModifiedConcern {
    fn kind(&self) -> ConcernKind {
        ConcernKind::BufferModified
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn is_interested(&self, event: &ExternalEvent) -> bool {
        matches!(
            event,
            ExternalEvent::BufferChanged { .. }
                | ExternalEvent::BufferSaved { .. }
                | ExternalEvent::BufferListChanged
        )
    }

    fn refresh(&self) -> BoxFuture<'static, Result<ChangeSet>> {
        let listing = self.buffers.buffers();
        let cache = self.cache.clone();
        Box::pin(async move {
            let snapshot = ModifiedSnapshot::new(
                listing
                    .await
                    .into_iter()
                    .filter(|buffer| buffer.modified)
                    .map(|buffer| (buffer.bufnr, buffer.path)),
            );
            let (paths, bufnrs) = snapshot.changes(&cache.modified());
            cache.replace_modified(snapshot);
            Ok(ChangeSet { paths, bufnrs })
        })
    }
}

struct BinderState {
    bound: HashMap<SourceKind, usize>,
    worker: Option<JoinHandle<()>>,
}

/// Reference-counted subscription of sources to one concern.
pub struct Binder<C: Concern> {
    concern: Arc<C>,
    bus: Arc<EventBus>,
    outlet: Sender<ExplorerEvent>,
    state: Mutex<BinderState>,
}

impl<C: Concern> Binder<C> {
    pub fn new(
        concern: C,
        bus: Arc<EventBus>,
        outlet: Sender<ExplorerEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            concern: Arc::new(concern),
            bus,
            outlet,
            state: Mutex::new(BinderState {
                bound: HashMap::new(),
                worker: None,
            }),
        })
    }

    pub fn concern(&self) -> &C {
        &self.concern
    }

    /// Bind `source`; the first binding subscribes to the bus.
    ///
    /// Must be called inside a tokio runtime. The binding lasts until the
    /// returned guard is dropped.
    pub fn bind(self: &Arc<Self>, source: SourceKind) -> BindGuard {
        let mut state = lock(&self.state);
        *state.bound.entry(source).or_default() += 1;
        if state.worker.is_none() {
            log::debug!("{:?} binder subscribed", self.concern.kind());
            state.worker = Some(self.spawn_worker());
        }
        let binder: Arc<dyn Unbind> = self.clone();
        BindGuard {
            binder: Arc::downgrade(&binder),
            source,
        }
    }

    pub fn bind_count(&self, source: SourceKind) -> usize {
        lock(&self.state).bound.get(&source).copied().unwrap_or(0)
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.state).worker.is_some()
    }

    fn spawn_worker(&self) -> JoinHandle<()> {
        let subscription = self.bus.subscribe();
        let concern = self.concern.clone();
        let outlet = self.outlet.clone();
        tokio::spawn(async move {
            let refresher = concern.clone();
            let debouncer = Debouncer::new(concern.delay(), move |()| {
                refresher.refresh()
            });
            while let Some(event) = subscription.recv().await {
                if !concern.is_interested(&event) {
                    continue;
                }
                let pending = debouncer.call(());
                let kind = concern.kind();
                let outlet = outlet.clone();
                tokio::spawn(async move {
                    match pending.await {
                        Outcome::Completed(Ok(changes)) => {
                            if changes.is_empty() {
                                return;
                            }
                            let event = ExplorerEvent::Redraw {
                                concern: kind,
                                changes,
                            };
                            if outlet.send(event).is_err() {
                                log::debug!("{kind:?} redraw dropped: explorer gone");
                            }
                        },
                        Outcome::Completed(Err(err)) => {
                            log::warn!("{kind:?} refresh failed: {err}");
                        },
                        Outcome::Cancelled => {},
                    }
                });
            }
        })
    }
}

trait Unbind: Send + Sync {
    fn unbind(&self, source: SourceKind);
}

impl<C: Concern> Unbind for Binder<C> {
    fn unbind(&self, source: SourceKind) {
        let mut state = lock(&self.state);
        let Some(count) = state.bound.get_mut(&source) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            state.bound.remove(&source);
        }
        if state.bound.is_empty() {
            if let Some(worker) = state.worker.take() {
                log::debug!("{:?} binder unsubscribed", self.concern.kind());
                worker.abort();
            }
        }
    }
}

/// Keeps a source bound to a [`Binder`] until dropped.
pub struct BindGuard {
    binder: Weak<dyn Unbind>,
    source: SourceKind,
}

impl BindGuard {
    pub fn source(&self) -> SourceKind {
        self.source
    }
}

impl Drop for BindGuard {
    fn drop(&mut self) {
        if let Some(binder) = self.binder.upgrade() {
            binder.unbind(self.source);
        }
    }
}

impl std::fmt::Debug for BindGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindGuard")
            .field("source", &self.source)
            .finish()
    }
}
