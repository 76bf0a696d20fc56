//! In-memory collaborators for tests and headless hosts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use grove_render::{BufferSink, HighlightGroup, MemoryBuffer};

use crate::diagnostics::Diagnostic;
use crate::errors::{ExplorerError, Result};
use crate::explorer::Collaborators;
use crate::host::{
    Bookmark, BookmarkStore, BoxFuture, BufferInfo, BufferList, CursorControl,
    DiagnosticProvider, DirEntryInfo, FileSystem, StateStore,
    VcsStatusProvider,
};
use crate::status::GitStatus;
use crate::sync::lock;

#[derive(Debug, Clone, Copy)]
struct FakeEntry {
    is_dir: bool,
    size: u64,
}

/// File system kept in a sorted map of absolute paths.
#[derive(Debug, Default)]
pub struct FakeFs {
    entries: Mutex<BTreeMap<PathBuf, FakeEntry>>,
    broken: Mutex<HashSet<PathBuf>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    delay: Mutex<Option<Duration>>,
    listings: AtomicUsize,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path);
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>, size: u64) -> Self {
        self.add_file(path, size);
        self
    }

    /// Make the entry at `path` fail to describe while listing its parent.
    pub fn with_broken_entry(self, path: impl AsRef<Path>) -> Self {
        lock(&self.broken).insert(path.as_ref().to_path_buf());
        self
    }

    pub fn with_unreadable_dir(self, path: impl AsRef<Path>) -> Self {
        self.set_unreadable(path, true);
        self
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = lock(&self.entries);
        for dir in path.as_ref().ancestors() {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.insert(dir.to_path_buf(), FakeEntry {
                is_dir: true,
                size: 0,
            });
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, size: u64) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        lock(&self.entries).insert(path.to_path_buf(), FakeEntry {
            is_dir: false,
            size,
        });
    }

    pub fn set_unreadable(&self, path: impl AsRef<Path>, unreadable: bool) {
        let path = path.as_ref().to_path_buf();
        let mut paths = lock(&self.unreadable);
        if unreadable {
            paths.insert(path);
        } else {
            paths.remove(&path);
        }
    }

    /// Delay every listing by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    /// Number of `read_dir` calls so far.
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.entries).contains_key(path.as_ref())
    }

    fn list(&self, path: &Path) -> io::Result<Vec<io::Result<DirEntryInfo>>> {
        if lock(&self.unreadable).contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        let entries = lock(&self.entries);
        match entries.get(path) {
            Some(entry) if entry.is_dir => {},
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no such directory",
                ));
            },
        }

        let broken = lock(&self.broken);
        Ok(entries
            .iter()
            .filter(|(child, _)| child.parent() == Some(path))
            .map(|(child, entry)| {
                if broken.contains(child) {
                    return Err(io::Error::other("entry cannot be described"));
                }
                Ok(DirEntryInfo {
                    name: child
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    path: child.clone(),
                    is_dir: entry.is_dir,
                    is_symlink: false,
                    readonly: false,
                    executable: false,
                    size: (!entry.is_dir).then_some(entry.size),
                })
            })
            .collect())
    }

    fn subtree(&self, root: &Path) -> Vec<(PathBuf, FakeEntry)> {
        lock(&self.entries)
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .map(|(path, entry)| (path.clone(), *entry))
            .collect()
    }

    fn transfer(&self, from: &Path, to: &Path, keep_source: bool) -> io::Result<()> {
        let moved = self.subtree(from);
        if moved.is_empty() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such entry"));
        }
        if self.contains(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination exists",
            ));
        }
        let mut entries = lock(&self.entries);
        for (path, entry) in moved {
            if !keep_source {
                entries.remove(&path);
            }
            if let Ok(relative) = path.strip_prefix(from) {
                entries.insert(to.join(relative), entry);
            }
        }
        Ok(())
    }
}

impl FileSystem for FakeFs {
    fn read_dir(
        &self,
        path: &Path,
    ) -> BoxFuture<'static, io::Result<Vec<io::Result<DirEntryInfo>>>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let listing = self.list(path);
        let delay = *lock(&self.delay);
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            listing
        })
    }

    fn exists(&self, path: &Path) -> BoxFuture<'static, bool> {
        let exists = self.contains(path);
        Box::pin(async move { exists })
    }

    fn remove(&self, path: &Path) -> BoxFuture<'static, io::Result<()>> {
        let removed = self.subtree(path);
        let result = if removed.is_empty() {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such entry"))
        } else {
            let mut entries = lock(&self.entries);
            for (path, _) in removed {
                entries.remove(&path);
            }
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn rename(
        &self,
        from: &Path,
        to: &Path,
    ) -> BoxFuture<'static, io::Result<()>> {
        let result = self.transfer(from, to, false);
        Box::pin(async move { result })
    }

    fn copy(
        &self,
        from: &Path,
        to: &Path,
    ) -> BoxFuture<'static, io::Result<()>> {
        let result = self.transfer(from, to, true);
        Box::pin(async move { result })
    }
}

/// Version control statuses set by hand, per repository root.
#[derive(Debug, Default)]
pub struct FakeVcs {
    statuses: Mutex<HashMap<PathBuf, HashMap<PathBuf, GitStatus>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(
        &self,
        root: impl AsRef<Path>,
        path: impl AsRef<Path>,
        status: GitStatus,
    ) {
        lock(&self.statuses)
            .entry(root.as_ref().to_path_buf())
            .or_default()
            .insert(path.as_ref().to_path_buf(), status);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of status queries so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VcsStatusProvider for FakeVcs {
    fn status(
        &self,
        root: &Path,
    ) -> BoxFuture<'static, Result<HashMap<PathBuf, GitStatus>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(ExplorerError::Vcs(String::from("status unavailable")))
        } else {
            Ok(lock(&self.statuses).get(root).cloned().unwrap_or_default())
        };
        Box::pin(async move { result })
    }
}

#[derive(Debug, Default)]
pub struct FakeDiagnostics {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl FakeDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, diagnostics: Vec<Diagnostic>) {
        *lock(&self.diagnostics) = diagnostics;
    }
}

impl DiagnosticProvider for FakeDiagnostics {
    fn diagnostics(&self) -> BoxFuture<'static, Vec<Diagnostic>> {
        let diagnostics = lock(&self.diagnostics).clone();
        Box::pin(async move { diagnostics })
    }
}

#[derive(Debug, Default)]
pub struct FakeBuffers {
    buffers: Mutex<Vec<BufferInfo>>,
}

impl FakeBuffers {
    pub fn new(buffers: Vec<BufferInfo>) -> Self {
        Self {
            buffers: Mutex::new(buffers),
        }
    }

    pub fn set(&self, buffers: Vec<BufferInfo>) {
        *lock(&self.buffers) = buffers;
    }

    /// Edit the buffer numbered `bufnr`, if listed.
    pub fn update(&self, bufnr: u32, edit: impl FnOnce(&mut BufferInfo)) {
        if let Some(buffer) = lock(&self.buffers)
            .iter_mut()
            .find(|buffer| buffer.bufnr == bufnr)
        {
            edit(buffer);
        }
    }
}

impl BufferList for FakeBuffers {
    fn buffers(&self) -> BoxFuture<'static, Vec<BufferInfo>> {
        let buffers = lock(&self.buffers).clone();
        Box::pin(async move { buffers })
    }
}

#[derive(Debug, Default)]
pub struct FakeBookmarks {
    bookmarks: Mutex<Vec<Bookmark>>,
}

impl FakeBookmarks {
    pub fn new(bookmarks: Vec<Bookmark>) -> Self {
        Self {
            bookmarks: Mutex::new(bookmarks),
        }
    }

    pub fn set(&self, bookmarks: Vec<Bookmark>) {
        *lock(&self.bookmarks) = bookmarks;
    }
}

impl BookmarkStore for FakeBookmarks {
    fn bookmarks(&self) -> BoxFuture<'static, Vec<Bookmark>> {
        let bookmarks = lock(&self.bookmarks).clone();
        Box::pin(async move { bookmarks })
    }
}

#[derive(Debug, Default)]
pub struct MemoryState {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryState {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        lock(&self.values).insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        lock(&self.values).remove(key);
    }
}

/// Every fake collaborator, kept reachable after the explorer takes its
/// trait objects.
#[derive(Debug, Clone, Default)]
pub struct FakeWorld {
    pub fs: Arc<FakeFs>,
    pub vcs: Arc<FakeVcs>,
    pub diagnostics: Arc<FakeDiagnostics>,
    pub buffers: Arc<FakeBuffers>,
    pub bookmarks: Arc<FakeBookmarks>,
    pub state: Arc<MemoryState>,
}

impl FakeWorld {
    pub fn new(fs: FakeFs) -> Self {
        Self {
            fs: Arc::new(fs),
            ..Self::default()
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fs: self.fs.clone(),
            vcs: self.vcs.clone(),
            diagnostics: self.diagnostics.clone(),
            buffers: self.buffers.clone(),
            bookmarks: self.bookmarks.clone(),
            state: self.state.clone(),
        }
    }
}

/// Host window backed by a [`MemoryBuffer`] with a line cursor.
#[derive(Debug, Default)]
pub struct FakeHost {
    buffer: MemoryBuffer,
    cursor: usize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &MemoryBuffer {
        &self.buffer
    }

    pub fn lines(&self) -> &[String] {
        self.buffer.lines()
    }

    /// Text under the cursor.
    pub fn current_line(&self) -> Option<&str> {
        self.lines().get(self.cursor).map(String::as_str)
    }
}

impl BufferSink for FakeHost {
    fn begin_batch(&mut self) {
        self.buffer.begin_batch();
    }

    fn end_batch(&mut self) {
        self.buffer.end_batch();
    }

    fn replace_lines(&mut self, start: usize, end: usize, lines: Vec<String>) {
        self.buffer.replace_lines(start, end, lines);
    }

    fn set_highlight(
        &mut self,
        line: usize,
        col_start: usize,
        col_end: usize,
        group: &HighlightGroup,
    ) {
        self.buffer.set_highlight(line, col_start, col_end, group);
    }

    fn clear_highlights(&mut self, lines: Range<usize>) {
        self.buffer.clear_highlights(lines);
    }
}

impl CursorControl for FakeHost {
    fn cursor_line(&self) -> usize {
        self.cursor
    }

    fn set_cursor_line(&mut self, line: usize) {
        self.cursor = line;
    }
}
