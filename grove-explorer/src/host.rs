//! Collaborators the explorer talks to.
//!
//! Every asynchronous call returns an owned [`BoxFuture`] so loads can be
//! spawned or raced against a timeout without borrowing the explorer.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::diagnostics::Diagnostic;
use crate::errors::Result;
use crate::status::GitStatus;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One directory entry as reported by the file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub readonly: bool,
    pub executable: bool,
    pub size: Option<u64>,
}

/// Directory listing and file operations.
pub trait FileSystem: Send + Sync {
    /// List `path`. The outer error fails the whole listing; inner errors
    /// are entries that could not be described.
    fn read_dir(
        &self,
        path: &Path,
    ) -> BoxFuture<'static, io::Result<Vec<io::Result<DirEntryInfo>>>>;

    fn exists(&self, path: &Path) -> BoxFuture<'static, bool>;

    /// Remove a file, or a directory with everything below it.
    fn remove(&self, path: &Path) -> BoxFuture<'static, io::Result<()>>;

    fn rename(
        &self,
        from: &Path,
        to: &Path,
    ) -> BoxFuture<'static, io::Result<()>>;

    /// Copy a file, or a directory recursively.
    fn copy(&self, from: &Path, to: &Path)
    -> BoxFuture<'static, io::Result<()>>;
}

/// Version control status of the files below a repository root.
pub trait VcsStatusProvider: Send + Sync {
    /// Status of every reported file below `root`, keyed by absolute path.
    fn status(
        &self,
        root: &Path,
    ) -> BoxFuture<'static, Result<HashMap<PathBuf, GitStatus>>>;
}

pub trait DiagnosticProvider: Send + Sync {
    fn diagnostics(&self) -> BoxFuture<'static, Vec<Diagnostic>>;
}

/// Editor buffer as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub bufnr: u32,
    pub name: String,
    pub path: Option<PathBuf>,
    pub modified: bool,
    pub visible: bool,
    pub current: bool,
    pub listed: bool,
}

pub trait BufferList: Send + Sync {
    fn buffers(&self) -> BoxFuture<'static, Vec<BufferInfo>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub path: PathBuf,
    pub line: u32,
    pub annotation: Option<String>,
}

pub trait BookmarkStore: Send + Sync {
    fn bookmarks(&self) -> BoxFuture<'static, Vec<Bookmark>>;
}

/// Persistent key/value storage shared between explorers.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn remove(&self, key: &str);
}

/// Cursor of the window showing the explorer buffer.
pub trait CursorControl {
    /// Zero-based line under the cursor.
    fn cursor_line(&self) -> usize;

    fn set_cursor_line(&mut self, line: usize);
}
