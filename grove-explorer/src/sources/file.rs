use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_tree::{NodeSeed, NodeUid, compare_entries};

use crate::errors::{ExplorerError, Result};
use crate::host::{BoxFuture, DirEntryInfo, FileSystem};
use crate::model::{
    EntryFlags, FileEntry, NodeSnapshot, Payload, RootEntry, Seed, SourceKind,
};
use crate::provider::{LoadContext, NodeProvider};

const SCOPE: &str = "file";

/// Lists directories through a [`FileSystem`].
pub struct FileProvider {
    fs: Arc<dyn FileSystem>,
}

impl FileProvider {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Uid of the node showing `path`.
    pub fn uid(path: &Path) -> NodeUid {
        NodeUid::from_path(SCOPE, path)
    }
}

impl NodeProvider for FileProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn root(&self, path: Option<&Path>) -> Seed {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
        NodeSeed::branch(
            Self::uid(&path),
            Payload::Root(RootEntry {
                label: root_label(&path),
                path: Some(path),
            }),
        )
    }

    fn load_children(
        &self,
        parent: NodeSnapshot,
        context: LoadContext,
    ) -> BoxFuture<'static, Result<Vec<Seed>>> {
        let listing = parent
            .payload
            .path()
            .map(|path| (path.to_path_buf(), self.fs.read_dir(path)));
        Box::pin(async move {
            let Some((directory, listing)) = listing else {
                return Ok(Vec::new());
            };
            let entries = listing.await.map_err(|err| ExplorerError::Load {
                path: directory.display().to_string(),
                message: err.to_string(),
            })?;

            let mut files = Vec::with_capacity(entries.len());
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        log::warn!(
                            "explorer skipped entry in {}: {err}",
                            directory.display()
                        );
                        continue;
                    },
                };
                let file = file_entry(entry);
                if file.flags.contains(EntryFlags::HIDDEN) && !context.show_hidden
                {
                    continue;
                }
                files.push(file);
            }

            files.sort_by(|left, right| {
                compare_entries(left.is_dir, &left.name, right.is_dir, &right.name)
            });
            Ok(files.into_iter().map(seed).collect())
        })
    }
}

fn file_entry(entry: DirEntryInfo) -> FileEntry {
    let mut flags = EntryFlags::empty();
    flags.set(EntryFlags::HIDDEN, entry.name.starts_with('.'));
    flags.set(EntryFlags::SYMLINK, entry.is_symlink);
    flags.set(EntryFlags::READONLY, entry.readonly);
    flags.set(EntryFlags::EXECUTABLE, entry.executable);
    FileEntry {
        name: entry.name,
        path: entry.path,
        is_dir: entry.is_dir,
        flags,
        size: entry.size,
    }
}

fn seed(file: FileEntry) -> Seed {
    let uid = FileProvider::uid(&file.path);
    if file.is_dir {
        NodeSeed::branch(uid, Payload::File(file))
    } else {
        NodeSeed::leaf(uid, Payload::File(file))
    }
}

/// Label shown on the root row of a file source.
pub fn root_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| path.display().to_string())
}
