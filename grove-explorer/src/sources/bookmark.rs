use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_tree::{NodeSeed, NodeUid, normalize_path};

use crate::errors::Result;
use crate::host::{BookmarkStore, BoxFuture};
use crate::model::{
    BookmarkEntry, BookmarkFileEntry, NodeSnapshot, Payload, RootEntry, Seed,
    SourceKind,
};
use crate::provider::{LoadContext, NodeProvider};
use crate::sources::file::root_label;

const SCOPE: &str = "bookmark";

/// Groups bookmarks by file: root, then one row per file, then one row per
/// bookmarked line.
pub struct BookmarkProvider {
    store: Arc<dyn BookmarkStore>,
}

impl BookmarkProvider {
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self { store }
    }

    pub fn file_uid(path: &Path) -> NodeUid {
        NodeUid::from_path(SCOPE, path)
    }

    pub fn line_uid(path: &Path, line: u32) -> NodeUid {
        NodeUid::new(SCOPE, &format!("{}:{line}", normalize_path(path)))
    }

    fn root_uid() -> NodeUid {
        NodeUid::new(SCOPE, "")
    }
}

impl NodeProvider for BookmarkProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Bookmark
    }

    fn root(&self, _path: Option<&Path>) -> Seed {
        NodeSeed::branch(
            Self::root_uid(),
            Payload::Root(RootEntry {
                label: String::from("BOOKMARKS"),
                path: None,
            }),
        )
    }

    fn load_children(
        &self,
        parent: NodeSnapshot,
        _context: LoadContext,
    ) -> BoxFuture<'static, Result<Vec<Seed>>> {
        let listing = self.store.bookmarks();
        Box::pin(async move {
            let bookmarks = listing.await;
            let seeds = match parent.payload {
                Payload::Root(_) => {
                    let files: BTreeSet<PathBuf> = bookmarks
                        .into_iter()
                        .map(|bookmark| bookmark.path)
                        .collect();
                    files.into_iter().map(file_seed).collect()
                },
                Payload::BookmarkFile(file) => {
                    let mut lines: Vec<_> = bookmarks
                        .into_iter()
                        .filter(|bookmark| bookmark.path == file.path)
                        .collect();
                    lines.sort_by_key(|bookmark| bookmark.line);
                    lines.dedup_by_key(|bookmark| bookmark.line);
                    lines
                        .into_iter()
                        .map(|bookmark| {
                            NodeSeed::leaf(
                                BookmarkProvider::line_uid(
                                    &bookmark.path,
                                    bookmark.line,
                                ),
                                Payload::Bookmark(BookmarkEntry {
                                    path: bookmark.path,
                                    line: bookmark.line,
                                    annotation: bookmark.annotation,
                                }),
                            )
                        })
                        .collect()
                },
                _ => Vec::new(),
            };
            Ok(seeds)
        })
    }
}

fn file_seed(path: PathBuf) -> Seed {
    NodeSeed::branch(
        BookmarkProvider::file_uid(&path),
        Payload::BookmarkFile(BookmarkFileEntry {
            name: root_label(&path),
            path,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBookmarks;
    use crate::host::Bookmark;

    fn bookmark(path: &str, line: u32) -> Bookmark {
        Bookmark {
            path: PathBuf::from(path),
            line,
            annotation: None,
        }
    }

    #[tokio::test]
    async fn given_bookmarks_when_loaded_then_lines_group_under_files() {
        let store = FakeBookmarks::new(vec![
            bookmark("/r/b.rs", 30),
            bookmark("/r/a.rs", 4),
            bookmark("/r/b.rs", 2),
        ]);
        let provider = BookmarkProvider::new(Arc::new(store));
        let root = provider.root(None);

        let files = provider
            .load_children(NodeSnapshot::from(&root), LoadContext::default())
            .await
            .expect("root should load");
        let lines = provider
            .load_children(NodeSnapshot::from(&files[1]), LoadContext::default())
            .await
            .expect("file should load");

        let names: Vec<&str> =
            files.iter().map(|seed| seed.payload.label()).collect();
        assert_eq!(names, vec!["a.rs", "b.rs"]);
        let uids: Vec<&NodeUid> = lines.iter().map(|seed| &seed.uid).collect();
        assert_eq!(uids, vec![
            &BookmarkProvider::line_uid(Path::new("/r/b.rs"), 2),
            &BookmarkProvider::line_uid(Path::new("/r/b.rs"), 30),
        ]);
    }
}
