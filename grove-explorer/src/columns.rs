//! Row fragments of the explorer sources.

use std::path::Path;

use grove_render::{Align, Column, HighlightGroup, LineBuilder};
use grove_tree::{CompactState, ExpandStore, NodeUid};

use crate::cache::StatusView;
use crate::errors::{ExplorerError, Result};
use crate::event::ConcernKind;
use crate::model::{EntryFlags, ExplorerNode, ExplorerTree, Payload};
use crate::status::Aggregate;

/// Secondary line indexes rows can be recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    Selected,
    GitChanged,
    DiagnosticError,
    DiagnosticWarning,
    Modified,
}

/// Display settings shared by every column of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOptions {
    pub indent_guides: bool,
    /// Display width the filename is padded to, `0` to disable.
    pub name_width: usize,
    pub size_width: usize,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            indent_guides: true,
            name_width: 0,
            size_width: 6,
        }
    }
}

/// Everything a column may read while drawing one row.
pub struct DrawItem<'a> {
    pub node: &'a ExplorerNode,
    pub tree: &'a ExplorerTree,
    pub expand: &'a ExpandStore,
    pub selected: bool,
    pub status: &'a StatusView,
    pub options: &'a DrawOptions,
}

impl DrawItem<'_> {
    fn path(&self) -> Option<&Path> {
        self.node.payload().path()
    }

    fn is_expanded(&self) -> bool {
        self.expand.is_expanded(self.node.uid())
    }
}

pub type BoxedColumn = Box<dyn for<'a> Column<DrawItem<'a>, IndexKind>>;

/// Build the column registered under `name`.
pub fn build_column(name: &str) -> Result<BoxedColumn> {
    let column: BoxedColumn = match name {
        "selection" => Box::new(SelectionColumn),
        "indent" => Box::new(IndentColumn),
        "expandIcon" => Box::new(ExpandIconColumn),
        "root" => Box::new(RootColumn),
        "filename" => Box::new(FilenameColumn),
        "git" => Box::new(GitColumn),
        "diagnosticError" => Box::new(DiagnosticColumn {
            errors: true,
        }),
        "diagnosticWarning" => Box::new(DiagnosticColumn {
            errors: false,
        }),
        "modified" => Box::new(ModifiedColumn),
        "size" => Box::new(SizeColumn),
        "bufnr" => Box::new(BufnrColumn),
        "bufname" => Box::new(BufnameColumn),
        "bookmarkLine" => Box::new(BookmarkLineColumn),
        "annotation" => Box::new(AnnotationColumn),
        other => return Err(ExplorerError::UnknownColumn(other.to_string())),
    };
    Ok(column)
}

/// Status concern a column depends on, if any.
pub fn column_concern(name: &str) -> Option<ConcernKind> {
    match name {
        "git" => Some(ConcernKind::Git),
        "diagnosticError" | "diagnosticWarning" => {
            Some(ConcernKind::Diagnostics)
        },
        "modified" => Some(ConcernKind::BufferModified),
        _ => None,
    }
}

struct SelectionColumn;

impl Column<DrawItem<'_>, IndexKind> for SelectionColumn {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if item.selected {
            line.push_highlighted("✓", "GroveSelection");
            line.push(" ");
            line.mark(IndexKind::Selected);
        } else {
            line.push("  ");
        }
    }
}

/// Indentation, with a guide for every ancestor that has later siblings.
struct IndentColumn;

impl IndentColumn {
    /// Visible ancestors of the row from the outermost down, skipping the
    /// root. Hidden compaction members resolve to their head.
    fn ancestors<'a>(item: &DrawItem<'a>) -> Vec<&'a ExplorerNode> {
        let mut ancestors = Vec::new();
        let mut current = item.node.parent();
        while let Some(uid) = current {
            let uid: &NodeUid = item.expand.head_of(uid).unwrap_or(uid);
            let Some(node) = item.tree.get(uid) else {
                break;
            };
            if node.is_root() {
                break;
            }
            ancestors.push(node);
            current = node.parent();
        }
        ancestors.reverse();
        ancestors
    }
}

impl Column<DrawItem<'_>, IndexKind> for IndentColumn {
    fn name(&self) -> &'static str {
        "indent"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if !item.options.indent_guides {
            let depth = item.node.level().saturating_sub(1);
            line.push(&"  ".repeat(depth));
            return;
        }
        for ancestor in Self::ancestors(item) {
            if ancestor.is_last_sibling() {
                line.push("  ");
            } else {
                line.push_highlighted("│", "GroveIndentLine");
                line.push(" ");
            }
        }
    }
}

struct ExpandIconColumn;

impl Column<DrawItem<'_>, IndexKind> for ExpandIconColumn {
    fn name(&self) -> &'static str {
        "expandIcon"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if !item.node.is_expandable() {
            line.push("  ");
            return;
        }
        let icon = if item.is_expanded() { "▾" } else { "▸" };
        line.push_highlighted(icon, "GroveExpandIcon");
        line.push(" ");
    }
}

struct RootColumn;

impl Column<DrawItem<'_>, IndexKind> for RootColumn {
    fn name(&self) -> &'static str {
        "root"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if let Payload::Root(root) = item.node.payload() {
            line.separate();
            line.push_highlighted(&root.label, "GroveRoot");
            if let Some(path) = &root.path {
                line.push(" ");
                line.push_highlighted(
                    &path.display().to_string(),
                    "GroveRootPath",
                );
            }
        }
    }
}

/// Name of the row; a compacted row shows the whole chain joined by `/`.
struct FilenameColumn;

impl FilenameColumn {
    fn text(item: &DrawItem<'_>) -> String {
        let head = item.node.payload().label();
        if item.expand.compact_state(item.node.uid()) == CompactState::None {
            return head.to_string();
        }
        let mut names = vec![head];
        for member in item.expand.chain(item.node.uid()) {
            if let Some(node) = item.tree.get(member) {
                names.push(node.payload().label());
            }
        }
        names.join("/")
    }

    fn group(payload: &Payload) -> &'static str {
        match payload {
            Payload::File(file) if file.is_dir => "GroveDirectory",
            Payload::File(file) if file.flags.contains(EntryFlags::HIDDEN) => {
                "GroveHidden"
            },
            Payload::File(file) if file.flags.contains(EntryFlags::SYMLINK) => {
                "GroveSymlink"
            },
            Payload::File(file)
                if file.flags.contains(EntryFlags::EXECUTABLE) =>
            {
                "GroveExecutable"
            },
            Payload::File(_) => "GroveFilename",
            Payload::Root(_) => "GroveRoot",
            Payload::BookmarkFile(_) => "GroveBookmarkFile",
            Payload::Buffer(_) => "GroveBufname",
            Payload::Bookmark(_) => "GroveAnnotation",
        }
    }
}

impl Column<DrawItem<'_>, IndexKind> for FilenameColumn {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if matches!(item.node.payload(), Payload::Bookmark(_)) {
            return;
        }
        let text = Self::text(item);
        let group = HighlightGroup::new(Self::group(item.node.payload()));
        line.separate();
        if item.options.name_width > 0 {
            line.push_fitted(&text, item.options.name_width, Align::Left, Some(group));
        } else {
            line.push_highlighted(&text, group);
        }
    }
}

struct GitColumn;

impl Column<DrawItem<'_>, IndexKind> for GitColumn {
    fn name(&self) -> &'static str {
        "git"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        let status = item.path().and_then(|path| item.status.git_status(path));
        line.separate();
        match status {
            Some(Aggregate::Uniform(status)) if status.is_changed() => {
                line.push_highlighted(status.symbol(), status.highlight_group());
                line.mark(IndexKind::GitChanged);
            },
            Some(Aggregate::Mixed) => {
                line.push_highlighted("~", "GroveGitMixed");
                line.mark(IndexKind::GitChanged);
            },
            _ => line.push(" "),
        }
    }
}

/// Error or warning count of the row, summed over descendants.
struct DiagnosticColumn {
    errors: bool,
}

impl Column<DrawItem<'_>, IndexKind> for DiagnosticColumn {
    fn name(&self) -> &'static str {
        if self.errors {
            "diagnosticError"
        } else {
            "diagnosticWarning"
        }
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        let Some(path) = item.path() else {
            return;
        };
        let counts = item.status.diagnostics(path);
        let (count, group, mark) = if self.errors {
            (counts.errors, "GroveDiagnosticError", IndexKind::DiagnosticError)
        } else {
            (
                counts.warnings,
                "GroveDiagnosticWarning",
                IndexKind::DiagnosticWarning,
            )
        };
        if count == 0 {
            return;
        }
        let text = if count > 99 {
            String::from("99+")
        } else {
            count.to_string()
        };
        line.separate();
        line.push_highlighted(&text, group);
        line.mark(mark);
    }
}

struct ModifiedColumn;

impl Column<DrawItem<'_>, IndexKind> for ModifiedColumn {
    fn name(&self) -> &'static str {
        "modified"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        let modified = match item.node.payload() {
            Payload::Buffer(buffer) => {
                buffer.modified || item.status.is_buffer_modified(buffer.bufnr)
            },
            Payload::File(file) => item.status.is_path_modified(&file.path),
            _ => false,
        };
        if modified {
            line.separate();
            line.push_highlighted("+", "GroveModified");
            line.mark(IndexKind::Modified);
        }
    }
}

struct SizeColumn;

impl Column<DrawItem<'_>, IndexKind> for SizeColumn {
    fn name(&self) -> &'static str {
        "size"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        let Payload::File(file) = item.node.payload() else {
            return;
        };
        let text = file.size.map(human_size).unwrap_or_default();
        line.separate();
        line.push_fitted(
            &text,
            item.options.size_width,
            Align::Right,
            Some(HighlightGroup::new("GroveSize")),
        );
    }
}

/// Format a byte count with one decimal and a binary unit suffix.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}

struct BufnrColumn;

impl Column<DrawItem<'_>, IndexKind> for BufnrColumn {
    fn name(&self) -> &'static str {
        "bufnr"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if let Payload::Buffer(buffer) = item.node.payload() {
            line.separate();
            line.push_fitted(
                &buffer.bufnr.to_string(),
                3,
                Align::Right,
                Some(HighlightGroup::new("GroveBufnr")),
            );
        }
    }
}

struct BufnameColumn;

impl Column<DrawItem<'_>, IndexKind> for BufnameColumn {
    fn name(&self) -> &'static str {
        "bufname"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        let Payload::Buffer(buffer) = item.node.payload() else {
            return;
        };
        let group = if buffer.current {
            "GroveBufnameCurrent"
        } else if buffer.visible {
            "GroveBufnameVisible"
        } else {
            "GroveBufname"
        };
        line.separate();
        line.push_highlighted(&buffer.name, group);
    }
}

struct BookmarkLineColumn;

impl Column<DrawItem<'_>, IndexKind> for BookmarkLineColumn {
    fn name(&self) -> &'static str {
        "bookmarkLine"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if let Payload::Bookmark(bookmark) = item.node.payload() {
            line.separate();
            line.push_highlighted(
                &format!("line {}", bookmark.line),
                "GroveBookmarkLine",
            );
        }
    }
}

struct AnnotationColumn;

impl Column<DrawItem<'_>, IndexKind> for AnnotationColumn {
    fn name(&self) -> &'static str {
        "annotation"
    }

    fn draw(&self, item: &DrawItem<'_>, line: &mut LineBuilder<IndexKind>) {
        if let Payload::Bookmark(bookmark) = item.node.payload() {
            if let Some(annotation) = &bookmark.annotation {
                line.separate();
                line.push_highlighted(annotation, "GroveAnnotation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use grove_render::compose_line;
    use grove_tree::{Locator, NodeSeed, flatten};

    use super::*;
    use crate::model::{FileEntry, RootEntry};

    fn file(path: &str, is_dir: bool) -> NodeSeed<Payload> {
        let path = PathBuf::from(path);
        let payload = Payload::File(FileEntry {
            name: crate::sources::root_label(&path),
            path: path.clone(),
            is_dir,
            flags: EntryFlags::empty(),
            size: (!is_dir).then_some(2048),
        });
        let uid = NodeUid::from_path("file", &path);
        if is_dir {
            NodeSeed::branch(uid, payload)
        } else {
            NodeSeed::leaf(uid, payload)
        }
    }

    fn tree() -> ExplorerTree {
        let mut tree = ExplorerTree::new(
            NodeUid::from_path("file", Path::new("/r")),
            Payload::Root(RootEntry {
                label: String::from("r"),
                path: Some(PathBuf::from("/r")),
            }),
        );
        let root = tree.root_uid().clone();
        tree.set_children(&root, vec![file("/r/a", true), file("/r/z.rs", false)])
            .expect("root children");
        tree.set_children(
            &NodeUid::from_path("file", Path::new("/r/a")),
            vec![file("/r/a/b", true)],
        )
        .expect("a children");
        tree.set_children(
            &NodeUid::from_path("file", Path::new("/r/a/b")),
            vec![file("/r/a/b/c.rs", false)],
        )
        .expect("b children");
        tree
    }

    fn draw(
        tree: &mut ExplorerTree,
        expand: &ExpandStore,
        names: &[&str],
    ) -> Vec<String> {
        let locator = Locator::new(flatten(tree, expand));
        let tree: &ExplorerTree = tree;
        let columns: Vec<BoxedColumn> = names
            .iter()
            .map(|name| build_column(name).expect("known column"))
            .collect();
        let status = StatusView::default();
        let options = DrawOptions::default();
        locator
            .lines()
            .iter()
            .skip(1)
            .map(|uid| {
                let item = DrawItem {
                    node: tree.get(uid).expect("flattened node"),
                    tree,
                    expand,
                    selected: false,
                    status: &status,
                    options: &options,
                };
                compose_line(columns.iter().map(|column| &**column), &item)
                    .line
                    .text
            })
            .collect()
    }

    fn uid(path: &str) -> NodeUid {
        NodeUid::from_path("file", Path::new(path))
    }

    #[test]
    fn given_nested_rows_when_drawn_then_guides_follow_sibling_links() {
        let mut tree = tree();
        let mut expand = ExpandStore::default();
        expand.mark_expanded(&uid("/r/a"));
        expand.mark_expanded(&uid("/r/a/b"));

        let lines = draw(&mut tree, &expand, &["indent", "expandIcon", "filename"]);

        assert_eq!(lines, vec![
            "▾ a",
            "│ ▾ b",
            "│     c.rs",
            "  z.rs",
        ]);
    }

    #[test]
    fn given_compacted_chain_when_drawn_then_names_are_joined() {
        let mut tree = tree();
        let mut expand = ExpandStore::default();
        expand.mark_expanded(&uid("/r/a"));
        expand.mark_expanded(&uid("/r/a/b"));
        expand.compact(&uid("/r/a"), vec![uid("/r/a/b")]);

        let lines = draw(&mut tree, &expand, &["indent", "expandIcon", "filename"]);

        assert_eq!(lines, vec!["▾ a/b", "│   c.rs", "  z.rs"]);
    }

    #[test]
    fn given_unknown_name_when_built_then_column_is_rejected() {
        assert!(matches!(
            build_column("icons"),
            Err(ExplorerError::UnknownColumn(name)) if name == "icons"
        ));
        assert_eq!(column_concern("git"), Some(ConcernKind::Git));
        assert_eq!(column_concern("filename"), None);
    }

    #[test]
    fn given_byte_counts_when_formatted_then_units_scale() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(2048), "2.0K");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0M");
    }
}
