use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use grove_tree::{CollapseOptions, ExpandOptions, NodeUid};
use serde::{Deserialize, Serialize};

use crate::columns::IndexKind;
use crate::errors::ExplorerError;
use crate::model::SourceKind;

/// Where a node action applies.
///
/// Explicit targets are resolved by uid when the action is dispatched, so a
/// target captured before a reload still finds the same node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The row under the cursor.
    Cursor,
    Node { source: SourceKind, uid: NodeUid },
}

impl Target {
    pub fn node(source: SourceKind, uid: NodeUid) -> Self {
        Self::Node { source, uid }
    }
}

/// Window a file or buffer is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenStrategy {
    /// Replace the explorer's previous window.
    Select,
    Split,
    Vsplit,
    Tab,
    PreviousBuffer,
    /// The window the explorer was opened from.
    SourceWindow,
}

impl OpenStrategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Split => "split",
            Self::Vsplit => "vsplit",
            Self::Tab => "tab",
            Self::PreviousBuffer => "previousBuffer",
            Self::SourceWindow => "sourceWindow",
        }
    }
}

impl fmt::Display for OpenStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpenStrategy {
    type Err = ExplorerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "select" => Ok(Self::Select),
            "split" => Ok(Self::Split),
            "vsplit" => Ok(Self::Vsplit),
            "tab" => Ok(Self::Tab),
            "previousBuffer" => Ok(Self::PreviousBuffer),
            "sourceWindow" => Ok(Self::SourceWindow),
            other => Err(ExplorerError::UnsupportedOpenStrategy(other.to_string())),
        }
    }
}

/// Every operation the explorer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Expand { target: Target, options: Option<ExpandOptions> },
    Collapse { target: Target, options: CollapseOptions },
    ExpandOrCollapse { target: Target },
    Compact { target: Target },
    Uncompact { target: Target },
    Select { target: Target },
    Unselect { target: Target },
    ToggleSelection { target: Target },
    ClearSelection,
    /// Reload the node, or the whole source when the target is its root.
    Reload { target: Target },
    Open { target: Target, strategy: OpenStrategy },
    /// Delete the selection, or the target when nothing is selected.
    Delete { target: Target },
    Rename { target: Target, to: PathBuf },
    Copy { target: Target },
    Cut { target: Target },
    /// Paste the clipboard into the target directory (or the directory of
    /// a file target).
    Paste { target: Target },
    ToggleHidden,
    GotoNext(IndexKind),
    GotoPrev(IndexKind),
    NodeNext,
    NodePrev,
    /// Move to the first line of `source`.
    GotoSource(SourceKind),
    Reveal(PathBuf),
}

impl Action {
    /// Name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Expand { .. } => "expand",
            Self::Collapse { .. } => "collapse",
            Self::ExpandOrCollapse { .. } => "expandOrCollapse",
            Self::Compact { .. } => "compact",
            Self::Uncompact { .. } => "uncompact",
            Self::Select { .. } => "select",
            Self::Unselect { .. } => "unselect",
            Self::ToggleSelection { .. } => "toggleSelection",
            Self::ClearSelection => "clearSelection",
            Self::Reload { .. } => "reload",
            Self::Open { .. } => "open",
            Self::Delete { .. } => "delete",
            Self::Rename { .. } => "rename",
            Self::Copy { .. } => "copy",
            Self::Cut { .. } => "cut",
            Self::Paste { .. } => "paste",
            Self::ToggleHidden => "toggleHidden",
            Self::GotoNext(_) => "gotoNext",
            Self::GotoPrev(_) => "gotoPrev",
            Self::NodeNext => "nodeNext",
            Self::NodePrev => "nodePrev",
            Self::GotoSource(_) => "gotoSource",
            Self::Reveal(_) => "reveal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_known_strategy_names_when_parsed_then_they_round_trip() {
        for name in ["select", "split", "vsplit", "tab", "previousBuffer", "sourceWindow"]
        {
            let strategy: OpenStrategy = name.parse().expect("known strategy");
            assert_eq!(strategy.name(), name);
        }
    }

    #[test]
    fn given_unknown_strategy_when_parsed_then_it_is_rejected() {
        let err = "float".parse::<OpenStrategy>().expect_err("unknown strategy");

        assert!(matches!(err, ExplorerError::UnsupportedOpenStrategy(name) if name == "float"));
    }
}
