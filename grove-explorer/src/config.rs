use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use grove_tree::{DEFAULT_MAX_DEPTH, ExpandOptions};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::model::SourceKind;

/// Strategy used to pick the root directory of the file source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootStrategy {
    /// Workspace folder reported by the host.
    Workspace,
    /// Working directory of the host.
    Cwd,
    /// Directory of the buffer the explorer was opened from.
    SourceBuffer,
    /// Directory of the path being revealed.
    Reveal,
    /// Nearest ancestor of the source buffer containing a root pattern.
    Custom,
}

/// Option applied when a node is expanded without explicit options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoExpandOption {
    Recursive,
    Compact,
    Uncompact,
    RecursiveSingle,
}

/// Column names drawn for the root row and the child rows of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceColumns {
    pub root: Vec<String>,
    pub child: Vec<String>,
}

impl SourceColumns {
    fn new(root: &[&str], child: &[&str]) -> Self {
        Self {
            root: root.iter().map(|name| name.to_string()).collect(),
            child: child.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Columns drawn when a source kind has no explicit configuration.
    pub fn defaults(kind: SourceKind) -> Self {
        match kind {
            SourceKind::File => Self::new(
                &["root"],
                &[
                    "selection",
                    "indent",
                    "expandIcon",
                    "git",
                    "filename",
                    "diagnosticError",
                    "diagnosticWarning",
                    "modified",
                ],
            ),
            SourceKind::Buffer => Self::new(
                &["root"],
                &["selection", "bufnr", "modified", "bufname"],
            ),
            SourceKind::Bookmark => Self::new(
                &["root"],
                &[
                    "indent",
                    "expandIcon",
                    "filename",
                    "bookmarkLine",
                    "annotation",
                ],
            ),
        }
    }
}

/// Debounce delays of the external-change binders, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebounceConfig {
    pub git: u64,
    pub diagnostics: u64,
    pub buffer_modified: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            git: 200,
            diagnostics: 500,
            buffer_modified: 100,
        }
    }
}

/// User configuration of one explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    /// Sources shown top to bottom.
    pub sources: Vec<SourceKind>,
    /// Root strategies tried in order; the first that yields a directory
    /// wins.
    pub root_strategies: Vec<RootStrategy>,
    /// File names marking a project root for [`RootStrategy::Custom`].
    pub root_patterns: Vec<String>,
    /// Whether cursor movement past the first or last line wraps.
    pub wrap_scan: bool,
    pub auto_expand_max_depth: usize,
    pub auto_expand_options: Vec<AutoExpandOption>,
    pub show_hidden: bool,
    pub columns: BTreeMap<SourceKind, SourceColumns>,
    pub debounce: DebounceConfig,
    /// How long a reload may take before the previous rows stay on screen
    /// and the result is applied when it arrives.
    pub reload_timeout_ms: u64,
    pub indent_guides: bool,
    /// Display width the filename is padded to, `0` to disable alignment.
    pub name_width: usize,
    pub size_width: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            sources: vec![SourceKind::Buffer, SourceKind::File],
            root_strategies: vec![
                RootStrategy::Reveal,
                RootStrategy::Workspace,
                RootStrategy::Cwd,
            ],
            root_patterns: vec![
                String::from(".git"),
                String::from(".hg"),
                String::from(".svn"),
            ],
            wrap_scan: true,
            auto_expand_max_depth: DEFAULT_MAX_DEPTH,
            auto_expand_options: vec![AutoExpandOption::Compact],
            show_hidden: false,
            columns: BTreeMap::new(),
            debounce: DebounceConfig::default(),
            reload_timeout_ms: 300,
            indent_guides: true,
            name_width: 0,
            size_width: 6,
        }
    }
}

impl ExplorerConfig {
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Options used when expanding without explicit options.
    pub fn expand_options(&self) -> ExpandOptions {
        let mut options = ExpandOptions {
            max_depth: self.auto_expand_max_depth,
            ..ExpandOptions::default()
        };
        for option in &self.auto_expand_options {
            match option {
                AutoExpandOption::Recursive => options.recursive = true,
                AutoExpandOption::Compact => options.compact = true,
                AutoExpandOption::Uncompact => options.uncompact = true,
                AutoExpandOption::RecursiveSingle => {
                    options.recursive_single = true;
                },
            }
        }
        options
    }

    pub fn columns_for(&self, kind: SourceKind) -> SourceColumns {
        self.columns
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| SourceColumns::defaults(kind))
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_millis(self.reload_timeout_ms)
    }
}

/// Status describing how the configuration was loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoadStatus {
    Loaded,
    Missing,
    Invalid(String),
}

/// Read the configuration at `path`.
///
/// A missing file or invalid JSON yields the defaults together with a
/// status describing why; only I/O failures are errors.
pub fn load_config(path: &Path) -> Result<(ExplorerConfig, ConfigLoadStatus)> {
    let data = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((ExplorerConfig::default(), ConfigLoadStatus::Missing));
        },
        Err(err) => return Err(err.into()),
    };

    match ExplorerConfig::from_json(&data) {
        Ok(config) => Ok((config, ConfigLoadStatus::Loaded)),
        Err(err) => {
            log::warn!("invalid explorer config {}: {err}", path.display());
            Ok((
                ExplorerConfig::default(),
                ConfigLoadStatus::Invalid(format!("{err}")),
            ))
        },
    }
}
