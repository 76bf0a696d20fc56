//! Choice of the file source's root directory.

use std::path::{Path, PathBuf};

use crate::config::RootStrategy;
use crate::host::FileSystem;

/// What the host knows when the explorer is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootContext {
    pub workspace: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    /// File shown in the window the explorer was opened from.
    pub source_buffer: Option<PathBuf>,
    /// Path to reveal once the explorer is open.
    pub reveal: Option<PathBuf>,
}

/// Resolve the root with the first strategy that yields an existing
/// directory, in configured order.
pub async fn resolve_root(
    strategies: &[RootStrategy],
    patterns: &[String],
    context: &RootContext,
    fs: &dyn FileSystem,
) -> Option<PathBuf> {
    for strategy in strategies {
        let candidate = match strategy {
            RootStrategy::Workspace => context.workspace.clone(),
            RootStrategy::Cwd => context.cwd.clone(),
            RootStrategy::SourceBuffer => {
                context.source_buffer.as_deref().and_then(parent_dir)
            },
            RootStrategy::Reveal => context.reveal.as_deref().and_then(parent_dir),
            RootStrategy::Custom => match context.source_buffer.as_deref() {
                Some(buffer) => marked_ancestor(buffer, patterns, fs).await,
                None => None,
            },
        };
        let Some(candidate) = candidate else {
            continue;
        };
        if fs.exists(&candidate).await {
            log::debug!("root {} resolved by {strategy:?}", candidate.display());
            return Some(candidate);
        }
    }
    None
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Nearest ancestor directory of `path` containing one of `patterns`.
async fn marked_ancestor(
    path: &Path,
    patterns: &[String],
    fs: &dyn FileSystem,
) -> Option<PathBuf> {
    let start = path.parent()?;
    for ancestor in start.ancestors() {
        for pattern in patterns {
            if fs.exists(&ancestor.join(pattern)).await {
                return Some(ancestor.to_path_buf());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeFs;

    fn fs() -> FakeFs {
        FakeFs::new()
            .with_dir("/work/.git")
            .with_file("/work/pkg/src/lib.rs", 1)
            .with_dir("/home/me")
    }

    fn patterns() -> Vec<String> {
        vec![String::from(".git")]
    }

    #[tokio::test]
    async fn given_strategies_when_resolved_then_first_match_wins() {
        let context = RootContext {
            workspace: Some(PathBuf::from("/missing")),
            cwd: Some(PathBuf::from("/home/me")),
            source_buffer: Some(PathBuf::from("/work/pkg/src/lib.rs")),
            reveal: None,
        };

        let root = resolve_root(
            &[RootStrategy::Reveal, RootStrategy::Workspace, RootStrategy::Cwd],
            &patterns(),
            &context,
            &fs(),
        )
        .await;

        assert_eq!(root, Some(PathBuf::from("/home/me")));
    }

    #[tokio::test]
    async fn given_custom_strategy_when_resolved_then_marked_ancestor_is_used() {
        let context = RootContext {
            source_buffer: Some(PathBuf::from("/work/pkg/src/lib.rs")),
            ..RootContext::default()
        };

        let custom =
            resolve_root(&[RootStrategy::Custom], &patterns(), &context, &fs()).await;
        let buffer =
            resolve_root(&[RootStrategy::SourceBuffer], &patterns(), &context, &fs())
                .await;

        assert_eq!(custom, Some(PathBuf::from("/work")));
        assert_eq!(buffer, Some(PathBuf::from("/work/pkg/src")));
    }

    #[tokio::test]
    async fn given_nothing_resolves_when_resolved_then_root_is_none() {
        let root = resolve_root(
            &[RootStrategy::Workspace, RootStrategy::Custom],
            &patterns(),
            &RootContext::default(),
            &fs(),
        )
        .await;

        assert_eq!(root, None);
    }
}
