//! Headless demo of the explorer engine.
//!
//! Lists a real directory through [`TokioFs`] and prints the panel lines.
//! Version control, diagnostics, buffers and bookmarks come from the
//! in-memory doubles of `grove_explorer::fake`, so git and diagnostic
//! columns stay empty.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;
use grove_explorer::fake::{
    FakeBookmarks, FakeBuffers, FakeDiagnostics, FakeHost, FakeVcs,
    MemoryState,
};
use grove_explorer::{
    Collaborators, ConfigLoadStatus, Explorer, RootContext, Services,
    SourceKind, TokioFs, load_config,
};

const CONFIG_FILE: &str = "grove.json";

const USAGE: &str = "\
usage: grove [ROOT] [REVEAL]

Prints the file tree under ROOT (default: the current directory) as the
explorer panel draws it, optionally expanded down to REVEAL. Options are
read from ROOT/grove.json.

This is a demo: git status, diagnostics, buffers and bookmarks are empty
in-memory stand-ins.";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut args = env::args_os().skip(1).peekable();
    if args.peek().is_some_and(|arg| arg == "-h" || arg == "--help") {
        println!("{USAGE}");
        return Ok(());
    }
    let root = match args.next() {
        Some(root) => PathBuf::from(root),
        None => env::current_dir().context("current directory is not readable")?,
    };
    let reveal = args.next().map(PathBuf::from);

    let mut config = read_config(&root.join(CONFIG_FILE))?;
    config.sources = vec![SourceKind::File];

    let collaborators = Collaborators {
        fs: Arc::new(TokioFs),
        vcs: Arc::new(FakeVcs::new()),
        diagnostics: Arc::new(FakeDiagnostics::new()),
        buffers: Arc::new(FakeBuffers::default()),
        bookmarks: Arc::new(FakeBookmarks::default()),
        state: Arc::new(MemoryState::new()),
    };
    let mut explorer =
        Explorer::new(FakeHost::new(), config, collaborators, Services::new())?;
    explorer
        .open(RootContext {
            workspace: Some(root.clone()),
            cwd: env::current_dir().ok(),
            reveal,
            ..RootContext::default()
        })
        .await
        .with_context(|| format!("failed to open {}", root.display()))?;

    log::debug!("drew {} lines", explorer.total_lines());
    for line in explorer.host().lines() {
        println!("{line}");
    }
    Ok(())
}

fn read_config(path: &Path) -> anyhow::Result<grove_explorer::ExplorerConfig> {
    let (config, status) = load_config(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    match status {
        ConfigLoadStatus::Loaded => log::info!("loaded {}", path.display()),
        ConfigLoadStatus::Missing => {},
        ConfigLoadStatus::Invalid(reason) => {
            log::warn!("ignoring {}: {reason}", path.display());
        },
    }
    Ok(config)
}
