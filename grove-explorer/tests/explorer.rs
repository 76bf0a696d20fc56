use std::path::{Path, PathBuf};
use std::time::Duration;

use grove_explorer::columns::IndexKind;
use grove_explorer::diagnostics::{Diagnostic, Severity};
use grove_explorer::fake::{FakeFs, FakeHost, FakeWorld};
use grove_explorer::host::{BufferInfo, FileSystem};
use grove_explorer::sources::{BufferProvider, FileProvider};
use grove_explorer::status::GitStatus;
use grove_explorer::tree::{CollapseOptions, NodeUid};
use grove_explorer::{
    Action, Explorer, ExplorerConfig, ExplorerEffect, ExplorerError,
    ExternalEvent, RootContext, Services, SourceKind, Target,
};

fn file(path: &str) -> NodeUid {
    FileProvider::uid(Path::new(path))
}

fn file_target(path: &str) -> Target {
    Target::node(SourceKind::File, file(path))
}

fn config(sources: Vec<SourceKind>) -> ExplorerConfig {
    ExplorerConfig {
        sources,
        ..ExplorerConfig::default()
    }
}

async fn open(world: &FakeWorld, config: ExplorerConfig) -> Explorer<FakeHost> {
    let mut explorer = Explorer::new(
        FakeHost::new(),
        config,
        world.collaborators(),
        Services::new(),
    )
    .expect("explorer should build");
    explorer
        .open(RootContext {
            workspace: Some(PathBuf::from("/r")),
            ..RootContext::default()
        })
        .await
        .expect("explorer should open");
    explorer
}

/// Buffer line of the row whose text has `name` as a whole word.
fn row_of(explorer: &Explorer<FakeHost>, name: &str) -> Option<usize> {
    explorer
        .host()
        .lines()
        .iter()
        .position(|line| line.split_whitespace().any(|word| word == name))
}

fn buffer(bufnr: u32, name: &str) -> BufferInfo {
    BufferInfo {
        bufnr,
        name: name.to_string(),
        path: Some(PathBuf::from("/r").join(name)),
        modified: false,
        visible: false,
        current: false,
        listed: true,
    }
}

#[tokio::test]
async fn given_expanded_dirs_when_file_appears_then_uids_and_state_survive() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/src/a.ts", 1)
            .with_file("/r/src/lib/b.ts", 1)
            .with_file("/r/README", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    explorer
        .dispatch(Action::Expand {
            target: file_target("/r/src"),
            options: None,
        })
        .await
        .expect("expand src");
    let before: Vec<NodeUid> = explorer
        .source(SourceKind::File)
        .expect("file source")
        .tree()
        .iter()
        .map(|node| node.uid().clone())
        .collect();

    world.fs.add_file("/r/src/new.ts", 1);
    explorer
        .services()
        .bus
        .publish(ExternalEvent::FileSystemChanged {
            path: PathBuf::from("/r/src/new.ts"),
        });
    explorer.process_next().await.expect("event delivered");

    let source = explorer.source(SourceKind::File).expect("file source");
    assert!(before.iter().all(|uid| source.tree().contains(uid)));
    assert!(source.is_expanded(&file("/r/src")));
    assert!(row_of(&explorer, "new.ts").is_some());
}

#[tokio::test]
async fn given_single_child_chain_when_compacted_and_uncompacted_then_nodes_are_restored() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/a/b/c/leaf.txt", 1)
            .with_file("/r/z.txt", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;

    explorer
        .dispatch(Action::Compact {
            target: file_target("/r/a"),
        })
        .await
        .expect("compact");
    assert!(row_of(&explorer, "a/b/c").is_some());
    assert_eq!(explorer.host().lines().len(), 4);

    explorer
        .dispatch(Action::Uncompact {
            target: file_target("/r/a"),
        })
        .await
        .expect("uncompact");

    let source = explorer.source(SourceKind::File).expect("file source");
    for path in ["/r/a", "/r/a/b", "/r/a/b/c"] {
        assert!(source.line_of(&file(path)).is_some(), "{path} has a row");
    }
    assert_eq!(explorer.host().lines().len(), 6);

    explorer
        .dispatch(Action::Collapse {
            target: file_target("/r/a/b"),
            options: CollapseOptions::default(),
        })
        .await
        .expect("collapse b");
    assert!(row_of(&explorer, "leaf.txt").is_none());
    assert!(row_of(&explorer, "a").is_some());
}

#[tokio::test(start_paused = true)]
async fn given_git_change_on_leaf_when_refreshed_then_only_leaf_and_ancestors_redraw() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/src/a.ts", 1)
            .with_file("/r/src/b.ts", 1)
            .with_file("/r/README", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    explorer
        .dispatch(Action::Expand {
            target: file_target("/r/src"),
            options: None,
        })
        .await
        .expect("expand src");
    let untouched = explorer.host().lines().to_vec();
    let written = explorer.host().buffer().replaced_lines();

    world.vcs.set_status("/r", "/r/src/b.ts", GitStatus::Modified);
    explorer.services().bus.publish(ExternalEvent::VcsChanged);
    explorer.process_next().await.expect("redraw delivered");

    assert_eq!(explorer.host().buffer().replaced_lines() - written, 2);
    let lines = explorer.host().lines();
    let src = row_of(&explorer, "src").expect("src row");
    let b = row_of(&explorer, "b.ts").expect("b row");
    assert!(lines[src].contains('M'));
    assert!(lines[b].contains('M'));
    for (index, line) in lines.iter().enumerate() {
        if index != src && index != b {
            assert_eq!(line, &untouched[index]);
        }
    }
}

#[tokio::test]
async fn given_stale_uid_when_dispatched_then_nothing_changes() {
    let world = FakeWorld::new(FakeFs::new().with_file("/r/a", 1));
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    let written = explorer.host().buffer().replaced_lines();

    for action in [
        Action::Expand {
            target: file_target("/r/ghost"),
            options: None,
        },
        Action::Select {
            target: file_target("/r/ghost"),
        },
        Action::Delete {
            target: file_target("/r/ghost"),
        },
    ] {
        let effects = explorer.dispatch(action).await.expect("stale target is a no-op");
        assert!(effects.is_empty());
    }

    assert_eq!(explorer.host().buffer().replaced_lines(), written);
}

#[tokio::test]
async fn given_unreadable_dir_when_expanded_then_error_is_reported_and_node_unloaded() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/locked/secret", 1)
            .with_unreadable_dir("/r/locked"),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;

    let result = explorer
        .dispatch(Action::Expand {
            target: file_target("/r/locked"),
            options: None,
        })
        .await;

    assert!(matches!(result, Err(ExplorerError::Load { .. })));
    let source = explorer.source(SourceKind::File).expect("file source");
    let node = source.tree().get(&file("/r/locked")).expect("node kept");
    assert!(node.children().is_none());
    assert_eq!(explorer.host().lines().len(), 2);
}

#[tokio::test]
async fn given_two_sources_when_moving_past_a_region_then_cursor_wraps_to_neighbour() {
    let world = FakeWorld::new(FakeFs::new().with_file("/r/a", 1).with_file("/r/b", 1));
    world.buffers.set(vec![buffer(1, "a"), buffer(2, "b")]);
    let mut explorer = open(&world, config(vec![SourceKind::Buffer, SourceKind::File])).await;
    assert_eq!(explorer.total_lines(), 6);

    assert_eq!(explorer.goto_source_line(SourceKind::Buffer, 3), Some(3));
    assert_eq!(
        explorer.cursor_node(),
        Some((SourceKind::File, file("/r")))
    );
    assert_eq!(explorer.goto_source_line(SourceKind::File, -1), Some(2));
    assert_eq!(
        explorer.cursor_node(),
        Some((SourceKind::Buffer, BufferProvider::uid(2)))
    );
    assert_eq!(explorer.goto_source_line(SourceKind::File, 7), Some(0));
}

#[tokio::test]
async fn given_wrap_scan_off_when_moving_past_a_region_then_cursor_stays() {
    let world = FakeWorld::new(FakeFs::new().with_file("/r/a", 1));
    world.buffers.set(vec![buffer(1, "a")]);
    let mut explorer = open(
        &world,
        ExplorerConfig {
            wrap_scan: false,
            ..config(vec![SourceKind::Buffer, SourceKind::File])
        },
    )
    .await;
    explorer.goto_line(1);

    assert_eq!(explorer.goto_source_line(SourceKind::Buffer, 2), None);
    assert_eq!(explorer.node_prev(), Some(0));
    assert_eq!(explorer.node_prev(), None);
    assert_eq!(explorer.goto_line(100), Some(3));
}

#[tokio::test(start_paused = true)]
async fn given_slow_reload_when_timed_out_then_result_arrives_as_follow_up() {
    let world = FakeWorld::new(FakeFs::new().with_file("/r/a", 1));
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    world.fs.add_file("/r/late.txt", 1);
    world.fs.set_delay(Some(Duration::from_secs(2)));

    explorer
        .dispatch(Action::Reload {
            target: Target::node(SourceKind::File, file("/r")),
        })
        .await
        .expect("reload");
    assert!(row_of(&explorer, "late.txt").is_none());

    explorer.process_next().await.expect("late load delivered");

    assert!(row_of(&explorer, "late.txt").is_some());
}

#[tokio::test]
async fn given_nested_path_when_revealed_then_cursor_lands_on_it() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/a/b/target.rs", 1)
            .with_file("/r/a/other.rs", 1)
            .with_file("/r/z.rs", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;

    let line = explorer
        .reveal(Path::new("/r/a/b/target.rs"))
        .await
        .expect("reveal");

    assert_eq!(line, row_of(&explorer, "target.rs"));
    assert_eq!(
        explorer.cursor_node(),
        Some((SourceKind::File, file("/r/a/b/target.rs")))
    );
}

#[tokio::test]
async fn given_selection_when_deleted_then_every_selected_path_is_removed() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/a.txt", 1)
            .with_file("/r/b.txt", 1)
            .with_file("/r/c.txt", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    for path in ["/r/a.txt", "/r/c.txt"] {
        explorer
            .dispatch(Action::Select {
                target: file_target(path),
            })
            .await
            .expect("select");
    }

    let effects = explorer
        .dispatch(Action::Delete {
            target: file_target("/r/b.txt"),
        })
        .await
        .expect("delete");

    assert_eq!(effects, vec![ExplorerEffect::Deleted {
        paths: vec![PathBuf::from("/r/a.txt"), PathBuf::from("/r/c.txt")],
    }]);
    assert!(!world.fs.contains("/r/a.txt"));
    assert!(world.fs.contains("/r/b.txt"));
    assert_eq!(explorer.host().lines().len(), 2);
}

#[tokio::test]
async fn given_selected_file_removed_externally_when_other_file_deleted_then_target_is_used() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/a.txt", 1)
            .with_file("/r/b.txt", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    explorer
        .dispatch(Action::Select {
            target: file_target("/r/a.txt"),
        })
        .await
        .expect("select");

    world
        .fs
        .remove(Path::new("/r/a.txt"))
        .await
        .expect("remove outside the explorer");
    explorer
        .services()
        .bus
        .publish(ExternalEvent::FileSystemChanged {
            path: PathBuf::from("/r/a.txt"),
        });
    explorer.process_next().await.expect("event delivered");
    let source = explorer.source(SourceKind::File).expect("file source");
    assert_eq!(source.selected().count(), 0);

    let effects = explorer
        .dispatch(Action::Delete {
            target: file_target("/r/b.txt"),
        })
        .await
        .expect("delete");

    assert_eq!(effects, vec![ExplorerEffect::Deleted {
        paths: vec![PathBuf::from("/r/b.txt")],
    }]);
    assert!(!world.fs.contains("/r/b.txt"));
}

#[tokio::test]
async fn given_selection_when_directory_reloads_then_selection_is_kept() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/a.txt", 1)
            .with_file("/r/b.txt", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    explorer
        .dispatch(Action::Select {
            target: file_target("/r/a.txt"),
        })
        .await
        .expect("select");

    world.fs.add_file("/r/c.txt", 1);
    explorer
        .services()
        .bus
        .publish(ExternalEvent::FileSystemChanged {
            path: PathBuf::from("/r/c.txt"),
        });
    explorer.process_next().await.expect("event delivered");

    let source = explorer.source(SourceKind::File).expect("file source");
    assert!(row_of(&explorer, "c.txt").is_some());
    assert!(source.is_selected(&file("/r/a.txt")));
    assert!(!source.is_selected(&file("/r/b.txt")));
    assert_eq!(source.selected().count(), 1);
}

#[tokio::test]
async fn given_cut_file_when_pasted_into_dir_then_it_moves() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/a.txt", 1)
            .with_dir("/r/dest"),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;

    explorer
        .dispatch(Action::Cut {
            target: file_target("/r/a.txt"),
        })
        .await
        .expect("cut");
    let effects = explorer
        .dispatch(Action::Paste {
            target: file_target("/r/dest"),
        })
        .await
        .expect("paste");

    assert_eq!(effects, vec![ExplorerEffect::Pasted {
        paths: vec![PathBuf::from("/r/dest/a.txt")],
    }]);
    assert!(!world.fs.contains("/r/a.txt"));
    assert!(world.fs.contains("/r/dest/a.txt"));
    let again = explorer
        .dispatch(Action::Paste {
            target: file_target("/r/dest"),
        })
        .await;
    assert!(matches!(again, Err(ExplorerError::InvalidAction { .. })));
}

#[tokio::test]
async fn given_file_when_renamed_then_new_name_is_drawn() {
    let world = FakeWorld::new(FakeFs::new().with_file("/r/old.txt", 1));
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;

    let effects = explorer
        .dispatch(Action::Rename {
            target: file_target("/r/old.txt"),
            to: PathBuf::from("/r/new.txt"),
        })
        .await
        .expect("rename");

    assert_eq!(effects, vec![ExplorerEffect::Renamed {
        from: PathBuf::from("/r/old.txt"),
        to: PathBuf::from("/r/new.txt"),
    }]);
    assert!(row_of(&explorer, "new.txt").is_some());
    assert!(row_of(&explorer, "old.txt").is_none());
}

#[tokio::test]
async fn given_file_row_when_opened_then_host_is_asked_to_open_it() {
    let world = FakeWorld::new(FakeFs::new().with_file("/r/main.rs", 1));
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    explorer.goto_line(1);

    let effects = explorer
        .dispatch(Action::Open {
            target: Target::Cursor,
            strategy: "vsplit".parse().expect("known strategy"),
        })
        .await
        .expect("open");

    assert_eq!(effects, vec![ExplorerEffect::OpenFile {
        path: PathBuf::from("/r/main.rs"),
        line: None,
        strategy: grove_explorer::OpenStrategy::Vsplit,
    }]);
}

#[tokio::test(start_paused = true)]
async fn given_diagnostics_when_scanning_then_rows_with_errors_are_visited() {
    let world = FakeWorld::new(
        FakeFs::new()
            .with_file("/r/src/bad.rs", 1)
            .with_file("/r/src/good.rs", 1)
            .with_file("/r/z.rs", 1),
    );
    let mut explorer = open(&world, config(vec![SourceKind::File])).await;
    explorer
        .dispatch(Action::Expand {
            target: file_target("/r/src"),
            options: None,
        })
        .await
        .expect("expand src");

    world.diagnostics.set(vec![Diagnostic {
        path: PathBuf::from("/r/src/bad.rs"),
        severity: Severity::Error,
    }]);
    explorer.services().bus.publish(ExternalEvent::DiagnosticsChanged);
    explorer.process_next().await.expect("redraw delivered");
    explorer.goto_line(0);

    let src = row_of(&explorer, "src");
    let bad = row_of(&explorer, "bad.rs");
    assert!(explorer.host().lines()[bad.expect("bad row")].ends_with('1'));
    assert_eq!(explorer.goto_next(IndexKind::DiagnosticError), src);
    assert_eq!(explorer.goto_next(IndexKind::DiagnosticError), bad);
    assert_eq!(explorer.goto_next(IndexKind::DiagnosticError), src);
}
