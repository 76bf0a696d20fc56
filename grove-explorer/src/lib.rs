//! Explorer engine: file, buffer and bookmark trees drawn into one host
//! buffer.
//!
//! This crate builds on the lower-level workspace crates:
//! - [`grove_tree`] for the node arena, expand/compaction state and
//!   flattening,
//! - [`grove_render`] for columns, line diffing and the buffer sink.
//!
//! The main entry points are:
//! - [`Explorer`], which owns one [`Source`] per configured provider,
//!   dispatches [`Action`]s and flushes redraws into a host implementing
//!   [`BufferSink`] and [`host::CursorControl`].
//! - [`Binder`]s, which keep the shared [`StatusCache`] fresh from
//!   [`ExternalEvent`]s published on the [`EventBus`] and ask the explorer
//!   to redraw the rows whose status changed.
//!
//! Hosts usually:
//! 1. Implement the collaborator traits in [`host`]. The in-memory doubles
//!    in `fake` need the `test-util` feature.
//! 2. Build an [`Explorer`] from an [`ExplorerConfig`] and call
//!    [`Explorer::open`].
//! 3. Forward user input as [`Action`]s with [`Explorer::dispatch`],
//!    publish change notifications on the bus, and drive
//!    [`Explorer::process_next`] to apply background results.
//!
//! [`BufferSink`]: grove_render::BufferSink

pub mod action;
pub mod binder;
pub mod bus;
pub mod cache;
pub mod clipboard;
pub mod columns;
pub mod config;
pub mod diagnostics;
mod errors;
pub mod event;
pub mod explorer;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod fs;
pub mod host;
pub mod model;
pub mod provider;
pub mod root;
pub mod source;
pub mod sources;
pub mod status;
mod sync;
pub mod task;

pub use action::{Action, OpenStrategy, Target};
pub use binder::{Binder, Concern};
pub use bus::{EventBus, Subscription};
pub use cache::{StatusCache, StatusView};
pub use columns::IndexKind;
pub use config::{ConfigLoadStatus, ExplorerConfig, load_config};
pub use errors::{ExplorerError, Result};
pub use event::{ExplorerEffect, ExplorerEvent, ExternalEvent};
pub use explorer::{Collaborators, Explorer, Services};
pub use fs::TokioFs;
pub use model::SourceKind;
pub use root::RootContext;
pub use source::Source;

pub use grove_render as render;
pub use grove_tree as tree;
