//! Copy/cut buffer shared between explorers through the host state store.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::host::StateStore;

const CLIPBOARD_KEY: &str = "grove.clipboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipboardMode {
    Copy,
    Cut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardState {
    pub mode: ClipboardMode,
    pub paths: Vec<PathBuf>,
}

/// Clipboard persisted as JSON under one state key.
pub struct Clipboard {
    store: Arc<dyn StateStore>,
}

impl Clipboard {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Current content. A malformed entry is logged and treated as empty.
    pub fn load(&self) -> Option<ClipboardState> {
        let raw = self.store.get(CLIPBOARD_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(err) => {
                log::warn!("ignoring malformed clipboard state: {err}");
                None
            },
        }
    }

    pub fn save(&self, state: &ClipboardState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        self.store.set(CLIPBOARD_KEY, raw);
        Ok(())
    }

    pub fn clear(&self) {
        self.store.remove(CLIPBOARD_KEY);
    }
}
