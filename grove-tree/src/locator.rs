use std::collections::HashMap;

use crate::expand::ExpandStore;
use crate::node::NodeUid;

/// Bidirectional mapping between flattened line indexes and node uids.
///
/// Built from the output of [`crate::flatten`]; rebuilt after every
/// flatten pass.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    lines: Vec<NodeUid>,
    index: HashMap<NodeUid, usize>,
}

impl Locator {
    pub fn new(lines: Vec<NodeUid>) -> Self {
        let index = lines
            .iter()
            .enumerate()
            .map(|(line, uid)| (uid.clone(), line))
            .collect();
        Self { lines, index }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[NodeUid] {
        &self.lines
    }

    /// Line of `uid` in the last flattened sequence.
    pub fn line_index_of(&self, uid: &NodeUid) -> Option<usize> {
        self.index.get(uid).copied()
    }

    /// Line showing `uid`, resolving hidden compaction members to the row of
    /// their head.
    pub fn visual_index_of(
        &self,
        uid: &NodeUid,
        store: &ExpandStore,
    ) -> Option<usize> {
        self.line_index_of(uid).or_else(|| {
            store
                .head_of(uid)
                .and_then(|head| self.line_index_of(head))
        })
    }

    pub fn node_at(&self, line: usize) -> Option<&NodeUid> {
        self.lines.get(line)
    }

    /// Clamp a possibly out-of-range index into this sequence.
    pub fn clamp(&self, index: isize) -> Option<usize> {
        clamp_index(index, self.lines.len())
    }
}

/// Clamp `index` into `[0, len - 1]`; `None` for an empty sequence.
pub fn clamp_index(index: isize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let max = len - 1;
    if index <= 0 {
        Some(0)
    } else {
        Some((index as usize).min(max))
    }
}
