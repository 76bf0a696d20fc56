//! Tracking of pending redraw work between flushes.
//!
//! Redraw requests issued in the same tick are merged into one [`Damage`]
//! value and turned into a single patch when the owner flushes, so the host
//! never sees intermediate states.

use std::collections::BTreeSet;

/// Pending redraw work, keyed by whatever identifies a row (line index or
/// node uid).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Damage<K: Ord> {
    /// Nothing to redraw.
    None,

    /// Everything must be recomputed (expand, collapse, reload).
    Full,

    /// Only these rows changed.
    Partial(BTreeSet<K>),
}

impl<K: Ord> Default for Damage<K> {
    fn default() -> Self {
        Self::None
    }
}

impl<K: Ord> Damage<K> {
    /// Request a full redraw. Absorbs any partial damage.
    #[inline]
    pub fn damage_all(&mut self) {
        *self = Self::Full;
    }

    /// Add one row to the pending damage.
    pub fn damage(&mut self, key: K) {
        match self {
            Self::Full => {},
            Self::Partial(keys) => {
                keys.insert(key);
            },
            Self::None => *self = Self::Partial(BTreeSet::from([key])),
        }
    }

    /// Merge another pending damage into this one.
    pub fn merge(&mut self, other: Self) {
        match other {
            Self::None => {},
            Self::Full => self.damage_all(),
            Self::Partial(keys) => {
                for key in keys {
                    self.damage(key);
                }
            },
        }
    }

    #[inline]
    pub fn is_damaged(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Take the pending damage, leaving nothing behind.
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}
