//! Directional scans over a flattened sequence.
//!
//! The start index itself is never a candidate. Without wrapping a scan
//! stops at the boundary; with wrapping it continues from the opposite end
//! up to (but excluding) the start. Ties cannot happen: the first match in
//! scan order is always the nearest by index.

/// Nearest index after `start` satisfying `matches`.
pub fn scan_index_next_by(
    len: usize,
    start: usize,
    wrap: bool,
    mut matches: impl FnMut(usize) -> bool,
) -> Option<usize> {
    if let Some(found) = (start.saturating_add(1)..len).find(|i| matches(*i)) {
        return Some(found);
    }
    if !wrap {
        return None;
    }
    (0..start.min(len)).find(|i| matches(*i))
}

/// Nearest index before `start` satisfying `matches`.
pub fn scan_index_prev_by(
    len: usize,
    start: usize,
    wrap: bool,
    mut matches: impl FnMut(usize) -> bool,
) -> Option<usize> {
    if let Some(found) = (0..start.min(len)).rev().find(|i| matches(*i)) {
        return Some(found);
    }
    if !wrap {
        return None;
    }
    (start.saturating_add(1)..len).rev().find(|i| matches(*i))
}

/// Slice form of [`scan_index_next_by`].
pub fn scan_index_next<T>(
    list: &[T],
    start: usize,
    wrap: bool,
    mut predicate: impl FnMut(&T) -> bool,
) -> Option<usize> {
    scan_index_next_by(list.len(), start, wrap, |i| predicate(&list[i]))
}

/// Slice form of [`scan_index_prev_by`].
pub fn scan_index_prev<T>(
    list: &[T],
    start: usize,
    wrap: bool,
    mut predicate: impl FnMut(&T) -> bool,
) -> Option<usize> {
    scan_index_prev_by(list.len(), start, wrap, |i| predicate(&list[i]))
}
