use crate::line::RenderedLine;

/// Replace old lines `[start, end)` with `lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSplice {
    pub start: usize,
    pub end: usize,
    pub lines: Vec<RenderedLine>,
}

impl LineSplice {
    /// Whether this splice rewrites lines in place without shifting others.
    pub fn is_in_place(&self) -> bool {
        self.end - self.start == self.lines.len()
    }

    fn delta(&self) -> isize {
        self.lines.len() as isize - (self.end - self.start) as isize
    }
}

/// Minimal set of line edits that turns the previously drawn region into
/// the new one.
///
/// Splices are sorted by `start`, do not overlap, and address the lines as
/// they were before the patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPatch {
    pub splices: Vec<LineSplice>,
}

impl RenderPatch {
    pub fn is_empty(&self) -> bool {
        self.splices.is_empty()
    }

    /// Change in the number of lines once the patch is applied.
    pub fn line_delta(&self) -> isize {
        self.splices.iter().map(LineSplice::delta).sum()
    }

    /// Every emitted line with its index after the patch is applied.
    pub fn replacements(&self) -> Vec<(usize, &RenderedLine)> {
        let mut shift = 0isize;
        let mut out = Vec::new();
        for splice in &self.splices {
            let base = (splice.start as isize + shift) as usize;
            out.extend(
                splice
                    .lines
                    .iter()
                    .enumerate()
                    .map(|(offset, line)| (base + offset, line)),
            );
            shift += splice.delta();
        }
        out
    }

    /// Indexes (after the patch) of every line the patch rewrites.
    pub fn touched_lines(&self) -> Vec<usize> {
        self.replacements()
            .into_iter()
            .map(|(index, _)| index)
            .collect()
    }

    /// Shift every splice by `offset` lines.
    pub fn offset(mut self, offset: usize) -> Self {
        for splice in &mut self.splices {
            splice.start += offset;
            splice.end += offset;
        }
        self
    }

    pub(crate) fn push_in_place(&mut self, index: usize, line: RenderedLine) {
        if let Some(last) = self.splices.last_mut() {
            if last.is_in_place() && last.end == index {
                last.end += 1;
                last.lines.push(line);
                return;
            }
        }
        self.splices.push(LineSplice {
            start: index,
            end: index + 1,
            lines: vec![line],
        });
    }
}

/// Diff the previously drawn lines against a new frame.
///
/// `None` entries in `old` are lines whose cached content is unknown; they
/// always count as changed. The common prefix and suffix are skipped. When
/// the remaining middle has the same length on both sides, only the lines
/// that differ are emitted (consecutive ones share a splice); otherwise the
/// middle is replaced by one splice.
pub fn diff_lines(
    old: &[Option<RenderedLine>],
    new: &[RenderedLine],
) -> RenderPatch {
    let same = |old: &Option<RenderedLine>, new: &RenderedLine| {
        old.as_ref() == Some(new)
    };

    let prefix = old
        .iter()
        .zip(new)
        .take_while(|&(old, new)| same(old, new))
        .count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|&(old, new)| same(old, new))
        .count();

    let old_mid = prefix..old.len() - suffix;
    let new_mid = prefix..new.len() - suffix;
    let mut patch = RenderPatch::default();

    if old_mid.len() == new_mid.len() {
        for index in old_mid {
            if !same(&old[index], &new[index]) {
                patch.push_in_place(index, new[index].clone());
            }
        }
    } else {
        patch.splices.push(LineSplice {
            start: old_mid.start,
            end: old_mid.end,
            lines: new[new_mid].to_vec(),
        });
    }

    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<RenderedLine> {
        texts.iter().map(|text| RenderedLine::plain(*text)).collect()
    }

    fn cached(texts: &[&str]) -> Vec<Option<RenderedLine>> {
        lines(texts).into_iter().map(Some).collect()
    }

    #[test]
    fn given_identical_frames_when_diffed_then_patch_is_empty() {
        let patch = diff_lines(&cached(&["a", "b"]), &lines(&["a", "b"]));

        assert!(patch.is_empty());
    }

    #[test]
    fn given_one_changed_line_when_diffed_then_only_it_is_emitted() {
        let patch = diff_lines(
            &cached(&["root", "a", "b", "c"]),
            &lines(&["root", "a", "B", "c"]),
        );

        assert_eq!(patch.touched_lines(), vec![2]);
        assert_eq!(patch.line_delta(), 0);
    }

    #[test]
    fn given_scattered_changes_when_diffed_then_runs_are_coalesced() {
        let patch = diff_lines(
            &cached(&["0", "1", "2", "3", "4", "5"]),
            &lines(&["0", "x", "y", "3", "z", "5"]),
        );

        assert_eq!(patch.splices.len(), 2);
        assert_eq!(patch.touched_lines(), vec![1, 2, 4]);
    }

    #[test]
    fn given_inserted_lines_when_diffed_then_one_splice_inserts_them() {
        let patch = diff_lines(
            &cached(&["root", "a", "b"]),
            &lines(&["root", "a", "a/x", "a/y", "b"]),
        );

        assert_eq!(
            patch.splices,
            vec![LineSplice {
                start: 2,
                end: 2,
                lines: lines(&["a/x", "a/y"]),
            }]
        );
        assert_eq!(patch.line_delta(), 2);
    }

    #[test]
    fn given_removed_lines_when_diffed_then_one_splice_removes_them() {
        let patch = diff_lines(
            &cached(&["root", "a", "a/x", "a/y", "b"]),
            &lines(&["root", "a", "b"]),
        );

        assert_eq!(
            patch.splices,
            vec![LineSplice {
                start: 2,
                end: 4,
                lines: Vec::new(),
            }]
        );
        assert!(patch.touched_lines().is_empty());
    }

    #[test]
    fn given_unknown_cached_line_when_diffed_then_it_is_redrawn() {
        let mut old = cached(&["a", "b"]);
        old[1] = None;

        let patch = diff_lines(&old, &lines(&["a", "b"]));

        assert_eq!(patch.touched_lines(), vec![1]);
    }

    #[test]
    fn given_repeated_lines_when_diffed_then_prefix_and_suffix_do_not_overlap()
    {
        let patch = diff_lines(&cached(&["a", "a"]), &lines(&["a", "a", "a"]));

        assert_eq!(patch.line_delta(), 1);
        assert_eq!(patch.splices[0].start, 2);
    }

    #[test]
    fn given_patch_when_offset_then_splices_move() {
        let patch = diff_lines(&cached(&["a"]), &lines(&["b"])).offset(10);

        assert_eq!(patch.splices[0].start, 10);
        assert_eq!(patch.splices[0].end, 11);
    }
}
