use std::ops::Range;

use crate::diff::RenderPatch;
use crate::line::{HighlightGroup, HighlightSpan};

/// Host text buffer primitives a patch is materialized through.
///
/// Calls between [`BufferSink::begin_batch`] and [`BufferSink::end_batch`]
/// may be queued by the host and flushed at once.
pub trait BufferSink {
    fn begin_batch(&mut self) {}

    fn end_batch(&mut self) {}

    /// Replace lines `[start, end)` with `lines`.
    fn replace_lines(&mut self, start: usize, end: usize, lines: Vec<String>);

    fn set_highlight(
        &mut self,
        line: usize,
        col_start: usize,
        col_end: usize,
        group: &HighlightGroup,
    );

    fn clear_highlights(&mut self, lines: Range<usize>);
}

/// Apply `patch` to `sink`, with the region starting at line `base`.
///
/// Splices are applied bottom-up so earlier indexes stay valid.
pub fn apply_patch<S: BufferSink + ?Sized>(
    sink: &mut S,
    base: usize,
    patch: &RenderPatch,
) {
    for splice in patch.splices.iter().rev() {
        let start = base + splice.start;
        let end = base + splice.end;
        sink.clear_highlights(start..end);
        sink.replace_lines(
            start,
            end,
            splice.lines.iter().map(|line| line.text.clone()).collect(),
        );
        for (offset, line) in splice.lines.iter().enumerate() {
            for span in &line.highlights {
                sink.set_highlight(
                    start + offset,
                    span.start,
                    span.end,
                    &span.group,
                );
            }
        }
    }
}

/// In-memory [`BufferSink`] for tests and headless use.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    lines: Vec<String>,
    highlights: Vec<Vec<HighlightSpan>>,
    batch_depth: usize,
    batches: usize,
    replaced_lines: usize,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn highlights(&self, line: usize) -> &[HighlightSpan] {
        self.highlights.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of completed batches.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Total number of lines written through `replace_lines`.
    pub fn replaced_lines(&self) -> usize {
        self.replaced_lines
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }
}

impl BufferSink for MemoryBuffer {
    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            log::warn!("end_batch without matching begin_batch");
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.batches += 1;
        }
    }

    fn replace_lines(&mut self, start: usize, end: usize, lines: Vec<String>) {
        let end = end.min(self.lines.len());
        let start = start.min(end);
        self.replaced_lines += lines.len();
        let count = lines.len();
        self.lines.splice(start..end, lines);
        self.highlights
            .splice(start..end, std::iter::repeat_n(Vec::new(), count));
    }

    fn set_highlight(
        &mut self,
        line: usize,
        col_start: usize,
        col_end: usize,
        group: &HighlightGroup,
    ) {
        if let Some(spans) = self.highlights.get_mut(line) {
            spans.push(HighlightSpan {
                start: col_start,
                end: col_end,
                group: group.clone(),
            });
        }
    }

    fn clear_highlights(&mut self, lines: Range<usize>) {
        let end = lines.end.min(self.highlights.len());
        let start = lines.start.min(end);
        self.highlights[start..end]
            .iter_mut()
            .for_each(Vec::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::RenderedLine;
    use crate::renderer::Renderer;

    fn frame(texts: &[&str]) -> Vec<RenderedLine> {
        texts.iter().map(|text| RenderedLine::plain(*text)).collect()
    }

    #[test]
    fn given_patches_when_applied_then_buffer_tracks_renderer() {
        let mut renderer = Renderer::new();
        let mut buffer = MemoryBuffer::new();

        let first = renderer.render_all(&frame(&["root", "a", "b"]));
        apply_patch(&mut buffer, 0, &first);
        let second = renderer.render_all(&frame(&["root", "a", "a/x", "B"]));
        apply_patch(&mut buffer, 0, &second);

        assert_eq!(buffer.lines(), &["root", "a", "a/x", "B"]);
    }

    #[test]
    fn given_region_offset_when_applied_then_lines_land_after_base() {
        let mut renderer = Renderer::new();
        let mut buffer = MemoryBuffer::new();
        buffer.replace_lines(0, 0, vec![String::from("header")]);

        let patch = renderer.render_all(&frame(&["root"]));
        apply_patch(&mut buffer, 1, &patch);

        assert_eq!(buffer.lines(), &["header", "root"]);
    }

    #[test]
    fn given_highlighted_line_when_applied_then_spans_are_set() {
        let mut renderer = Renderer::new();
        let mut buffer = MemoryBuffer::new();
        let line = RenderedLine {
            text: String::from("M a.rs"),
            highlights: vec![HighlightSpan {
                start: 0,
                end: 1,
                group: HighlightGroup::new("GroveGitModified"),
            }],
        };

        let patch = renderer.render_all(&[line]);
        apply_patch(&mut buffer, 0, &patch);

        assert_eq!(buffer.highlights(0).len(), 1);
        assert_eq!(buffer.highlights(0)[0].group.as_str(), "GroveGitModified");
    }

    #[test]
    fn given_nested_batches_when_closed_then_one_batch_is_counted() {
        let mut buffer = MemoryBuffer::new();
        buffer.begin_batch();
        buffer.begin_batch();
        buffer.end_batch();
        assert!(buffer.is_batching());
        buffer.end_batch();

        assert_eq!(buffer.batches(), 1);
    }
}
