use crate::cache::RenderedLineCache;
use crate::diff::{RenderPatch, diff_lines};
use crate::line::RenderedLine;

/// Turns frames or single-line redraws into minimal patches.
///
/// One renderer owns the cache for one buffer region; every patch it
/// returns has already been mirrored into that cache, so the caller must
/// apply it to the host.
#[derive(Debug, Default)]
pub struct Renderer {
    cache: RenderedLineCache,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &RenderedLineCache {
        &self.cache
    }

    /// Number of lines currently drawn in the region.
    pub fn line_count(&self) -> usize {
        self.cache.len()
    }

    /// Diff a complete frame against the cache.
    pub fn render_all(&mut self, frame: &[RenderedLine]) -> RenderPatch {
        let patch = diff_lines(self.cache.lines(), frame);
        self.cache.apply(&patch);
        patch
    }

    /// Redraw individual lines in place.
    ///
    /// Lines outside the drawn region are skipped; lines whose content did
    /// not change produce nothing.
    pub fn render_lines(
        &mut self,
        updates: impl IntoIterator<Item = (usize, RenderedLine)>,
    ) -> RenderPatch {
        let mut updates: Vec<(usize, RenderedLine)> =
            updates.into_iter().collect();
        updates.sort_by_key(|(index, _)| *index);
        updates.dedup_by_key(|(index, _)| *index);

        let mut patch = RenderPatch::default();
        for (index, line) in updates {
            if index >= self.cache.len() {
                log::debug!("skip redraw of line {index} outside region");
                continue;
            }
            if self.cache.get(index) == Some(&line) {
                continue;
            }
            patch.push_in_place(index, line);
        }
        self.cache.apply(&patch);
        patch
    }

    /// Forget every drawn line (root reload). The next frame redraws all.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn invalidate_line(&mut self, index: usize) {
        self.cache.invalidate_line(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(texts: &[&str]) -> Vec<RenderedLine> {
        texts.iter().map(|text| RenderedLine::plain(*text)).collect()
    }

    #[test]
    fn given_first_frame_when_rendered_then_everything_is_inserted() {
        let mut renderer = Renderer::new();

        let patch = renderer.render_all(&frame(&["root", "a"]));

        assert_eq!(patch.touched_lines(), vec![0, 1]);
        assert_eq!(renderer.line_count(), 2);
    }

    #[test]
    fn given_same_frame_twice_when_rendered_then_second_patch_is_empty() {
        let mut renderer = Renderer::new();
        let _ = renderer.render_all(&frame(&["root", "a"]));

        assert!(renderer.render_all(&frame(&["root", "a"])).is_empty());
    }

    #[test]
    fn given_line_updates_when_rendered_then_unchanged_lines_are_dropped() {
        let mut renderer = Renderer::new();
        let _ = renderer.render_all(&frame(&["root", "a", "b"]));

        let patch = renderer.render_lines(vec![
            (2, RenderedLine::plain("b*")),
            (1, RenderedLine::plain("a")),
            (7, RenderedLine::plain("ghost")),
        ]);

        assert_eq!(patch.touched_lines(), vec![2]);
        assert_eq!(
            renderer.cache().get(2).map(|line| line.text.as_str()),
            Some("b*")
        );
    }

    #[test]
    fn given_invalidated_renderer_when_rendered_then_all_lines_redraw() {
        let mut renderer = Renderer::new();
        let _ = renderer.render_all(&frame(&["root", "a"]));
        renderer.invalidate();

        let patch = renderer.render_all(&frame(&["root", "a"]));

        assert_eq!(patch.touched_lines(), vec![0, 1]);
        assert_eq!(patch.line_delta(), 0);
    }
}
