use crate::diff::RenderPatch;
use crate::line::RenderedLine;

/// Last drawn content of every line in a buffer region.
///
/// A `None` entry is a line known to exist in the host buffer whose content
/// is no longer trusted; the next diff redraws it unconditionally.
#[derive(Debug, Clone, Default)]
pub struct RenderedLineCache {
    lines: Vec<Option<RenderedLine>>,
}

impl RenderedLineCache {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RenderedLine> {
        self.lines.get(index).and_then(Option::as_ref)
    }

    pub fn lines(&self) -> &[Option<RenderedLine>] {
        &self.lines
    }

    /// Distrust every line while keeping the line count.
    pub fn invalidate(&mut self) {
        self.lines.iter_mut().for_each(|line| *line = None);
    }

    /// Distrust one line.
    pub fn invalidate_line(&mut self, index: usize) {
        if let Some(line) = self.lines.get_mut(index) {
            *line = None;
        }
    }

    /// Mirror a patch the host is about to apply.
    pub fn apply(&mut self, patch: &RenderPatch) {
        for splice in patch.splices.iter().rev() {
            let end = splice.end.min(self.lines.len());
            let start = splice.start.min(end);
            self.lines.splice(
                start..end,
                splice.lines.iter().cloned().map(Some),
            );
        }
    }
}
