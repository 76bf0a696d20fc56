use std::borrow::Cow;
use std::fmt;

use crate::width::{display_width, fit_to_width};

/// Name of a host highlight group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightGroup(Cow<'static, str>);

impl HighlightGroup {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for HighlightGroup {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for HighlightGroup {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for HighlightGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Highlighted byte range `[start, end)` of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub group: HighlightGroup,
}

/// Text and highlights of one drawn line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub highlights: Vec<HighlightSpan>,
}

impl RenderedLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlights: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        display_width(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A drawn line plus the index marks its columns emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnLine<M> {
    pub line: RenderedLine,
    pub marks: Vec<M>,
}

/// Accumulates column fragments for one line.
///
/// Highlight spans are recorded as byte offsets into the final text; the
/// running width is tracked in display cells. Whitespace-only fragments are
/// padding and are dropped when they end the line.
#[derive(Debug)]
pub struct LineBuilder<M = ()> {
    text: String,
    width: usize,
    content_end: usize,
    highlights: Vec<HighlightSpan>,
    marks: Vec<M>,
}

impl<M> Default for LineBuilder<M> {
    fn default() -> Self {
        Self {
            text: String::new(),
            width: 0,
            content_end: 0,
            highlights: Vec::new(),
            marks: Vec::new(),
        }
    }
}

impl<M> LineBuilder<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display width drawn so far.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
        self.width += display_width(text);
        if !text.trim().is_empty() {
            self.content_end = self.text.len();
        }
    }

    pub fn push_highlighted(
        &mut self,
        text: &str,
        group: impl Into<HighlightGroup>,
    ) {
        if text.is_empty() {
            return;
        }
        let start = self.text.len();
        self.push(text);
        self.content_end = self.text.len();
        self.highlights.push(HighlightSpan {
            start,
            end: self.text.len(),
            group: group.into(),
        });
    }

    /// Push `text` truncated or padded to exactly `width` cells.
    pub fn push_fitted(
        &mut self,
        text: &str,
        width: usize,
        align: Align,
        group: Option<HighlightGroup>,
    ) {
        let fitted = fit_to_width(text, width, align);
        match group {
            Some(group) => {
                let trimmed = fitted.trim();
                let lead = fitted.len() - fitted.trim_start().len();
                self.push(&fitted[..lead]);
                self.push_highlighted(trimmed, group);
                self.push(&fitted[lead + trimmed.len()..]);
            },
            None => {
                let content = fitted.trim_end();
                self.push(content);
                self.push(&fitted[content.len()..]);
            },
        }
    }

    /// Pad with spaces until the line is `width` cells wide.
    pub fn pad_to(&mut self, width: usize) {
        let missing = width.saturating_sub(self.width);
        self.text.extend(std::iter::repeat_n(' ', missing));
        self.width += missing;
    }

    /// Push a single space unless the line is empty or already ends in
    /// whitespace.
    pub fn separate(&mut self) {
        if self.text.chars().last().is_some_and(|last| !last.is_whitespace())
        {
            self.push(" ");
        }
    }

    /// Record that this line belongs to a secondary index.
    pub fn mark(&mut self, mark: M) {
        self.marks.push(mark);
    }

    /// Complete the line, dropping padding after the last content fragment.
    pub fn finish(mut self) -> DrawnLine<M> {
        let end = self.content_end;
        self.text.truncate(end);
        for span in &mut self.highlights {
            span.end = span.end.min(end);
            span.start = span.start.min(span.end);
        }
        self.highlights.retain(|span| span.start < span.end);
        DrawnLine {
            line: RenderedLine {
                text: self.text,
                highlights: self.highlights,
            },
            marks: self.marks,
        }
    }
}
