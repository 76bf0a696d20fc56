use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::line::Align;

/// Number of terminal cells `text` occupies.
#[inline]
pub fn display_width(text: &str) -> usize {
    text.width()
}

/// Longest prefix of `text` that fits in `max` cells.
///
/// A wide character that would straddle the limit is dropped entirely.
pub fn truncate_to_width(text: &str, max: usize) -> &str {
    let mut used = 0;
    for (index, ch) in text.char_indices() {
        let cells = ch.width().unwrap_or(0);
        if used + cells > max {
            return &text[..index];
        }
        used += cells;
    }
    text
}

/// Truncate or pad `text` so it occupies exactly `width` cells.
pub fn fit_to_width(text: &str, width: usize, align: Align) -> String {
    let fitted = truncate_to_width(text, width);
    let padding = width.saturating_sub(display_width(fitted));
    let mut out = String::with_capacity(fitted.len() + padding);
    match align {
        Align::Left => {
            out.push_str(fitted);
            out.extend(std::iter::repeat_n(' ', padding));
        },
        Align::Right => {
            out.extend(std::iter::repeat_n(' ', padding));
            out.push_str(fitted);
        },
    }
    out
}
