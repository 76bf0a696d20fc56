//! Incremental rendering of tree rows into a line-oriented text buffer.
//!
//! Rows are composed from ordered [`Column`]s into [`RenderedLine`]s
//! (text plus highlight spans). The [`Renderer`] keeps the last drawn lines
//! in a [`RenderedLineCache`] and turns a new frame, or a handful of
//! redrawn lines, into a minimal [`RenderPatch`]: unchanged lines never
//! appear in it. A patch is materialized through a [`BufferSink`], the
//! host's text and highlight primitives.
//!
//! Widths are display widths: double-width characters take two cells.

mod cache;
mod column;
mod damage;
mod diff;
mod line;
mod renderer;
mod sink;
mod width;

pub use cache::RenderedLineCache;
pub use column::{Column, compose_line};
pub use damage::Damage;
pub use diff::{LineSplice, RenderPatch, diff_lines};
pub use line::{
    Align, DrawnLine, HighlightGroup, HighlightSpan, LineBuilder, RenderedLine,
};
pub use renderer::Renderer;
pub use sink::{BufferSink, MemoryBuffer, apply_patch};
pub use width::{display_width, fit_to_width, truncate_to_width};
