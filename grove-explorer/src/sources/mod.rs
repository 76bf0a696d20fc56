//! Node providers behind the explorer sources.

mod bookmark;
mod buffer;
mod file;

pub use bookmark::BookmarkProvider;
pub use buffer::BufferProvider;
pub use file::{FileProvider, root_label};
