use crate::line::{DrawnLine, LineBuilder};

/// One slice of a row (icon, status, name, size, ...).
///
/// Drawing only reads `item`. Anything a column needs beyond the item
/// (status snapshots, selection) must already be captured in `item`, so a
/// batch drawn with the same snapshot is consistent.
pub trait Column<T, M = ()>: Send + Sync {
    /// Name used to select the column in configuration.
    fn name(&self) -> &'static str;

    /// Append this column's fragment to `line`.
    fn draw(&self, item: &T, line: &mut LineBuilder<M>);
}

/// Draw `item` by running every column in order.
pub fn compose_line<'c, T, M, C>(
    columns: impl IntoIterator<Item = &'c C>,
    item: &T,
) -> DrawnLine<M>
where
    C: Column<T, M> + ?Sized + 'c,
{
    let mut line = LineBuilder::new();
    for column in columns {
        column.draw(item, &mut line);
    }
    line.finish()
}
