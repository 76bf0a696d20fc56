use std::cmp::Ordering;

/// Order entries directories-first, then by [`compare_names`].
pub fn compare_entries(
    left_is_dir: bool,
    left_name: &str,
    right_is_dir: bool,
    right_name: &str,
) -> Ordering {
    right_is_dir
        .cmp(&left_is_dir)
        .then_with(|| compare_names(left_name, right_name))
}

/// Natural name ordering.
///
/// Runs of ASCII digits compare by numeric value (`file2 < file10`), with
/// more leading zeros sorting later on equal values. Text runs compare
/// case-insensitively; a digit run sorts before a text run. Names that are
/// equal under these rules fall back to plain byte order so the ordering
/// is total.
pub fn compare_names(left: &str, right: &str) -> Ordering {
    let mut left_runs = Runs::new(left);
    let mut right_runs = Runs::new(right);

    loop {
        let order = match (left_runs.next(), right_runs.next()) {
            (None, None) => break,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(Run::Digits(l)), Some(Run::Digits(r))) => {
                compare_numeric(l, r)
            },
            (Some(Run::Text(l)), Some(Run::Text(r))) => compare_folded(l, r),
            (Some(Run::Digits(_)), Some(Run::Text(_))) => Ordering::Less,
            (Some(Run::Text(_)), Some(Run::Digits(_))) => Ordering::Greater,
        };
        if order != Ordering::Equal {
            return order;
        }
    }

    left.cmp(right)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Splits a name into alternating text and digit runs without allocating.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Runs<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, ch)| ch.is_ascii_digit() != digits)
            .map(|(index, _)| index)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits { Run::Digits(run) } else { Run::Text(run) })
    }
}

fn compare_numeric(left: &str, right: &str) -> Ordering {
    let left_value = left.trim_start_matches('0');
    let right_value = right.trim_start_matches('0');
    left_value
        .len()
        .cmp(&right_value.len())
        .then_with(|| left_value.cmp(right_value))
        .then_with(|| left.len().cmp(&right.len()))
}

fn compare_folded(left: &str, right: &str) -> Ordering {
    let left_fold = left.chars().flat_map(char::to_lowercase);
    let right_fold = right.chars().flat_map(char::to_lowercase);
    left_fold.cmp(right_fold)
}
