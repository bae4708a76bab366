use std::collections::BTreeSet;

use serde::Serialize;

use crate::parse::Row;

/// Columns shown when a document is first loaded.
pub const DEFAULT_VISIBLE_COLUMNS: usize = 6;

/// Visible header indices. Always iterated in ascending order, whatever order
/// they were toggled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    visible: BTreeSet<usize>,
}

/// A reduced header/row view over the selected columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection<'a> {
    pub header: Vec<&'a str>,
    pub rows: Vec<Vec<&'a str>>,
}

impl ColumnSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `min(DEFAULT_VISIBLE_COLUMNS, header_len)` columns.
    pub fn default_for(header_len: usize) -> Self {
        Self::first_n(header_len, DEFAULT_VISIBLE_COLUMNS)
    }

    pub fn first_n(header_len: usize, n: usize) -> Self {
        Self {
            visible: (0..header_len.min(n)).collect(),
        }
    }

    /// Show the column if hidden, hide it if shown. Returns whether it is now visible.
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.visible.remove(&index) {
            false
        } else {
            self.visible.insert(index);
            true
        }
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.contains(&index)
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.visible.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Restrict `header` and `rows` to the visible columns. Indices past the end
    /// of a header or row read as `""`.
    pub fn project<'a, I>(&self, header: &'a [String], rows: I) -> Projection<'a>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let header = self
            .visible
            .iter()
            .map(|&i| header.get(i).map_or("", String::as_str))
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                self.visible
                    .iter()
                    .map(|&i| row.get(i).unwrap_or(""))
                    .collect()
            })
            .collect();
        Projection { header, rows }
    }
}
