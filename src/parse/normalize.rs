/// Force `row` to exactly `target_len` cells: extra trailing cells are dropped,
/// missing ones are filled with empty strings.
pub fn normalize(mut row: Vec<String>, target_len: usize) -> Vec<String> {
    row.resize(target_len, String::new());
    row
}

/// What `normalize` did (or would do) to a row of `len` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Unchanged,
    Padded(usize),
    Truncated(usize),
}

impl Adjustment {
    pub fn of(len: usize, target_len: usize) -> Self {
        use std::cmp::Ordering::*;
        match len.cmp(&target_len) {
            Equal => Adjustment::Unchanged,
            Less => Adjustment::Padded(target_len - len),
            Greater => Adjustment::Truncated(len - target_len),
        }
    }
}
