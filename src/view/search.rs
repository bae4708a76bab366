use crate::parse::Row;
use crate::view::fields::Binding;

/// Rows whose cell in `column` contains `query`, case-insensitively.
///
/// The query is trimmed; an empty query keeps every row. An unresolved column
/// has no data, so a non-empty query matches nothing.
pub fn search<'a>(rows: &'a [Row], column: Binding, query: &str) -> Vec<&'a Row> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.iter().collect();
    }
    let Some(index) = column.index() else {
        return Vec::new();
    };
    rows.iter()
        .filter(|row| {
            row.get(index)
                .is_some_and(|cell| cell.to_lowercase().contains(&needle))
        })
        .collect()
}
