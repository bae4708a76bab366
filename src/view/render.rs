use prettytable::{format, Cell, Row, Table};

use crate::view::selection::Projection;

/// Cells wider than this are cut and end in `…`.
pub const MAX_CELL_WIDTH: usize = 40;

/// Render a projection as a box-drawn table, header as the title row.
/// A projection with no visible columns renders as nothing.
pub fn render_table(view: &Projection<'_>, max_width: usize) -> String {
    if view.header.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        view.header
            .iter()
            .map(|h| Cell::new(&clip(h, max_width)).style_spec("b"))
            .collect(),
    ));
    for row in &view.rows {
        table.add_row(Row::new(
            row.iter().map(|c| Cell::new(&clip(c, max_width))).collect(),
        ));
    }
    table.to_string()
}

fn clip(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        return s.to_string();
    }
    let mut clipped: String = s.chars().take(max_width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
