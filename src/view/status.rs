use serde::Serialize;

use crate::parse::Row;
use crate::view::fields::{FieldBinding, DESCRIPTION, DOCUMENT, PLANT};

/// One service order from the status export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub plant: String,
    pub document: String,
    pub description: String,
}

/// Pull plant / document / description out of every row that has a document
/// number. Unresolved fields read as empty.
pub fn status_records<'a, I>(rows: I, binding: &FieldBinding) -> Vec<StatusRecord>
where
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter()
        .filter_map(|row| {
            let field = |name: &str| binding.value(name, row).unwrap_or("").to_string();
            let document = field(DOCUMENT);
            if document.is_empty() {
                return None;
            }
            Some(StatusRecord {
                plant: field(PLANT),
                document,
                description: field(DESCRIPTION),
            })
        })
        .collect()
}
