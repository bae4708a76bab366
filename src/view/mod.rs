pub mod fields;
pub mod render;
pub mod search;
pub mod selection;
pub mod session;
pub mod status;

pub use fields::{resolve, status_order_fields, Binding, FieldBinding, FieldSpec, Matcher};
pub use render::{render_table, MAX_CELL_WIDTH};
pub use search::search;
pub use selection::{ColumnSelection, Projection, DEFAULT_VISIBLE_COLUMNS};
pub use session::{Session, Snapshot};
pub use status::{status_records, StatusRecord};
