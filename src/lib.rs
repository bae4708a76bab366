pub mod config;
pub mod fetch;
pub mod parse;
pub mod upload;
pub mod view;

pub use parse::{parse, parse_bytes, DelimiterMode, Document, ParseError, Row};
pub use view::{ColumnSelection, FieldBinding, FieldSpec, Session};
