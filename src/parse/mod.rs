// src/parse/mod.rs
pub mod normalize;
pub mod tokenize;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

pub use normalize::{normalize, Adjustment};
pub use tokenize::{strip_quotes, DelimiterMode, Splitter, Tokenizer, DELIMITER_CANDIDATES};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is empty or has no non-blank lines")]
    EmptyDocument,
    #[error("no header columns detected on the first line")]
    NoHeader,
}

/// One body line, aligned cell-for-cell with the document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row(Vec<String>);

impl Row {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A parsed export. Every row has exactly `header().len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    header: Vec<String>,
    rows: Vec<Row>,
    splitter: Splitter,
}

impl Document {
    /// Column labels, in source order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Body rows, in source line order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The split rule decided from the header line.
    pub fn splitter(&self) -> Splitter {
        self.splitter
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

/// Split text on `\n` or `\r\n`, right-trim each line and drop blank ones.
/// A leading UTF-8 byte-order mark is ignored.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.strip_prefix('\u{FEFF}')
        .unwrap_or(text)
        .split('\n')
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect()
}

/// Tokenize the header line and return it with the remaining body lines, plus
/// the splitter that must be used for those lines.
pub fn split_header<'a>(
    lines: &[&'a str],
    tokenizer: &Tokenizer,
) -> Result<(Vec<String>, Splitter, Vec<&'a str>), ParseError> {
    let (first, body) = lines.split_first().ok_or(ParseError::EmptyDocument)?;
    let splitter = tokenizer.resolve(first);
    let header = splitter.split(first);
    if header.is_empty() {
        return Err(ParseError::NoHeader);
    }
    Ok((header, splitter, body.to_vec()))
}

/// Parse a whole export into a normalized [`Document`].
#[tracing::instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn parse(text: &str, mode: DelimiterMode) -> Result<Document, ParseError> {
    let tokenizer = Tokenizer::new(mode);
    let lines = split_lines(text);
    let (header, splitter, body) = split_header(&lines, &tokenizer)?;
    let width = header.len();

    let mut padded = 0usize;
    let mut truncated = 0usize;
    let rows = body
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let cells = splitter.split(line);
            match Adjustment::of(cells.len(), width) {
                Adjustment::Unchanged => {}
                Adjustment::Padded(n) => {
                    padded += 1;
                    trace!(line = i + 2, missing = n, "padding short row");
                }
                Adjustment::Truncated(n) => {
                    truncated += 1;
                    trace!(line = i + 2, extra = n, "truncating long row");
                }
            }
            Row(normalize(cells, width))
        })
        .collect::<Vec<_>>();

    debug!(
        columns = width,
        rows = rows.len(),
        padded,
        truncated,
        splitter = ?splitter,
        "parsed document"
    );

    Ok(Document {
        header,
        rows,
        splitter,
    })
}

/// Parse raw bytes, replacing invalid UTF-8 sequences.
pub fn parse_bytes(bytes: &[u8], mode: DelimiterMode) -> Result<Document, ParseError> {
    parse(&String::from_utf8_lossy(bytes), mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(row: &Row) -> Vec<&str> {
        row.cells().iter().map(String::as_str).collect()
    }

    #[test]
    fn semicolon_export_pads_short_rows() {
        let doc = parse("Planta;Doc;Desc\nA;1;x\nB;2", DelimiterMode::Explicit).unwrap();
        assert_eq!(doc.header(), ["Planta", "Doc", "Desc"]);
        assert_eq!(doc.splitter(), Splitter::Delimiter(';'));
        assert_eq!(doc.rows().len(), 2);
        assert_eq!(cells(&doc.rows()[0]), ["A", "1", "x"]);
        assert_eq!(cells(&doc.rows()[1]), ["B", "2", ""]);
    }

    #[test]
    fn fixed_width_export() {
        let doc = parse(
            "COL1  COL2   COL3\nval1  val2   val3",
            DelimiterMode::Whitespace,
        )
        .unwrap();
        assert_eq!(doc.header(), ["COL1", "COL2", "COL3"]);
        assert_eq!(doc.rows().len(), 1);
        assert_eq!(cells(&doc.rows()[0]), ["val1", "val2", "val3"]);
    }

    #[test]
    fn blank_input_is_empty_document() {
        assert_eq!(parse("", DelimiterMode::Auto), Err(ParseError::EmptyDocument));
        assert_eq!(
            parse("  \r\n\t\n\u{00A0}\n", DelimiterMode::Whitespace),
            Err(ParseError::EmptyDocument)
        );
    }

    #[test]
    fn crlf_and_blank_lines_are_dropped() {
        let doc = parse("a;b\r\n\r\n1;2\r\n   \r\n3;4\r\n", DelimiterMode::Explicit).unwrap();
        assert_eq!(doc.rows().len(), 2);
        assert_eq!(cells(&doc.rows()[1]), ["3", "4"]);
    }

    #[test]
    fn long_rows_are_truncated_to_header() {
        let doc = parse("a;b\n1;2;3;\n", DelimiterMode::Explicit).unwrap();
        assert_eq!(cells(&doc.rows()[0]), ["1", "2"]);
    }

    #[test]
    fn delimiter_is_decided_once_from_header() {
        // The body line has commas, but the header picked `;`.
        let doc = parse("a;b\nx,y;z", DelimiterMode::Explicit).unwrap();
        assert_eq!(cells(&doc.rows()[0]), ["x,y", "z"]);
    }

    #[test]
    fn single_column_header_keeps_body_whole() {
        let doc = parse("Report\nA;B", DelimiterMode::Explicit).unwrap();
        assert_eq!(doc.header(), ["Report"]);
        assert_eq!(cells(&doc.rows()[0]), ["A;B"]);
    }

    #[test]
    fn auto_mode_falls_back_to_whitespace() {
        let doc = parse("Material  Centro\n100200  CL01\n", DelimiterMode::Auto).unwrap();
        assert_eq!(doc.splitter(), Splitter::WhitespaceRun);
        assert_eq!(cells(&doc.rows()[0]), ["100200", "CL01"]);
    }

    #[test]
    fn padded_quotes_survive_in_body_rows() {
        let doc = parse("a;b\n1; \"x\" ", DelimiterMode::Explicit).unwrap();
        assert_eq!(cells(&doc.rows()[0]), ["1", "\"x\""]);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let doc = parse("\u{FEFF}A;B\n1;2", DelimiterMode::Explicit).unwrap();
        assert_eq!(doc.header(), ["A", "B"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let doc = parse_bytes(b"A;B\n\xff;2", DelimiterMode::Explicit).unwrap();
        assert_eq!(cells(&doc.rows()[0]), ["\u{FFFD}", "2"]);
    }

    #[test]
    fn header_only_document_has_no_rows() {
        let doc = parse("A;B;C\n", DelimiterMode::Explicit).unwrap();
        assert_eq!(doc.column_count(), 3);
        assert!(doc.rows().is_empty());
    }
}
