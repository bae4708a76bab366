use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Single-character delimiters tried, in priority order, for CSV-style exports.
pub const DELIMITER_CANDIDATES: [char; 3] = [';', ',', '\t'];

/// A run of tabs, or two-or-more plain spaces, separates fixed-width columns.
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\t+| {2,}").expect("whitespace-run pattern should compile"));

/// How a line is split into tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelimiterMode {
    /// Prioritized single-character delimiters with one layer of quote stripping.
    Explicit,
    /// Runs of tabs or of two-or-more spaces (fixed-width ERP dumps).
    Whitespace,
    /// Explicit if the header line contains a candidate delimiter, whitespace otherwise.
    #[default]
    Auto,
}

impl DelimiterMode {
    /// Guess a mode from a file name: `.csv` is explicit, `.txt`/`.prn` are fixed-width.
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            DelimiterMode::Explicit
        } else if lower.ends_with(".txt") || lower.ends_with(".prn") {
            DelimiterMode::Whitespace
        } else {
            DelimiterMode::Auto
        }
    }
}

/// The concrete split rule chosen for a document. Decided once, from the header
/// line, and then applied unchanged to every body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Splitter {
    Delimiter(char),
    WhitespaceRun,
    /// No delimiter found: the whole line is one column.
    Whole,
}

impl Splitter {
    pub fn split(&self, line: &str) -> Vec<String> {
        let line = prepare_line(line);
        match *self {
            Splitter::Delimiter(d) => line.split(d).map(strip_quotes).collect(),
            Splitter::WhitespaceRun => WHITESPACE_RUN
                .split(&line)
                .map(|t| t.trim().to_string())
                .collect(),
            Splitter::Whole => vec![line],
        }
    }
}

/// Line tokenizer with a fixed delimiter mode.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    mode: DelimiterMode,
    candidates: Vec<char>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DelimiterMode::default())
    }
}

impl Tokenizer {
    pub fn new(mode: DelimiterMode) -> Self {
        Self {
            mode,
            candidates: DELIMITER_CANDIDATES.to_vec(),
        }
    }

    /// Replace the explicit-mode candidates. Order is priority.
    pub fn with_candidates(mut self, candidates: impl Into<Vec<char>>) -> Self {
        self.candidates = candidates.into();
        self
    }

    pub fn mode(&self) -> DelimiterMode {
        self.mode
    }

    /// Pick the splitter for a document from its header line.
    pub fn resolve(&self, header_line: &str) -> Splitter {
        match self.mode {
            DelimiterMode::Explicit => self.find_delimiter(header_line).unwrap_or(Splitter::Whole),
            DelimiterMode::Whitespace => Splitter::WhitespaceRun,
            DelimiterMode::Auto => self
                .find_delimiter(header_line)
                .unwrap_or(Splitter::WhitespaceRun),
        }
    }

    /// Tokenize a single line on its own, inferring the delimiter from that line.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        self.resolve(line).split(line)
    }

    fn find_delimiter(&self, line: &str) -> Option<Splitter> {
        let line = prepare_line(line);
        self.candidates
            .iter()
            .copied()
            .find(|&d| line.split(d).nth(1).is_some())
            .map(Splitter::Delimiter)
    }
}

/// NBSP → space, then trim.
fn prepare_line(line: &str) -> String {
    line.replace('\u{00A0}', " ").trim().to_string()
}

/// Drop exactly one pair of double quotes if the token itself starts and ends
/// with one, then trim. A quote preceded by a space is data and is kept.
pub fn strip_quotes(raw: &str) -> String {
    let inner = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    inner.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_wins_over_comma() {
        let t = Tokenizer::new(DelimiterMode::Explicit);
        assert_eq!(t.tokenize("a;b,c;d"), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn falls_through_to_comma_then_tab() {
        let t = Tokenizer::new(DelimiterMode::Explicit);
        assert_eq!(t.tokenize("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(t.tokenize("a\tb"), vec!["a", "b"]);
    }

    #[test]
    fn strips_one_layer_of_quotes() {
        let t = Tokenizer::new(DelimiterMode::Explicit);
        assert_eq!(
            t.tokenize(r#""Planta";" N° Doc ";"""x""""#),
            vec!["Planta", "N° Doc", r#"""x"""#]
        );
    }

    #[test]
    fn quotes_after_padding_are_kept() {
        let t = Tokenizer::new(DelimiterMode::Explicit);
        assert_eq!(t.tokenize(r#"a; "b" ;c"#), vec!["a", r#""b""#, "c"]);
    }

    #[test]
    fn quoted_delimiter_is_not_protected() {
        let t = Tokenizer::new(DelimiterMode::Explicit);
        assert_eq!(t.tokenize(r#""a;b";c"#), vec![r#""a"#, r#"b""#, "c"]);
    }

    #[test]
    fn lone_quote_is_kept() {
        assert_eq!(strip_quotes(r#""open"#), r#""open"#);
        assert_eq!(strip_quotes(r#"""#), r#"""#);
    }

    #[test]
    fn whitespace_runs_split_columns() {
        let t = Tokenizer::new(DelimiterMode::Whitespace);
        assert_eq!(
            t.tokenize("  COL1  COL2   COL3\t\tCOL 4 "),
            vec!["COL1", "COL2", "COL3", "COL 4"]
        );
    }

    #[test]
    fn single_space_does_not_split() {
        let t = Tokenizer::new(DelimiterMode::Whitespace);
        assert_eq!(t.tokenize("Material Description"), vec!["Material Description"]);
    }

    #[test]
    fn non_breaking_spaces_become_spaces() {
        let t = Tokenizer::new(DelimiterMode::Whitespace);
        assert_eq!(t.tokenize("\u{00A0}A\u{00A0}\u{00A0}B\u{00A0}"), vec!["A", "B"]);
    }

    #[test]
    fn no_delimiter_yields_whole_line() {
        let t = Tokenizer::new(DelimiterMode::Explicit);
        assert_eq!(t.tokenize("  just text  "), vec!["just text"]);
        assert_eq!(t.resolve("just text"), Splitter::Whole);
    }

    #[test]
    fn auto_prefers_explicit_delimiters() {
        let t = Tokenizer::new(DelimiterMode::Auto);
        assert_eq!(t.resolve("a;b"), Splitter::Delimiter(';'));
        assert_eq!(t.resolve("a  b"), Splitter::WhitespaceRun);
    }

    #[test]
    fn custom_candidates_replace_defaults() {
        let t = Tokenizer::new(DelimiterMode::Explicit).with_candidates(vec!['|']);
        assert_eq!(t.tokenize("a|b;c"), vec!["a", "b;c"]);
    }

    #[test]
    fn mode_from_file_name() {
        assert_eq!(DelimiterMode::from_file_name("status_os.CSV"), DelimiterMode::Explicit);
        assert_eq!(DelimiterMode::from_file_name("inventario.txt"), DelimiterMode::Whitespace);
        assert_eq!(DelimiterMode::from_file_name("export"), DelimiterMode::Auto);
    }
}
