//! CSV parser with numeric/text type inference.
//!
//! Parses CSV content into a [`DataFrame`](crate::dataframe::DataFrame).
//! A column is numeric when every non-missing cell parses as a number,
//! otherwise it is text.
//!
//! # Features
//!
//! - RFC 4180 quoting (quoted fields, escaped quotes, delimiters and newlines in fields)
//! - `\n`, `\r\n` and bare `\r` line endings, UTF-8 BOM stripped
//! - Standard null markers recognized: empty, `NA`, `N/A`, `null`, `NULL`, `None`, `NaN`, ...
//! - Blank lines are skipped
//! - Configurable delimiter and null markers
//!
//! # Example
//!
//! ```
//! use data_analyzer::csv_parser::CsvParser;
//! use data_analyzer::dataframe::DataType;
//!
//! let csv = "name,value\nAlice,1.5\nBob,NA\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! assert_eq!(df.row_count(), 2);
//! assert_eq!(df.column(0).unwrap().data_type(), DataType::Text);
//! assert_eq!(df.column(1).unwrap().data_type(), DataType::Numeric);
//! assert_eq!(df.column(1).unwrap().null_count(), 1);
//! ```

use crate::dataframe::DataFrame;
use crate::error::AnalyzerError;
use crate::loader::{build_frame, Cell};

const FORMAT: &str = "CSV";

/// Standard null value markers recognized during parsing.
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", "NaN", "nan", "NAN", "#N/A",
    "#NA", "<NA>",
];

/// A parsed record together with the 1-based line it starts on.
struct RawRow {
    line: usize,
    fields: Vec<String>,
}

/// CSV parser configuration and entry point.
///
/// ```
/// use data_analyzer::csv_parser::CsvParser;
///
/// let df = CsvParser::new().delimiter(b';').parse_str("a;b\n1;2\n3;4\n").unwrap();
/// assert_eq!(df.row_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvParser {
    /// Creates a parser with default settings (comma delimiter, header row, standard null markers).
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Sets the field delimiter (default: comma).
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Sets whether the first row is a header (default: true).
    pub fn has_header(mut self, header: bool) -> Self {
        self.has_header = header;
        self
    }

    /// Sets custom null markers (replaces defaults).
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Parses raw bytes, which must be UTF-8 (a BOM is allowed).
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DataFrame, AnalyzerError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            AnalyzerError::parse(FORMAT, format!("content is not valid UTF-8: {e}"))
        })?;
        self.parse_str(text)
    }

    /// Parses a CSV string into a DataFrame.
    pub fn parse_str(&self, input: &str) -> Result<DataFrame, AnalyzerError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);

        let mut raw_rows = self.parse_raw(input)?.into_iter();

        let (headers, header_len) = if self.has_header {
            let header = raw_rows
                .next()
                .ok_or_else(|| AnalyzerError::parse(FORMAT, "no columns to parse from file"))?;
            let len = header.fields.len();
            (header.fields, len)
        } else {
            let data: Vec<RawRow> = raw_rows.collect();
            let n_cols = data
                .first()
                .map(|r| r.fields.len())
                .ok_or_else(|| AnalyzerError::parse(FORMAT, "no columns to parse from file"))?;
            let headers = (0..n_cols).map(|i| format!("col_{i}")).collect();
            raw_rows = data.into_iter();
            (headers, n_cols)
        };

        // Transpose to column-major cells
        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); header_len];
        for row in raw_rows {
            if row.fields.len() != header_len {
                return Err(AnalyzerError::parse_at(
                    FORMAT,
                    row.line,
                    format!("expected {header_len} fields, got {}", row.fields.len()),
                ));
            }
            for (col_idx, field) in row.fields.into_iter().enumerate() {
                columns[col_idx].push(self.classify(field));
            }
        }

        build_frame(headers, columns)
    }

    // ── Internal parsing ─────────────────────────────────────────

    /// Splits CSV text into records of string fields, skipping blank lines.
    fn parse_raw(&self, input: &str) -> Result<Vec<RawRow>, AnalyzerError> {
        let delim = self.delimiter as char;
        let mut rows: Vec<RawRow> = Vec::new();
        let mut current_row: Vec<String> = Vec::new();
        let mut current_field = String::new();
        let mut in_quotes = false;
        let mut row_quoted = false;
        let mut line_num: usize = 1;
        let mut row_start: usize = 1;
        let mut quote_start: usize = 1;
        let mut chars = input.chars().peekable();

        let mut finish_row = |fields: Vec<String>, quoted: bool, start: usize| {
            let blank = !quoted && fields.len() == 1 && fields[0].trim().is_empty();
            if !blank {
                rows.push(RawRow {
                    line: start,
                    fields,
                });
            }
        };

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current_field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    if c == '\n' {
                        line_num += 1;
                    }
                    current_field.push(c);
                }
            } else if c == '"' && current_field.trim().is_empty() {
                current_field.clear();
                in_quotes = true;
                row_quoted = true;
                quote_start = line_num;
            } else if c == delim {
                current_row.push(std::mem::take(&mut current_field));
            } else if c == '\n' || c == '\r' {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                current_row.push(std::mem::take(&mut current_field));
                finish_row(std::mem::take(&mut current_row), row_quoted, row_start);
                row_quoted = false;
                line_num += 1;
                row_start = line_num;
            } else {
                current_field.push(c);
            }
        }

        if in_quotes {
            return Err(AnalyzerError::parse_at(
                FORMAT,
                quote_start,
                "unterminated quoted field",
            ));
        }

        // Last record without a trailing newline
        if !current_field.is_empty() || !current_row.is_empty() || row_quoted {
            current_row.push(current_field);
            finish_row(current_row, row_quoted, row_start);
        }

        Ok(rows)
    }

    /// Checks if a trimmed value is a null marker.
    fn is_null(&self, value: &str) -> bool {
        let trimmed = value.trim();
        self.null_markers.iter().any(|m| m == trimmed)
    }

    fn classify(&self, field: String) -> Cell {
        if self.is_null(&field) {
            Cell::Missing
        } else {
            Cell::Text(field.trim().to_string())
        }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::DataType;

    // ── Basic CSV parsing ────────────────────────────────────────

    #[test]
    fn parse_simple_csv() {
        let df = CsvParser::new().parse_str("a,b,c\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!(df.row_count(), 2);
        assert_eq!(df.column_count(), 3);
        assert_eq!(df.column_names(), &["a", "b", "c"]);
    }

    #[test]
    fn parse_numeric_columns() {
        let df = CsvParser::new()
            .parse_str("x,y\n1.5,2.7\n3.1,-4.2\n0,1e3\n")
            .unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.data_type(), DataType::Numeric);
        assert_eq!(x.as_numeric().unwrap(), &[1.5, 3.1, 0.0]);
        let y = df.column_by_name("y").unwrap();
        assert_eq!(y.as_numeric().unwrap(), &[2.7, -4.2, 1000.0]);
    }

    #[test]
    fn single_non_numeric_demotes_to_text() {
        let df = CsvParser::new().parse_str("v\n1\n2\nthree\n").unwrap();
        let v = df.column_by_name("v").unwrap();
        assert_eq!(v.data_type(), DataType::Text);
        assert_eq!(v.text_at(0), Some("1"));
    }

    #[test]
    fn booleans_are_text() {
        let df = CsvParser::new().parse_str("flag\ntrue\nfalse\n").unwrap();
        assert_eq!(df.column(0).unwrap().data_type(), DataType::Text);
    }

    // ── Missing values ───────────────────────────────────────────

    #[test]
    fn parse_null_markers() {
        let csv = "x\n1\nNA\n\"\"\nnull\nN/A\n6\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let x = df.column_by_name("x").unwrap();
        assert_eq!(x.data_type(), DataType::Numeric);
        assert_eq!(x.null_count(), 4);
        assert_eq!(x.valid_numeric_values().unwrap(), vec![1.0, 6.0]);
    }

    #[test]
    fn empty_trailing_cell_is_missing() {
        let df = CsvParser::new()
            .parse_str("price,qty\n10,2\n10,2\n20,\n")
            .unwrap();
        assert_eq!(df.row_count(), 3);
        let qty = df.column_by_name("qty").unwrap();
        assert_eq!(qty.data_type(), DataType::Numeric);
        assert!(!qty.is_valid(2));
    }

    #[test]
    fn all_null_column_is_numeric() {
        let df = CsvParser::new().parse_str("a,b\n1,\n2,NA\n").unwrap();
        let b = df.column_by_name("b").unwrap();
        assert_eq!(b.data_type(), DataType::Numeric);
        assert_eq!(b.null_count(), 2);
    }

    #[test]
    fn missing_text_distinct_from_empty_quoted_marker() {
        let df = CsvParser::new().parse_str("s\nabc\n\nNA\nxyz\n").unwrap();
        // blank line skipped, NA missing
        assert_eq!(df.row_count(), 3);
        let s = df.column_by_name("s").unwrap();
        assert_eq!(s.data_type(), DataType::Text);
        assert_eq!(s.text_at(1), None);
        assert_eq!(s.text_at(2), Some("xyz"));
    }

    #[test]
    fn custom_null_markers() {
        let df = CsvParser::new()
            .null_markers(vec!["".into(), "-".into()])
            .parse_str("x\n1\n-\nNA\n")
            .unwrap();
        let x = df.column_by_name("x").unwrap();
        // "NA" is no longer a null marker, so the column is text
        assert_eq!(x.data_type(), DataType::Text);
        assert_eq!(x.null_count(), 1);
    }

    // ── Quoting and line endings ─────────────────────────────────

    #[test]
    fn parse_quoted_fields() {
        let csv = "name,desc\n\"Smith, J\",\"said \"\"hi\"\"\"\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        let name = df.column_by_name("name").unwrap();
        assert_eq!(name.text_at(0), Some("Smith, J"));
        let desc = df.column_by_name("desc").unwrap();
        assert_eq!(desc.text_at(0), Some("said \"hi\""));
    }

    #[test]
    fn parse_quoted_newlines() {
        let csv = "id,note\n1,\"line one\nline two\"\n2,plain\n";
        let df = CsvParser::new().parse_str(csv).unwrap();
        assert_eq!(df.row_count(), 2);
        let note = df.column_by_name("note").unwrap();
        assert_eq!(note.text_at(0), Some("line one\nline two"));
    }

    #[test]
    fn parse_crlf_and_cr_line_endings() {
        let crlf = CsvParser::new().parse_str("a,b\r\n1,2\r\n3,4\r\n").unwrap();
        assert_eq!(crlf.row_count(), 2);
        assert_eq!(crlf.column_by_name("b").unwrap().as_numeric().unwrap(), &[2.0, 4.0]);

        let cr = CsvParser::new().parse_str("a,b\r1,2\r3,4").unwrap();
        assert_eq!(cr.row_count(), 2);
    }

    #[test]
    fn parse_no_trailing_newline() {
        let df = CsvParser::new().parse_str("a\n1\n2").unwrap();
        assert_eq!(df.row_count(), 2);
    }

    #[test]
    fn parse_bom() {
        let df = CsvParser::new().parse_str("\u{feff}x\n1\n").unwrap();
        assert_eq!(df.column_names(), &["x"]);
    }

    #[test]
    fn parse_tab_delimiter() {
        let df = CsvParser::new()
            .delimiter(b'\t')
            .parse_str("a\tb\n1\t2\n")
            .unwrap();
        assert_eq!(df.column_count(), 2);
    }

    #[test]
    fn parse_without_header() {
        let df = CsvParser::new()
            .has_header(false)
            .parse_str("1,2\n3,4\n")
            .unwrap();
        assert_eq!(df.row_count(), 2);
        assert_eq!(df.column_names(), &["col_0", "col_1"]);
    }

    // ── Shapes and failures ──────────────────────────────────────

    #[test]
    fn parse_header_only() {
        let df = CsvParser::new().parse_str("a,b\n").unwrap();
        assert_eq!(df.row_count(), 0);
        assert_eq!(df.column_count(), 2);
    }

    #[test]
    fn parse_empty_input_fails() {
        let err = CsvParser::new().parse_str("").unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { line: None, .. }));

        let err = CsvParser::new().parse_str("\n\n").unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { .. }));
    }

    #[test]
    fn parse_column_count_mismatch_error() {
        let err = CsvParser::new().parse_str("a,b\n1,2\n3\n").unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::Parse {
                format: "CSV",
                line: Some(3),
                reason: "expected 2 fields, got 1".into(),
            }
        );
    }

    #[test]
    fn mismatch_line_accounts_for_quoted_newlines() {
        let csv = "a,b\n\"x\ny\",1\n1,2,3\n";
        let err = CsvParser::new().parse_str(csv).unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { line: Some(4), .. }));
    }

    #[test]
    fn unterminated_quote_fails() {
        let err = CsvParser::new().parse_str("a\n\"open\n").unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { line: Some(2), .. }));
    }

    #[test]
    fn invalid_utf8_fails() {
        let err = CsvParser::new().parse_bytes(&[b'a', b'\n', 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { format: "CSV", .. }));
    }

    #[test]
    fn duplicate_and_blank_headers_are_renamed() {
        let df = CsvParser::new().parse_str("a,a,\n1,2,3\n").unwrap();
        assert_eq!(df.column_names(), &["a", "a.1", "Unnamed: 2"]);
    }
}
