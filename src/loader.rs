//! Tabular loader: raw upload bytes to a typed [`DataFrame`].
//!
//! The format is decided before any parsing, either from a declared tag
//! ([`FileFormat::from_str`]) or from the uploaded filename
//! ([`FileFormat::from_filename`]). Both CSV and spreadsheet input are
//! reduced to column-major [`Cell`]s and typed by [`build_frame`], so the
//! numeric/text rule is identical for every format.
//!
//! ```
//! use data_analyzer::loader::{load_table, FileFormat};
//!
//! let format = FileFormat::from_filename("sales.CSV").unwrap();
//! let df = load_table(b"price,qty\n10,2\n20,\n", format).unwrap();
//! assert_eq!(df.row_count(), 2);
//!
//! assert!(FileFormat::from_filename("notes.txt").is_err());
//! ```

use std::collections::HashSet;
use std::str::FromStr;

use tracing::debug;

use crate::csv_parser::CsvParser;
use crate::dataframe::{Column, DataFrame, ValidityBitmap};
use crate::error::AnalyzerError;
use crate::spreadsheet;

// ── FileFormat ────────────────────────────────────────────────────────

/// Upload formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values.
    Csv,
    /// Excel workbook (`.xlsx` or legacy `.xls`).
    Spreadsheet,
}

impl FileFormat {
    /// Picks the format from a filename's extension (case-insensitive).
    ///
    /// Anything other than `.csv`, `.xlsx` or `.xls` is rejected with
    /// [`AnalyzerError::UnsupportedFormat`].
    pub fn from_filename(filename: &str) -> Result<Self, AnalyzerError> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" => Ok(Self::Spreadsheet),
            _ => Err(AnalyzerError::UnsupportedFormat {
                format: if ext.is_empty() {
                    filename.to_string()
                } else {
                    ext
                },
            }),
        }
    }

    /// Short type label stored alongside the upload (`csv` or `xlsx`).
    pub fn file_type(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Spreadsheet => "xlsx",
        }
    }
}

impl FromStr for FileFormat {
    type Err = AnalyzerError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "spreadsheet" | "xlsx" | "xls" => Ok(Self::Spreadsheet),
            other => Err(AnalyzerError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────

/// Parses `bytes` in the given format into a typed table.
pub fn load_table(bytes: &[u8], format: FileFormat) -> Result<DataFrame, AnalyzerError> {
    let df = match format {
        FileFormat::Csv => CsvParser::new().parse_bytes(bytes)?,
        FileFormat::Spreadsheet => spreadsheet::parse_bytes(bytes)?,
    };
    debug!(
        %format,
        rows = df.row_count(),
        columns = df.column_count(),
        "table loaded"
    );
    Ok(df)
}

// ── Column typing ─────────────────────────────────────────────────────

/// A single untyped cell as read from the source format.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    /// Empty cell or a null marker.
    Missing,
    /// A native number (spreadsheet numeric cell).
    Number(f64),
    /// Textual content, which may still parse as a number.
    Text(String),
}

impl Cell {
    /// Any NaN spelling that survived null-marker matching (`Nan`, `-nan`,
    /// `+NaN`) is a missing cell, not a present value.
    fn without_nan(self) -> Self {
        match self.as_number() {
            Some(v) if v.is_nan() => Self::Missing,
            _ => self,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.parse::<f64>().ok(),
            Self::Missing => None,
        }
    }
}

/// Builds a table from header names and column-major cells.
///
/// Header names are made unique first. Each column becomes numeric when
/// every non-missing cell is a number (a column with no present cells is
/// numeric too), and text otherwise.
pub(crate) fn build_frame(
    headers: Vec<String>,
    columns: Vec<Vec<Cell>>,
) -> Result<DataFrame, AnalyzerError> {
    let mut df = DataFrame::new();
    for (name, cells) in normalize_headers(headers).into_iter().zip(columns) {
        df.add_column(name, build_column(cells))?;
    }
    Ok(df)
}

fn build_column(cells: Vec<Cell>) -> Column {
    let cells: Vec<Cell> = cells.into_iter().map(Cell::without_nan).collect();
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            Cell::Missing => Some(None),
            other => other.as_number().map(Some),
        })
        .collect();

    if let Some(numbers) = numbers {
        return Column::from_options(&numbers);
    }

    let mut texts = Vec::with_capacity(cells.len());
    let mut validity = ValidityBitmap::empty();
    for cell in cells {
        match cell {
            Cell::Missing => {
                texts.push(String::new());
                validity.push(false);
            }
            Cell::Number(v) => {
                texts.push(v.to_string());
                validity.push(true);
            }
            Cell::Text(s) => {
                texts.push(s);
                validity.push(true);
            }
        }
    }
    Column::text(texts, validity)
}

/// Fills blank header names with `Unnamed: {index}` and suffixes repeats
/// with `.1`, `.2`, ... so every name is unique.
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());

    for (idx, raw) in headers.into_iter().enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }

    out
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::DataType;

    #[test]
    fn format_from_filename() {
        assert_eq!(FileFormat::from_filename("a.csv").unwrap(), FileFormat::Csv);
        assert_eq!(
            FileFormat::from_filename("Report.XLSX").unwrap(),
            FileFormat::Spreadsheet
        );
        assert_eq!(
            FileFormat::from_filename("old.xls").unwrap(),
            FileFormat::Spreadsheet
        );
    }

    #[test]
    fn txt_extension_rejected() {
        let err = FileFormat::from_filename("notes.txt").unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::UnsupportedFormat {
                format: "txt".into()
            }
        );
    }

    #[test]
    fn missing_extension_rejected() {
        assert!(matches!(
            FileFormat::from_filename("README"),
            Err(AnalyzerError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn format_from_tag() {
        assert_eq!("csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!(
            "Spreadsheet".parse::<FileFormat>().unwrap(),
            FileFormat::Spreadsheet
        );
        assert!(matches!(
            "parquet".parse::<FileFormat>(),
            Err(AnalyzerError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn file_type_labels() {
        assert_eq!(FileFormat::Csv.file_type(), "csv");
        assert_eq!(FileFormat::Spreadsheet.file_type(), "xlsx");
    }

    #[test]
    fn load_csv_bytes() {
        let df = load_table(b"a,b\n1,x\n2,y\n", FileFormat::Csv).unwrap();
        assert_eq!(
            df.schema(),
            vec![("a", DataType::Numeric), ("b", DataType::Text)]
        );
    }

    #[test]
    fn garbage_spreadsheet_is_parse_error() {
        let err = load_table(b"definitely not a workbook", FileFormat::Spreadsheet).unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { .. }));
    }

    #[test]
    fn build_column_mixes_native_and_text_numbers() {
        let col = build_column(vec![
            Cell::Number(1.5),
            Cell::Text("2".into()),
            Cell::Missing,
        ]);
        assert_eq!(col.data_type(), DataType::Numeric);
        assert_eq!(col.valid_numeric_values(), Some(vec![1.5, 2.0]));
    }

    #[test]
    fn build_column_text_keeps_numbers_as_strings() {
        let col = build_column(vec![Cell::Number(3.0), Cell::Text("abc".into())]);
        assert_eq!(col.data_type(), DataType::Text);
        assert_eq!(col.text_at(0), Some("3"));
    }

    #[test]
    fn nan_spellings_are_missing() {
        let df = load_table(b"v,w\nNan,1\n2,2\n-nan,\n+NaN,3\n4,4\n", FileFormat::Csv).unwrap();
        let v = df.column_by_name("v").unwrap();
        assert_eq!(v.data_type(), DataType::Numeric);
        assert_eq!(v.null_count(), 3);
        assert_eq!(v.valid_numeric_values(), Some(vec![2.0, 4.0]));
    }

    #[test]
    fn nan_text_in_text_column_is_missing() {
        let col = build_column(vec![Cell::Text("abc".into()), Cell::Text("-nan".into())]);
        assert_eq!(col.data_type(), DataType::Text);
        assert!(!col.is_valid(1));
    }

    #[test]
    fn normalize_headers_unique() {
        let names = normalize_headers(vec![
            "x".into(),
            " ".into(),
            "x".into(),
            "x.1".into(),
            "x".into(),
        ]);
        assert_eq!(names, vec!["x", "Unnamed: 1", "x.1", "x.1.1", "x.2"]);
    }
}
