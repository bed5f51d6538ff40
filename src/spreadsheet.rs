//! Excel workbook reading via `calamine`.
//!
//! Only the first worksheet is read, and its first row is the header.
//! Numeric cells stay numbers; empty and error cells (`#N/A`, `#DIV/0!`)
//! are missing; strings go through the same null markers as CSV.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use crate::csv_parser::DEFAULT_NULL_MARKERS;
use crate::dataframe::DataFrame;
use crate::error::AnalyzerError;
use crate::loader::{build_frame, Cell};

const FORMAT: &str = "spreadsheet";

/// Parses an `.xlsx` / `.xls` workbook held in memory.
pub fn parse_bytes(bytes: &[u8]) -> Result<DataFrame, AnalyzerError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AnalyzerError::parse(FORMAT, format!("cannot open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalyzerError::parse(FORMAT, "workbook has no worksheets"))?
        .map_err(|e| AnalyzerError::parse(FORMAT, format!("cannot read first worksheet: {e}")))?;

    range_to_frame(&range)
}

/// Converts a worksheet range into a typed table.
pub(crate) fn range_to_frame(range: &Range<Data>) -> Result<DataFrame, AnalyzerError> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AnalyzerError::parse(FORMAT, "no columns to parse from worksheet"))?;

    let headers: Vec<String> = header.iter().map(header_text).collect();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(range.height()); headers.len()];

    for row in rows {
        for (col_idx, data) in row.iter().enumerate().take(headers.len()) {
            columns[col_idx].push(to_cell(data));
        }
    }

    build_frame(headers, columns)
}

fn header_text(data: &Data) -> String {
    match data {
        Data::Empty | Data::Error(_) => String::new(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Float(v) if v.is_nan() => Cell::Missing,
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::String(s) => {
            let trimmed = s.trim();
            if DEFAULT_NULL_MARKERS.contains(&trimmed) {
                Cell::Missing
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
        Data::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
