//! Row deduplication and mean imputation.
//!
//! Cleaning runs after [`compute_statistics`](crate::statistics::compute_statistics)
//! and consumes its snapshot:
//!
//! 1. Rows identical to an earlier row (missing matches missing) are dropped,
//!    keeping the first occurrence.
//! 2. In the remaining rows, missing numeric cells are filled with the
//!    column mean from the snapshot. Columns without a defined mean keep
//!    their gaps.
//!
//! # Example
//!
//! ```
//! use data_analyzer::cleaning::clean;
//! use data_analyzer::csv_parser::CsvParser;
//! use data_analyzer::statistics::compute_statistics;
//!
//! let mut df = CsvParser::new().parse_str("price,qty\n10,2\n10,2\n20,\n").unwrap();
//! let stats = compute_statistics(&df);
//! let report = clean(&mut df, &stats).unwrap();
//!
//! assert_eq!(report.duplicates_removed, 1);
//! assert_eq!(report.missing_filled, 1);
//! assert_eq!(df.column_by_name("qty").unwrap().numeric_at(1), Some(2.0));
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataframe::{Column, DataFrame};
use crate::error::AnalyzerError;
use crate::statistics::{SourceShape, TableStatistics};

/// Counts of what cleaning changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Rows eliminated because an identical row appeared earlier.
    pub duplicates_removed: usize,
    /// Missing numeric cells replaced with the column mean.
    pub missing_filled: usize,
}

/// Deduplicates `df` and imputes missing numeric cells from `stats`.
///
/// `stats` must have been computed from this very table, before any
/// cleaning; otherwise [`AnalyzerError::PreconditionViolation`] is
/// returned and the table is left untouched.
pub fn clean(df: &mut DataFrame, stats: &TableStatistics) -> Result<CleaningReport, AnalyzerError> {
    let shape = SourceShape::of(df);
    if shape != stats.source {
        return Err(AnalyzerError::PreconditionViolation {
            reason: format!(
                "statistics describe {} rows / numeric columns {:?}, table has {} rows / {:?}",
                stats.source.row_count,
                stats.source.numeric_columns,
                shape.row_count,
                shape.numeric_columns
            ),
        });
    }

    let duplicates_removed = drop_duplicate_rows(df)?;
    let missing_filled = fill_missing_with_means(df, stats);

    let report = CleaningReport {
        duplicates_removed,
        missing_filled,
    };
    debug!(
        duplicates_removed,
        missing_filled,
        remaining_rows = df.row_count(),
        "table cleaned"
    );
    Ok(report)
}

// ── Deduplication ─────────────────────────────────────────────────────

/// Removes rows identical to an earlier row. Returns the number removed.
///
/// Running it again on the result removes nothing.
pub fn drop_duplicate_rows(df: &mut DataFrame) -> Result<usize, AnalyzerError> {
    let n = df.row_count();
    if n <= 1 {
        return Ok(0);
    }

    let keep: Vec<bool> = {
        let cols: Vec<&Column> = df.iter().map(|(_, col)| col).collect();
        let mut seen = HashSet::with_capacity(n);
        (0..n).map(|row| seen.insert(row_key(&cols, row))).collect()
    };

    if keep.iter().all(|&k| k) {
        return Ok(0);
    }
    df.retain_rows(&keep)
}

/// One cell of a row key. Missing cells compare equal to each other and
/// to nothing else.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Missing,
    Number(u64),
    Text(&'a str),
}

/// Structured key for a row, suitable for hash-based duplicate detection.
fn row_key<'a>(cols: &[&'a Column], row_idx: usize) -> Vec<CellKey<'a>> {
    cols.iter()
        .map(|col| {
            if !col.is_valid(row_idx) {
                return CellKey::Missing;
            }
            match *col {
                // exact bits, with -0.0 folded into 0.0
                Column::Numeric { values, .. } => {
                    CellKey::Number((values[row_idx] + 0.0).to_bits())
                }
                Column::Text { values, .. } => CellKey::Text(&values[row_idx]),
            }
        })
        .collect()
}

// ── Imputation ────────────────────────────────────────────────────────

/// Fills missing numeric cells with the snapshot means.
///
/// Returns the number of cells filled. Columns absent from `stats.mean`
/// are skipped and their gaps are not counted.
fn fill_missing_with_means(df: &mut DataFrame, stats: &TableStatistics) -> usize {
    let mut filled = 0;
    for (name, col) in df.iter_mut() {
        if let Some(&mean) = stats.mean.get(name) {
            filled += col.fill_missing(mean);
        }
    }
    filled
}

// ── Tests ─────────────────────────────────────────────────────────────
