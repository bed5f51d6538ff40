//! Descriptive statistics over the numeric columns of a table.
//!
//! Everything here tolerates missing data: means and medians are taken
//! over present values only, and correlations over pairwise-complete
//! observations. Text columns are ignored.
//!
//! The resulting [`TableStatistics`] is a frozen snapshot. Cleaning reads
//! its means for imputation but cannot change it, so the numbers reported
//! to the caller are exactly the numbers used to fill gaps.
//!
//! # Example
//!
//! ```
//! use data_analyzer::csv_parser::CsvParser;
//! use data_analyzer::statistics::compute_statistics;
//!
//! let df = CsvParser::new().parse_str("x,y\n1,2\n2,4\n3,\n").unwrap();
//! let stats = compute_statistics(&df);
//!
//! assert_eq!(stats.mean["x"], 2.0);
//! assert_eq!(stats.median["y"], 3.0);
//! assert_eq!(stats.correlation["x"]["y"], Some(1.0));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataframe::{Column, DataFrame};

/// Numeric-column name to a scalar statistic.
///
/// Columns whose statistic is undefined (no present values) are absent.
pub type ColumnStat = BTreeMap<String, f64>;

/// Numeric-column name to numeric-column name to Pearson coefficient.
///
/// `None` marks an undefined coefficient and serializes as `null`.
pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, Option<f64>>>;

/// Number of decimal places kept for correlation coefficients.
pub const CORRELATION_DECIMALS: i32 = 3;

/// Minimum number of jointly present observations for a coefficient.
const MIN_PAIRED_OBSERVATIONS: usize = 2;

// ── TableStatistics ───────────────────────────────────────────────────

/// Statistics computed from a table before any cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatistics {
    /// Mean per numeric column, over present values.
    pub mean: ColumnStat,
    /// Median per numeric column, over present values.
    pub median: ColumnStat,
    /// Pairwise-complete Pearson correlation, rounded.
    pub correlation: CorrelationMatrix,
    /// Shape of the table these statistics describe.
    #[serde(skip)]
    pub(crate) source: SourceShape,
}

/// Row count and numeric column names of the table a snapshot was taken from.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SourceShape {
    pub(crate) row_count: usize,
    pub(crate) numeric_columns: Vec<String>,
}

impl SourceShape {
    pub(crate) fn of(df: &DataFrame) -> Self {
        Self {
            row_count: df.row_count(),
            numeric_columns: df.numeric_columns().map(|(n, _)| n.to_string()).collect(),
        }
    }
}

/// Computes mean, median and correlation for every numeric column.
pub fn compute_statistics(df: &DataFrame) -> TableStatistics {
    let mut mean = ColumnStat::new();
    let mut median = ColumnStat::new();

    for (name, col) in df.numeric_columns() {
        if let Some(m) = column_mean(col) {
            mean.insert(name.to_string(), m);
        }
        if let Some(m) = column_median(col) {
            median.insert(name.to_string(), m);
        }
    }

    let correlation = correlation_matrix(df);

    debug!(
        numeric_columns = correlation.len(),
        defined_means = mean.len(),
        "statistics computed"
    );

    TableStatistics {
        mean,
        median,
        correlation,
        source: SourceShape::of(df),
    }
}

// ── Per-column statistics ─────────────────────────────────────────────

/// Arithmetic mean of the present values, `None` when undefined.
pub fn column_mean(col: &Column) -> Option<f64> {
    let valid = col.valid_numeric_values()?;
    if valid.is_empty() {
        return None;
    }
    finite(u_numflow::stats::mean(&valid).unwrap_or(f64::NAN))
}

/// Median of the present values, `None` when undefined.
///
/// Even counts average the two central values.
pub fn column_median(col: &Column) -> Option<f64> {
    let valid = col.valid_numeric_values()?;
    if valid.is_empty() {
        return None;
    }
    finite(u_numflow::stats::median(&valid).unwrap_or(f64::NAN))
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

// ── Correlation ───────────────────────────────────────────────────────

/// Builds the full symmetric correlation matrix over numeric columns.
pub fn correlation_matrix(df: &DataFrame) -> CorrelationMatrix {
    let numeric: Vec<(&str, &Column)> = df.numeric_columns().collect();
    let mut matrix = CorrelationMatrix::new();

    for (i, (name_a, col_a)) in numeric.iter().enumerate() {
        for (name_b, col_b) in numeric.iter().skip(i) {
            let r = pairwise_pearson(col_a, col_b).map(round_coefficient);
            matrix
                .entry(name_a.to_string())
                .or_default()
                .insert(name_b.to_string(), r);
            matrix
                .entry(name_b.to_string())
                .or_default()
                .insert(name_a.to_string(), r);
        }
    }

    matrix
}

/// Pearson correlation over rows where both columns are present.
///
/// Returns `None` with fewer than two joint observations or when either
/// side has zero variance over those rows.
pub fn pairwise_pearson(a: &Column, b: &Column) -> Option<f64> {
    let n_rows = a.len().min(b.len());
    let pairs: Vec<(f64, f64)> = (0..n_rows)
        .filter_map(|i| Some((a.numeric_at(i)?, b.numeric_at(i)?)))
        .collect();

    if pairs.len() < MIN_PAIRED_OBSERVATIONS {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Rounds a coefficient to [`CORRELATION_DECIMALS`] places.
pub fn round_coefficient(r: f64) -> f64 {
    let scale = 10f64.powi(CORRELATION_DECIMALS);
    // adding 0.0 turns -0.0 into 0.0
    (r * scale).round() / scale + 0.0
}

// ── Tests ─────────────────────────────────────────────────────────────
