//! Column-major table for uploaded tabular data.
//!
//! The [`DataFrame`] stores data in column-major order with typed columns
//! and a compact validity bitmap for tracking missing values. Columns are
//! either numeric or text; nothing finer is inferred.
//!
//! | Type | Storage | Use case |
//! |------|---------|----------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | Values that all parse as numbers |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | Everything else |
//!
//! # Example
//!
//! ```
//! use data_analyzer::dataframe::{DataFrame, Column, ValidityBitmap};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "price".to_string(),
//!     Column::numeric(vec![10.0, 20.0, 0.0], ValidityBitmap::from_flags(&[true, true, false])),
//! ).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.total_null_count(), 1);
//! ```

use crate::error::AnalyzerError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row is present (1) or
/// missing (0).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates a bitmap where all `len` positions are missing.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Creates a bitmap from per-row presence flags.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut bm = Self::empty();
        for &valid in flags {
            bm.push(valid);
        }
        bm
    }

    /// Returns `true` if the value at `idx` is present.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        (self.bits[word] >> bit) & 1 == 1
    }

    /// Marks position `idx` as present.
    #[inline]
    pub fn set_valid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        self.bits[word] |= 1u64 << bit;
    }

    /// Marks position `idx` as missing.
    #[inline]
    pub fn set_invalid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        let (word, bit) = (idx / 64, idx % 64);
        self.bits[word] &= !(1u64 << bit);
    }

    /// Appends a new position (present or missing).
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        let (word, bit) = (idx / 64, idx % 64);
        if word >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[word] |= 1u64 << bit;
        }
    }

    /// Returns the total number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks zero positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the number of missing positions.
    pub fn null_count(&self) -> usize {
        let valid_count: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid_count
    }

    /// Counts the number of present positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.null_count()
    }

    /// Returns an iterator over indices of present positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.is_valid(i))
    }

    /// Returns an iterator over indices of missing positions.
    pub fn null_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| !self.is_valid(i))
    }

    /// Keeps only the positions whose `keep` flag is set, preserving order.
    fn retain(&mut self, keep: &[bool]) {
        let kept: Vec<bool> = (0..self.len)
            .filter(|&i| keep[i])
            .map(|i| self.is_valid(i))
            .collect();
        *self = Self::from_flags(&kept);
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Kind inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Every present cell parsed as a number (stored as `f64`).
    Numeric,
    /// At least one present cell is not a number.
    Text,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Text => write!(f, "Text"),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with validity bitmap for missing values.
///
/// Missing positions hold a placeholder (`0.0` or an empty string) that
/// must be ignored; only the bitmap says whether a cell is present.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values. Missing positions hold `0.0`.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Free-form text. Missing positions hold an empty string.
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates a numeric column.
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    /// Creates a text column.
    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Creates a numeric column from optional values (`None` = missing).
    pub fn from_options(cells: &[Option<f64>]) -> Self {
        let values = cells.iter().map(|c| c.unwrap_or(0.0)).collect();
        let flags: Vec<bool> = cells.iter().map(Option::is_some).collect();
        Self::numeric(values, ValidityBitmap::from_flags(&flags))
    }

    /// Returns the data type of this column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Numeric { .. } => DataType::Numeric,
            Self::Text { .. } => DataType::Text,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. } | Self::Text { validity, .. } => validity,
        }
    }

    /// Returns the number of missing values.
    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    /// Returns the number of present values.
    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    /// Returns `true` if the value at `idx` is present.
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the raw numeric values, or `None` if not a numeric column.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric { values, .. } => Some(values),
            Self::Text { .. } => None,
        }
    }

    /// Returns the numeric value at `idx`, or `None` if missing or not numeric.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } if validity.is_valid(idx) => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns present numeric values (missing excluded) as a new `Vec<f64>`.
    pub fn valid_numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric { values, validity } => {
                Some(validity.valid_indices().map(|i| values[i]).collect())
            }
            Self::Text { .. } => None,
        }
    }

    /// Returns the text value at `idx`, or `None` if missing or not text.
    pub fn text_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Text { values, validity } if validity.is_valid(idx) => Some(&values[idx]),
            _ => None,
        }
    }

    /// Replaces every missing cell of a numeric column with `value`.
    ///
    /// Returns the number of cells filled. Text columns are left untouched
    /// and report zero.
    pub fn fill_missing(&mut self, value: f64) -> usize {
        match self {
            Self::Numeric { values, validity } => {
                let missing: Vec<usize> = validity.null_indices().collect();
                for &i in &missing {
                    values[i] = value;
                    validity.set_valid(i);
                }
                missing.len()
            }
            Self::Text { .. } => 0,
        }
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        match self {
            Self::Numeric { values, validity } => {
                retain_by_flags(values, keep);
                validity.retain(keep);
            }
            Self::Text { values, validity } => {
                retain_by_flags(values, keep);
                validity.retain(keep);
            }
        }
    }
}

fn retain_by_flags<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(false));
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// Stores named columns of typed data. All columns have the same number
/// of rows; names and order are fixed once columns are added.
///
/// # Example
///
/// ```
/// use data_analyzer::dataframe::{DataFrame, Column, ValidityBitmap};
///
/// let mut df = DataFrame::new();
/// df.add_column(
///     "x".to_string(),
///     Column::numeric(vec![1.0, 2.0, 3.0], ValidityBitmap::all_valid(3)),
/// ).unwrap();
/// df.add_column(
///     "label".to_string(),
///     Column::text(
///         vec!["a".into(), "b".into(), "c".into()],
///         ValidityBitmap::all_valid(3),
///     ),
/// ).unwrap();
/// assert_eq!(df.row_count(), 3);
/// assert_eq!(df.column_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named column to the DataFrame.
    ///
    /// Fails if the column length doesn't match the existing row count
    /// (unless this is the first column) or the name is already taken.
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), AnalyzerError> {
        if self.names.contains(&name) {
            return Err(AnalyzerError::PreconditionViolation {
                reason: format!("duplicate column name '{name}'"),
            });
        }
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(AnalyzerError::PreconditionViolation {
                reason: format!(
                    "column '{name}' has {col_len} rows, table has {}",
                    self.row_count
                ),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns a reference to the column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns a reference to the column with the given `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Returns the index of the column with the given `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }

    /// Returns an iterator over (name, column) pairs with mutable columns.
    ///
    /// Columns can be edited in place but not resized; use
    /// [`retain_rows`](Self::retain_rows) to drop rows.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Column)> {
        self.names
            .iter()
            .map(|s| s.as_str())
            .zip(self.columns.iter_mut())
    }

    /// Returns an iterator over the numeric columns only.
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.iter()
            .filter(|(_, col)| col.data_type() == DataType::Numeric)
    }

    /// Returns a summary of column data types.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.iter().map(|(name, col)| (name, col.data_type())).collect()
    }

    /// Returns the total number of missing values across all columns.
    pub fn total_null_count(&self) -> usize {
        self.columns.iter().map(|c| c.null_count()).sum()
    }

    /// Returns the number of missing cells in numeric columns.
    pub fn numeric_null_count(&self) -> usize {
        self.numeric_columns().map(|(_, c)| c.null_count()).sum()
    }

    /// Keeps only rows whose `keep` flag is set, in their original order.
    ///
    /// Returns the number of rows removed.
    pub fn retain_rows(&mut self, keep: &[bool]) -> Result<usize, AnalyzerError> {
        if keep.len() != self.row_count {
            return Err(AnalyzerError::PreconditionViolation {
                reason: format!(
                    "row mask has {} entries, table has {} rows",
                    keep.len(),
                    self.row_count
                ),
            });
        }
        for col in &mut self.columns {
            col.retain_rows(keep);
        }
        let kept = keep.iter().filter(|&&k| k).count();
        let removed = self.row_count - kept;
        self.row_count = kept;
        Ok(removed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
