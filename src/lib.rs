//! # data-analyzer
//!
//! Tabular file analysis: load a CSV or Excel upload, summarize its
//! numeric columns, clean it, and persist the summary under an id.
//!
//! Statistics are always taken from the table as loaded, before cleaning.
//! Cleaning then removes duplicate rows and fills missing numeric cells
//! with those pre-clean means, so the reported means are exactly the
//! values that were imputed.
//!
//! ## Modules
//!
//! - [`dataframe`] - Column-major table with per-column validity bitmaps
//! - [`csv_parser`] - RFC 4180 CSV reader with null-marker detection
//! - [`spreadsheet`] - First worksheet of an `.xlsx`/`.xls` workbook
//! - [`loader`] - Format detection and column typing
//! - [`statistics`] - Mean, median, pairwise Pearson correlation
//! - [`cleaning`] - Duplicate removal and mean imputation
//! - [`summary`] - Analysis summary and stored record types
//! - [`store`] - Result store trait with memory and JSON-file backends
//! - [`pipeline`] - Load, summarize, clean, persist
//! - [`uploads`] - Raw upload directory
//! - [`server`] - HTTP endpoints
//! - [`config`] - TOML configuration
//! - [`error`] - Error types
//!
//! ## Quick Start
//!
//! ```
//! use data_analyzer::loader::FileFormat;
//! use data_analyzer::pipeline::analyze;
//!
//! let csv = b"price,qty\n10,2\n10,2\n20,\n";
//! let analysis = analyze(csv, FileFormat::Csv).unwrap();
//!
//! assert_eq!(analysis.summary.duplicates_removed, 1);
//! assert_eq!(analysis.summary.missing_filled, 1);
//! assert_eq!(analysis.summary.median["price"], 10.0);
//! assert_eq!(analysis.cleaned.row_count(), 2);
//! ```

pub mod cleaning;
pub mod config;
pub mod csv_parser;
pub mod dataframe;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod server;
pub mod spreadsheet;
pub mod statistics;
pub mod store;
pub mod summary;
pub mod uploads;
