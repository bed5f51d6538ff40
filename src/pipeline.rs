//! Analysis orchestrator.
//!
//! Runs one upload through Load → Statistics → Clean → persist:
//!
//! 1. [`load_table`] parses the bytes. Failures return immediately and the
//!    store is never touched.
//! 2. [`compute_statistics`] takes the pre-clean snapshot.
//! 3. [`clean`] deduplicates and imputes using that snapshot.
//! 4. The [`AnalysisSummary`] is handed to the [`ResultStore`]. A store
//!    failure discards the summary and surfaces as
//!    [`AnalyzerError::StorageUnavailable`].
//!
//! The cleaned table is dropped once the summary exists; only
//! [`analyze`] returns it, for library callers that want the data.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use data_analyzer::pipeline::{Analyzer, UploadRequest};
//! use data_analyzer::store::MemoryStore;
//!
//! let analyzer = Analyzer::new(Arc::new(MemoryStore::new()));
//! let upload = UploadRequest::new("prices.csv", "0123abcd.csv", b"price,qty\n10,2\n10,2\n20,\n").unwrap();
//! let processed = analyzer.process(&upload).unwrap();
//!
//! let stored = analyzer.fetch(processed.file_id).unwrap();
//! assert_eq!(stored.summary.duplicates_removed, 1);
//! assert_eq!(stored.summary.missing_filled, 1);
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::cleaning::clean;
use crate::dataframe::DataFrame;
use crate::error::AnalyzerError;
use crate::loader::{load_table, FileFormat};
use crate::statistics::compute_statistics;
use crate::store::ResultStore;
use crate::summary::{AnalysisSummary, FileId, NewAnalysis, StoredAnalysis, UploadMeta};

// ── Pure analysis ─────────────────────────────────────────────────────

/// Summary plus the cleaned table it was derived from.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub summary: AnalysisSummary,
    pub cleaned: DataFrame,
}

/// Loads, summarizes and cleans `bytes` without persisting anything.
pub fn analyze(bytes: &[u8], format: FileFormat) -> Result<Analysis, AnalyzerError> {
    let mut table = load_table(bytes, format)?;
    let stats = compute_statistics(&table);
    let report = clean(&mut table, &stats)?;
    Ok(Analysis {
        summary: AnalysisSummary::new(stats, report),
        cleaned: table,
    })
}

// ── Upload requests ───────────────────────────────────────────────────

/// One uploaded file, with its format already decided.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub original_name: &'a str,
    pub stored_name: &'a str,
    pub format: FileFormat,
    pub bytes: &'a [u8],
}

impl<'a> UploadRequest<'a> {
    /// Builds a request, deciding the format from `original_name`.
    ///
    /// Unsupported extensions fail here, before any parsing.
    pub fn new(
        original_name: &'a str,
        stored_name: &'a str,
        bytes: &'a [u8],
    ) -> Result<Self, AnalyzerError> {
        Ok(Self {
            original_name,
            stored_name,
            format: FileFormat::from_filename(original_name)?,
            bytes,
        })
    }
}

/// Outcome of a successfully processed and persisted upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedUpload {
    pub file_id: FileId,
    pub summary: AnalysisSummary,
    /// Rows left in the table after deduplication.
    pub rows_after_cleaning: usize,
}

// ── Analyzer ──────────────────────────────────────────────────────────

/// Orchestrates analyses against an explicitly supplied result store.
#[derive(Clone)]
pub struct Analyzer {
    store: Arc<dyn ResultStore>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").finish_non_exhaustive()
    }
}

impl Analyzer {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// Analyzes one upload and persists its summary.
    pub fn process(&self, upload: &UploadRequest<'_>) -> Result<ProcessedUpload, AnalyzerError> {
        let uploaded_at = Utc::now();
        let Analysis { summary, cleaned } = analyze(upload.bytes, upload.format)?;
        let rows_after_cleaning = cleaned.row_count();
        drop(cleaned);

        let record = NewAnalysis {
            upload: UploadMeta {
                original_name: upload.original_name.to_string(),
                stored_name: upload.stored_name.to_string(),
                file_type: upload.format.file_type().to_string(),
                size: upload.bytes.len() as u64,
                uploaded_at,
            },
            summary: summary.clone(),
            analyzed_at: Utc::now(),
        };

        let file_id = self.store.save(record).map_err(|e| {
            warn!(file = upload.original_name, error = %e, "result store rejected analysis");
            AnalyzerError::StorageUnavailable {
                reason: e.to_string(),
            }
        })?;

        info!(
            %file_id,
            file = upload.original_name,
            duplicates_removed = summary.duplicates_removed,
            missing_filled = summary.missing_filled,
            "analysis stored"
        );

        Ok(ProcessedUpload {
            file_id,
            summary,
            rows_after_cleaning,
        })
    }

    /// Returns the stored record for `file_id`.
    pub fn fetch(&self, file_id: FileId) -> Result<StoredAnalysis, AnalyzerError> {
        self.store
            .load(file_id)
            .map_err(|e| {
                warn!(%file_id, error = %e, "result store lookup failed");
                AnalyzerError::StorageUnavailable {
                    reason: e.to_string(),
                }
            })?
            .ok_or(AnalyzerError::NotFound { file_id: file_id.0 })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts calls and can be told to fail.
    #[derive(Default)]
    struct FakeStore {
        fail: bool,
        saves: AtomicUsize,
        inner: MemoryStore,
    }

    impl ResultStore for FakeStore {
        fn save(&self, record: NewAnalysis) -> Result<FileId, StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Unavailable("database is down".into()));
            }
            self.inner.save(record)
        }

        fn load(&self, id: FileId) -> Result<Option<StoredAnalysis>, StoreError> {
            if self.fail {
                return Err(StoreError::Unavailable("database is down".into()));
            }
            self.inner.load(id)
        }
    }

    const PRICE_QTY: &[u8] = b"price,qty\n10,2\n10,2\n20,\n";

    #[test]
    fn price_qty_end_to_end() {
        let analyzer = Analyzer::new(Arc::new(MemoryStore::new()));
        let upload = UploadRequest::new("p.csv", "x.csv", PRICE_QTY).unwrap();
        let processed = analyzer.process(&upload).unwrap();

        assert_eq!(processed.rows_after_cleaning, 2);
        let s = &processed.summary;
        assert_eq!(s.duplicates_removed, 1);
        assert_eq!(s.missing_filled, 1);
        // pre-clean statistics: price over {10, 10, 20}, qty over {2, 2}
        assert!((s.mean["price"] - 40.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.median["price"], 10.0);
        assert_eq!(s.mean["qty"], 2.0);
        assert_eq!(s.correlation["qty"]["qty"], None);
        assert_eq!(s.correlation["price"]["price"], Some(1.0));

        let stored = analyzer.fetch(processed.file_id).unwrap();
        assert_eq!(stored.summary, processed.summary);
        assert_eq!(stored.upload.file_type, "csv");
        assert_eq!(stored.upload.size, PRICE_QTY.len() as u64);
        assert_eq!(stored.upload.stored_name, "x.csv");
    }

    #[test]
    fn analyze_returns_cleaned_table() {
        let analysis = analyze(PRICE_QTY, FileFormat::Csv).unwrap();
        let qty = analysis.cleaned.column_by_name("qty").unwrap();
        assert_eq!(qty.as_numeric().unwrap(), &[2.0, 2.0]);
        assert_eq!(analysis.cleaned.total_null_count(), 0);
    }

    #[test]
    fn reported_means_match_imputed_values() {
        let analysis = analyze(b"a,b\n1,4\n,5\n7,\n7,\n", FileFormat::Csv).unwrap();
        let df = &analysis.cleaned;
        let a = df.column_by_name("a").unwrap();
        let b = df.column_by_name("b").unwrap();
        assert_eq!(a.numeric_at(1), Some(analysis.summary.mean["a"]));
        assert_eq!(b.numeric_at(2), Some(analysis.summary.mean["b"]));
    }

    #[test]
    fn txt_is_rejected_before_parsing() {
        let err = UploadRequest::new("notes.txt", "n.txt", b"\xff\xfe not even utf8").unwrap_err();
        assert!(matches!(err, AnalyzerError::UnsupportedFormat { .. }));
    }

    #[test]
    fn loader_failure_never_touches_store() {
        let store = Arc::new(FakeStore::default());
        let analyzer = Analyzer::new(store.clone());
        let upload = UploadRequest::new("bad.csv", "b.csv", b"a,b\n1,2,3\n").unwrap();

        let err = analyzer.process(&upload).unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { line: Some(2), .. }));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn store_failure_is_storage_unavailable() {
        let store = Arc::new(FakeStore {
            fail: true,
            ..Default::default()
        });
        let analyzer = Analyzer::new(store.clone());
        let upload = UploadRequest::new("ok.csv", "o.csv", PRICE_QTY).unwrap();

        let err = analyzer.process(&upload).unwrap_err();
        assert!(matches!(err, AnalyzerError::StorageUnavailable { .. }));
        assert!(!err.is_input_error());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert!(store.inner.is_empty());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let analyzer = Analyzer::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            analyzer.fetch(FileId(404)).unwrap_err(),
            AnalyzerError::NotFound { file_id: 404 }
        );
    }

    #[test]
    fn fetch_store_failure_is_storage_unavailable() {
        let analyzer = Analyzer::new(Arc::new(FakeStore {
            fail: true,
            ..Default::default()
        }));
        assert!(matches!(
            analyzer.fetch(FileId(1)),
            Err(AnalyzerError::StorageUnavailable { .. })
        ));
    }

    #[test]
    fn each_upload_gets_its_own_id() {
        let analyzer = Analyzer::new(Arc::new(MemoryStore::new()));
        let upload = UploadRequest::new("p.csv", "x.csv", PRICE_QTY).unwrap();
        let a = analyzer.process(&upload).unwrap().file_id;
        let b = analyzer.process(&upload).unwrap().file_id;
        assert_ne!(a, b);
    }
}
