//! Persisted analysis records.
//!
//! These are the typed shapes that cross the storage boundary. Undefined
//! statistics are absent map entries (mean, median) or explicit `null`
//! coefficients (correlation); nothing is stored as pre-serialized text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cleaning::CleaningReport;
use crate::statistics::{ColumnStat, CorrelationMatrix, TableStatistics};

/// Identifier issued by a result store for one uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Statistical and cleaning report for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Pre-clean mean per numeric column.
    pub mean: ColumnStat,
    /// Pre-clean median per numeric column.
    pub median: ColumnStat,
    /// Pre-clean pairwise correlation.
    pub correlation: CorrelationMatrix,
    /// Rows removed as duplicates.
    pub duplicates_removed: usize,
    /// Missing numeric cells filled with the mean.
    pub missing_filled: usize,
}

impl AnalysisSummary {
    /// Combines the statistics snapshot with the cleaning report.
    pub fn new(stats: TableStatistics, report: CleaningReport) -> Self {
        Self {
            mean: stats.mean,
            median: stats.median,
            correlation: stats.correlation,
            duplicates_removed: report.duplicates_removed,
            missing_filled: report.missing_filled,
        }
    }

    /// Returns the cleaning counts.
    pub fn cleaning(&self) -> CleaningReport {
        CleaningReport {
            duplicates_removed: self.duplicates_removed,
            missing_filled: self.missing_filled,
        }
    }
}

/// Metadata about the uploaded file an analysis belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMeta {
    /// Filename as sent by the client.
    pub original_name: String,
    /// Name the bytes were saved under.
    pub stored_name: String,
    /// `csv` or `xlsx`.
    pub file_type: String,
    /// Size in bytes.
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// A record handed to a store, before an identifier is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysis {
    pub upload: UploadMeta,
    pub summary: AnalysisSummary,
    pub analyzed_at: DateTime<Utc>,
}

/// A record as persisted, keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub file_id: FileId,
    pub upload: UploadMeta,
    pub summary: AnalysisSummary,
    pub analyzed_at: DateTime<Utc>,
}

impl StoredAnalysis {
    /// Attaches an identifier to a new record.
    pub fn from_new(file_id: FileId, record: NewAnalysis) -> Self {
        Self {
            file_id,
            upload: record.upload,
            summary: record.summary,
            analyzed_at: record.analyzed_at,
        }
    }
}
