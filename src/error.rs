//! Error types for data-analyzer.
//!
//! The pipeline separates "bad data" from "storage unavailable" so a caller
//! can tell whether retrying the upload makes sense. Only
//! [`AnalyzerError::StorageUnavailable`] is worth retrying.

use thiserror::Error;

/// All errors produced by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    /// The declared format tag or file extension is not CSV or spreadsheet.
    #[error("unsupported format '{format}': only CSV (.csv) and Excel (.xlsx, .xls) are accepted")]
    UnsupportedFormat { format: String },

    /// Tabular content could not be parsed.
    ///
    /// `line` is 1-based and present when the failure maps to a line of
    /// the input (CSV field-count mismatches, unterminated quotes).
    #[error("{format} parse error{}: {reason}", line_suffix(.line))]
    Parse {
        format: &'static str,
        line: Option<usize>,
        reason: String,
    },

    /// Pipeline stages were sequenced incorrectly.
    #[error("precondition violated: {reason}")]
    PreconditionViolation { reason: String },

    /// The result store failed after the analysis was computed.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// No analysis is stored under the requested identifier.
    #[error("no analysis stored for file id {file_id}")]
    NotFound { file_id: u64 },
}

impl AnalyzerError {
    /// Builds a [`Parse`](Self::Parse) error that has no line position.
    pub(crate) fn parse(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line: None,
            reason: reason.into(),
        }
    }

    /// Builds a [`Parse`](Self::Parse) error pointing at a 1-based line.
    pub(crate) fn parse_at(format: &'static str, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line: Some(line),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by the uploaded content itself.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. } | Self::Parse { .. })
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(l) => format!(" at line {l}"),
        None => String::new(),
    }
}
