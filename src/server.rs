//! HTTP surface for uploads and stored analyses.
//!
//! - `GET /`: liveness text
//! - `POST /upload`: multipart field `file`, analyzed and stored
//! - `GET /data/stats?file_id=N`: stored statistics and cleaning counts
//! - `GET /data/clean?file_id=N`: cleaning counts only
//!
//! The pipeline itself is synchronous; handlers run it on the blocking
//! pool so file parsing and store I/O never stall the async workers.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::AnalyzerError;
use crate::loader::FileFormat;
use crate::pipeline::{Analyzer, ProcessedUpload, UploadRequest};
use crate::statistics::{ColumnStat, CorrelationMatrix};
use crate::store::{JsonFileStore, MemoryStore, ResultStore, StoreError};
use crate::summary::{FileId, StoredAnalysis};
use crate::uploads::UploadDir;

// ── State ─────────────────────────────────────────────────────────────

/// Shared state for the HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub analyzer: Analyzer,
    pub uploads: UploadDir,
}

impl AppState {
    /// Builds the result store and upload directory described by `config`.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn ResultStore> = match config.backend {
            StorageBackend::Json => Arc::new(JsonFileStore::open(&config.results_dir)?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(Self {
            analyzer: Analyzer::new(store),
            uploads: UploadDir::create(&config.uploads_dir)?,
        })
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/upload", post(upload_file))
        .route("/data/stats", get(get_stats))
        .route("/data/clean", get(get_clean))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `app` on `listener` until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("data-analyzer listening on http://{}", addr);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}

// ── Errors ────────────────────────────────────────────────────────────

/// Error response: a status code and a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(err: AnalyzerError) -> Self {
        let status = match &err {
            AnalyzerError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AnalyzerError::Parse { .. } => StatusCode::BAD_REQUEST,
            AnalyzerError::NotFound { .. } => StatusCode::NOT_FOUND,
            AnalyzerError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AnalyzerError::PreconditionViolation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

// ── Responses ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Name the upload was saved under.
    pub filename: String,
    pub file_id: FileId,
    pub analysis_summary: UploadSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadSummary {
    pub duplicates_removed: usize,
    pub missing_filled: usize,
    pub mean: ColumnStat,
    pub median: ColumnStat,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub file_id: FileId,
    pub mean: ColumnStat,
    pub median: ColumnStat,
    pub correlation: CorrelationMatrix,
    pub duplicates_removed: usize,
    pub missing_filled: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanResponse {
    pub message: String,
    pub duplicates_removed: usize,
    pub missing_filled: usize,
}

// ── Handlers ──────────────────────────────────────────────────────────

/// GET / - liveness
async fn home() -> &'static str {
    "data-analyzer is running."
}

/// POST /upload - analyze and store an uploaded CSV or Excel file
async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        file = Some((name, data));
        break;
    }

    let (name, data) = file.ok_or_else(|| ApiError::bad_request("file not found in request"))?;
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("file name is empty"));
    }
    // rejected before anything is written or parsed
    let format = FileFormat::from_filename(&name)?;

    let (stored_name, processed) = run_blocking(move || {
        let saved = state.uploads.save(&name, &data).map_err(|e| {
            AnalyzerError::StorageUnavailable {
                reason: format!("cannot save upload: {e}"),
            }
        })?;
        let request = UploadRequest {
            original_name: &name,
            stored_name: &saved.stored_name,
            format,
            bytes: &data,
        };
        let processed: ProcessedUpload = state.analyzer.process(&request)?;
        Ok((saved.stored_name, processed))
    })
    .await?;

    let summary = processed.summary;
    Ok(Json(UploadResponse {
        message: "File uploaded and analyzed successfully".to_string(),
        filename: stored_name,
        file_id: processed.file_id,
        analysis_summary: UploadSummary {
            duplicates_removed: summary.duplicates_removed,
            missing_filled: summary.missing_filled,
            mean: summary.mean,
            median: summary.median,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct FileIdQuery {
    file_id: Option<String>,
}

/// GET /data/stats?file_id=N - stored statistics
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileIdQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stored = lookup(state, query).await?;
    let summary = stored.summary;
    Ok(Json(StatsResponse {
        file_id: stored.file_id,
        mean: summary.mean,
        median: summary.median,
        correlation: summary.correlation,
        duplicates_removed: summary.duplicates_removed,
        missing_filled: summary.missing_filled,
    }))
}

/// GET /data/clean?file_id=N - cleaning counts
async fn get_clean(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileIdQuery>,
) -> Result<Json<CleanResponse>, ApiError> {
    let report = lookup(state, query).await?.summary.cleaning();
    Ok(Json(CleanResponse {
        message: "Data has already been cleaned".to_string(),
        duplicates_removed: report.duplicates_removed,
        missing_filled: report.missing_filled,
    }))
}

async fn lookup(state: Arc<AppState>, query: FileIdQuery) -> Result<StoredAnalysis, ApiError> {
    let raw = query
        .file_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("file_id is required"))?;
    let file_id = raw
        .trim()
        .parse::<u64>()
        .map(FileId)
        .map_err(|_| ApiError::bad_request(format!("file_id must be an integer, got '{raw}'")))?;

    run_blocking(move || state.analyzer.fetch(file_id)).await
}

/// Runs a synchronous pipeline call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AnalyzerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!(error = %e, "analysis task panicked");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "analysis task failed")
        })?
        .map_err(ApiError::from)
}

// ── Tests ─────────────────────────────────────────────────────────────
