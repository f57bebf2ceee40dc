//! HTTP boundary (C7, §5): upload a source file to enqueue a dubbing job,
//! poll its state, and download finished artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Multipart, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::error::DubError;
use crate::queue::{Job, JobData, JobQueue};

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub upload_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/job/:id", get(get_job))
        .route("/download/:name", get(download))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct UploadResponse {
    #[serde(rename = "jobId")]
    job_id: Uuid,
    status: &'static str,
}

#[derive(Serialize)]
struct JobResponse {
    id: Uuid,
    name: String,
    state: &'static str,
    progress: u8,
    data: JobData,
    result: Option<crate::queue::JobResultData>,
    failure: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            name: job.name,
            state: job.state.as_str(),
            progress: job.progress,
            data: job.data,
            result: job.result,
            failure: job.failure,
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<DubError> for ApiError {
    fn from(e: DubError) -> Self {
        let status = match &e {
            DubError::JobNotFound(_) => StatusCode::NOT_FOUND,
            DubError::Config(_) | DubError::SourceMissing(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

/// `POST /upload`: multipart form with a required `file` field and optional
/// `mergeMode` / `burnSubtitles` / `enhance` fields; enqueues a `process-video`
/// job and returns its id immediately (§5).
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut saved_path: Option<PathBuf> = None;
    let mut original_filename = String::new();
    let mut merge_mode: Option<String> = None;
    let mut burn_subtitles: Option<bool> = None;
    let mut enhance: Option<bool> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("invalid multipart body: {e}"),
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                original_filename = field.file_name().unwrap_or("upload.bin").to_string();
                let bytes = field.bytes().await.map_err(|e| ApiError {
                    status: StatusCode::BAD_REQUEST,
                    message: format!("failed to read uploaded file: {e}"),
                })?;
                let dest = unique_upload_path(&state.upload_dir, &original_filename);
                tokio::fs::create_dir_all(&state.upload_dir)
                    .await
                    .map_err(DubError::from)?;
                tokio::fs::write(&dest, &bytes).await.map_err(DubError::from)?;
                saved_path = Some(dest);
            }
            "mergeMode" => merge_mode = Some(text_of(field).await),
            "burnSubtitles" => burn_subtitles = Some(text_of(field).await.eq_ignore_ascii_case("true")),
            "enhance" => enhance = Some(text_of(field).await.eq_ignore_ascii_case("true")),
            _ => {}
        }
    }

    let Some(source_path) = saved_path else {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "missing required 'file' field".to_string(),
        });
    };

    let data = JobData {
        source_path: source_path.display().to_string(),
        original_filename,
        merge_mode,
        burn_subtitles,
        enhance,
    };
    let job_id = state.queue.enqueue(&data).await.map_err(ApiError::from)?;

    Ok(Json(UploadResponse {
        job_id,
        status: "queued",
    }))
}

async fn text_of(field: axum::extract::multipart::Field<'_>) -> String {
    field.text().await.unwrap_or_default()
}

fn unique_upload_path(upload_dir: &Path, original_filename: &str) -> PathBuf {
    let stem = Path::new(original_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let ext = Path::new(original_filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("bin");
    upload_dir.join(format!("{}-{}.{}", stem, Uuid::new_v4(), ext))
}

/// `GET /job/:id`: current state, progress, and (if finished) result/failure.
async fn get_job(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state
        .queue
        .get(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(DubError::JobNotFound(id.clone())))?;
    Ok(Json(job.into()))
}

/// `GET /download/:name`: serves a finished artifact by basename. The name is
/// stripped to its final path component first so `../../etc/passwd` can never
/// escape `upload_dir`.
async fn download(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
) -> Result<Vec<u8>, ApiError> {
    let safe_name = Path::new(&name)
        .file_name()
        .ok_or_else(|| ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "invalid file name".to_string(),
        })?
        .to_string_lossy()
        .to_string();

    let path = state.upload_dir.join(&safe_name);
    tokio::fs::read(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "download failed");
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("artifact not found: {safe_name}"),
        }
    })
}
