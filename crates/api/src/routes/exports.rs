//! Export endpoint handlers.

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use domain::models::{
    CreateExportRequest, CreateExportResponse, ExportHistoryResponse, ExportJob, ExportJobStatus,
    ExportStatusResponse, ListExportsQuery, NewExportJob,
};
use domain::services::validate_export_request;
use serde::Serialize;
use shared::pagination::{PageInfo, PageRequest};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::middleware::metrics::record_export_requested;

const NOT_FOUND_OR_DENIED: &str = "Export job not found or access denied";

/// Response for a deleted export.
#[derive(Debug, Serialize)]
pub struct DeleteExportResponse {
    pub success: bool,
    pub message: String,
}

/// Queue a new export job.
///
/// POST /api/v1/exports
pub async fn create_export(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateExportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateExportResponse>), ApiError> {
    let Json(request) = payload?;
    let now = Utc::now();

    validate_export_request(&request, caller.role, now)?;

    let new_job = NewExportJob::from_request(
        caller.user_id,
        request,
        now,
        state.config.export.retention_hours,
    );
    let job = state.jobs.create(&new_job).await?;

    record_export_requested(job.format);
    info!(
        export_id = %job.id,
        user_id = %caller.user_id,
        format = %job.format,
        "Export job queued"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateExportResponse {
            export_id: job.id,
            status: job.status,
        }),
    ))
}

/// The caller's export history, newest first.
///
/// GET /api/v1/exports?page=&limit=&status=
pub async fn list_exports(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<ListExportsQuery>, QueryRejection>,
) -> Result<Json<ExportHistoryResponse>, ApiError> {
    let Query(query) = query?;
    query.validate()?;

    let page = PageRequest::new(query.page, query.limit);
    let (jobs, total) = state
        .jobs
        .list_by_user(caller.user_id, page, query.status)
        .await?;

    Ok(Json(ExportHistoryResponse {
        exports: jobs.iter().map(ExportStatusResponse::from).collect(),
        pagination: PageInfo::new(page, total),
    }))
}

/// Status of one export job.
///
/// GET /api/v1/exports/:id
pub async fn get_export_status(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ExportStatusResponse>, ApiError> {
    let Path(id) = id?;
    let job = find_visible(&state, &caller, id).await?;
    Ok(Json(ExportStatusResponse::from(&job)))
}

/// Stream the rendered file of a completed export.
///
/// GET /api/v1/exports/:id/download
pub async fn download_export(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let job = find_visible(&state, &caller, id).await?;

    if job.status != ExportJobStatus::Completed {
        return Err(ApiError::NotReady(
            "Export is not ready for download".to_string(),
        ));
    }

    let file_path = job
        .file_path
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("Export file not found".to_string()))?;

    let file = File::open(file_path).await.map_err(|e| {
        warn!(
            export_id = %job.id,
            error = %e,
            path = %file_path,
            "Failed to open export file"
        );
        ApiError::NotFound("Export file not found".to_string())
    })?;

    let metadata = file.metadata().await.map_err(|e| {
        tracing::error!(export_id = %job.id, error = %e, "Failed to get file metadata");
        ApiError::Internal("Failed to read export file".to_string())
    })?;

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .header(header::CONTENT_TYPE, job.format.content_type())
        .header(header::CONTENT_DISPOSITION, content_disposition(&job))
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(body)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            ApiError::Internal("Failed to build response".to_string())
        })
}

/// Delete an export job and, best effort, its file.
///
/// DELETE /api/v1/exports/:id
pub async fn delete_export(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeleteExportResponse>, ApiError> {
    let Path(id) = id?;
    let job = state
        .jobs
        .delete(id, caller.owner_scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND_OR_DENIED.to_string()))?;

    if let Some(path) = job.file_path.as_deref() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(export_id = %job.id, error = %e, path = %path, "Failed to remove export file");
        }
    }

    info!(export_id = %job.id, user_id = %caller.user_id, "Export job deleted");

    Ok(Json(DeleteExportResponse {
        success: true,
        message: "Export deleted successfully".to_string(),
    }))
}

async fn find_visible(state: &AppState, caller: &Caller, id: Uuid) -> Result<ExportJob, ApiError> {
    state
        .jobs
        .find_by_id(id, caller.owner_scope())
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND_OR_DENIED.to_string()))
}

/// `attachment; filename="<name>.<ext>"`, with characters that would break
/// the quoted header value removed.
fn content_disposition(job: &ExportJob) -> String {
    let name: String = job
        .name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!(
        "attachment; filename=\"{}.{}\"",
        name,
        job.format.extension()
    )
}
