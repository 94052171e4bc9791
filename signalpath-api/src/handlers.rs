//! HTTP request handlers.
//!
//! Prediction submissions return a task id immediately and run on a
//! spawned worker task; clients poll the status endpoint and, for coverage
//! jobs, fetch the finished rasters from the artifact endpoints. Raster
//! bytes stay server-side in the artifact map until the owning job
//! expires.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use dashmap::DashMap;
use serde_json::json;
use tracing::instrument;

use signalpath::jobs::{JobId, JobPayload, JobState, JobStore};
use signalpath::predict::{CoverageArtifacts, CoverageResult, PredictionService};
use signalpath::request::{CoverageRequest, LosRequest};

use crate::error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub jobs: Arc<JobStore>,
    /// Finished coverage rasters, keyed by owning job.
    pub artifacts: Arc<DashMap<JobId, CoverageResult>>,
}

impl AppState {
    /// Drops artifacts whose owning job has expired.
    pub fn sweep(&self) {
        self.jobs.purge_expired();
        self.artifacts.retain(|id, _| self.jobs.get(id).is_some());
    }
}

#[instrument(skip_all)]
pub async fn predict_los(
    State(state): State<AppState>,
    Json(request): Json<LosRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    request.validate()?;

    let id = state.jobs.create();
    let worker_id = id.clone();
    tokio::spawn(async move {
        match state.service.predict_los(&request).await {
            Ok(result) => state
                .jobs
                .complete(&worker_id, JobPayload::Los(Box::new(result))),
            Err(e) => state.jobs.fail(&worker_id, e.to_string()),
        }
    });

    Ok(Json(json!({ "task_id": id })))
}

#[instrument(skip_all)]
pub async fn predict_coverage(
    State(state): State<AppState>,
    Json(request): Json<CoverageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    request.validate()?;

    let id = state.jobs.create();
    let worker_id = id.clone();
    tokio::spawn(async move {
        match state.service.predict_coverage(&request).await {
            Ok(result) => {
                let references = CoverageArtifacts::describing(&result);
                state.artifacts.insert(worker_id.clone(), result);
                state
                    .jobs
                    .complete(&worker_id, JobPayload::Coverage(references));
            }
            Err(e) => state.jobs.fail(&worker_id, e.to_string()),
        }
    });

    Ok(Json(json!({ "task_id": id })))
}

pub async fn task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobState>, ApiError> {
    let id = JobId::from(id.as_str());
    state.jobs.get(&id).map(Json).ok_or(ApiError::TaskNotFound)
}

pub async fn coverage_geotiff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = JobId::from(id.as_str());
    let artifact = state
        .artifacts
        .get(&id)
        .ok_or(ApiError::ArtifactNotAvailable)?;
    Ok((
        [(header::CONTENT_TYPE, "image/tiff")],
        artifact.geotiff.clone(),
    ))
}

pub async fn coverage_legend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = JobId::from(id.as_str());
    let artifact = state
        .artifacts
        .get(&id)
        .ok_or(ApiError::ArtifactNotAvailable)?;
    Ok((
        [(header::CONTENT_TYPE, "image/png")],
        artifact.legend_png.clone(),
    ))
}
