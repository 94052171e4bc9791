//! Route table.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{
    coverage_geotiff, coverage_legend, predict_coverage, predict_los, task_status, AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/predict/los", post(predict_los))
        .route("/predict/coverage", post(predict_coverage))
        .route("/task/status/:id", get(task_status))
        .route("/task/artifact/:id/geotiff", get(coverage_geotiff))
        .route("/task/artifact/:id/legend", get(coverage_legend))
        .with_state(state)
}
