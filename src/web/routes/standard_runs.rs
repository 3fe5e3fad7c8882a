//! Standard run endpoints.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::state::{queries, DbError, StandardRunSummary};
use crate::web::error::AppError;
use crate::web::json::StandardRunDetail;
use crate::web::AppState;

/// Standard run routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/standard-runs", get(list_standard_runs))
        .route("/standard-runs/:id", get(get_standard_run))
}

async fn list_standard_runs(
    State(state): State<AppState>,
) -> Result<Json<Vec<StandardRunSummary>>, AppError> {
    let runs = state
        .run(|conn| Ok(queries::list_standard_runs(conn)?))
        .await?;
    Ok(Json(runs))
}

async fn get_standard_run(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StandardRunDetail>, AppError> {
    let detail = state
        .run(move |conn| {
            let run = queries::get_standard_run(conn, id)?
                .ok_or_else(|| DbError::not_found("standard run", id))?;
            let method = queries::get_method(conn, run.chromatography_method_id)?
                .ok_or_else(|| {
                    DbError::not_found("chromatography method", run.chromatography_method_id)
                })?;
            let retention_times = queries::retention_times_for_run(conn, id)?;

            Ok(StandardRunDetail {
                run,
                method,
                retention_times,
            })
        })
        .await?;
    Ok(Json(detail))
}
