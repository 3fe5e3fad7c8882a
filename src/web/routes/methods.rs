//! Chromatography method endpoints and the retention time selector.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::export::{self, CSV_CONTENT_TYPE};
use crate::state::{
    compounds_with_retention_times, queries, retention_time_means, ChromatographyMethod, DbError,
};
use crate::web::error::AppError;
use crate::web::json::{
    Choice, MethodDetail, RetentionTimesAction, RetentionTimesRequest, RetentionTimesResponse,
};
use crate::web::AppState;

/// Method routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/methods", get(list_methods))
        .route("/methods/:id", get(get_method))
        .route("/methods/:id/retention-times", post(retention_times))
}

fn find_method(conn: &rusqlite::Connection, id: i64) -> Result<ChromatographyMethod, AppError> {
    Ok(queries::get_method(conn, id)?.ok_or_else(|| DbError::not_found("chromatography method", id))?)
}

async fn list_methods(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChromatographyMethod>>, AppError> {
    let methods = state.run(|conn| Ok(queries::list_methods(conn)?)).await?;
    Ok(Json(methods))
}

async fn get_method(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MethodDetail>, AppError> {
    let detail = state
        .run(move |conn| {
            let method = find_method(conn, id)?;

            let mut compound_lists = vec![Choice {
                id: 0,
                label: format!("All ({} compounds)", queries::count_compounds(conn)?),
            }];
            compound_lists.extend(queries::list_compound_lists(conn)?.into_iter().map(
                |summary| Choice {
                    id: summary.list.id,
                    label: format!("{} ({} compounds)", summary.list.name, summary.compound_count),
                },
            ));

            let standard_runs = queries::list_standard_runs_for_method(conn, id)?
                .into_iter()
                .map(|summary| Choice {
                    id: summary.run.id,
                    label: format!(
                        "Run on {} by {} ({} retention times)",
                        summary.run.date.format("%Y-%m-%d"),
                        summary.run.operator,
                        summary.retention_time_count
                    ),
                })
                .collect();

            Ok(MethodDetail {
                method,
                compound_lists,
                standard_runs,
            })
        })
        .await?;

    Ok(Json(detail))
}

fn csv_attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// Recompute means for the selection, or download them as CSV
async fn retention_times(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<RetentionTimesRequest>,
) -> Result<Response, AppError> {
    if matches!(&request.standard_runs, Some(runs) if runs.is_empty()) {
        return Err(AppError::BadRequest(
            "Select at least one standard run".to_string(),
        ));
    }

    let compound_list = Some(request.compound_list).filter(|&list_id| list_id != 0);
    let standard_runs = request.standard_runs;
    let action = request.action;

    log::debug!(
        "Retention times for method {}: list {:?}, runs {:?}, {:?}",
        id,
        compound_list,
        standard_runs,
        action
    );

    state
        .run(move |conn| {
            let method = find_method(conn, id)?;
            if let Some(list_id) = compound_list {
                queries::get_compound_list(conn, list_id)?
                    .ok_or_else(|| DbError::not_found("compound list", list_id))?;
            }

            let runs = standard_runs.as_deref();
            let response = match action {
                RetentionTimesAction::Select => {
                    let means = retention_time_means(conn, &method, runs, compound_list)?;
                    Json(RetentionTimesResponse {
                        method,
                        compound_list,
                        standard_runs,
                        means,
                    })
                    .into_response()
                }
                RetentionTimesAction::Export => {
                    let means = retention_time_means(conn, &method, runs, compound_list)?;
                    let body = export::means_to_csv(&means)?;
                    csv_attachment(&export::export_filename(&method, false), body)
                }
                RetentionTimesAction::ExportRaw => {
                    let observations = compounds_with_retention_times(conn, &method, runs)?;
                    let body = export::observations_to_csv(&observations)?;
                    csv_attachment(&export::export_filename(&method, true), body)
                }
            };
            Ok(response)
        })
        .await
}
