//! Compound list endpoints.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::state::{queries, CompoundListSummary, DbError};
use crate::web::error::AppError;
use crate::web::json::CompoundListDetail;
use crate::web::AppState;

/// Compound list routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/compound-lists", get(list_compound_lists))
        .route("/compound-lists/:id", get(get_compound_list))
}

async fn list_compound_lists(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompoundListSummary>>, AppError> {
    let lists = state
        .run(|conn| Ok(queries::list_compound_lists(conn)?))
        .await?;
    Ok(Json(lists))
}

async fn get_compound_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CompoundListDetail>, AppError> {
    let detail = state
        .run(move |conn| {
            let list = queries::get_compound_list(conn, id)?
                .ok_or_else(|| DbError::not_found("compound list", id))?;
            let compounds = queries::compound_list_members(conn, id)?;
            Ok(CompoundListDetail { list, compounds })
        })
        .await?;
    Ok(Json(detail))
}
