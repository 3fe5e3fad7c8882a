//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};

use crate::state::queries;
use crate::web::json::HealthResponse;
use crate::web::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_connected = state
        .run(|conn| Ok(queries::count_compounds(conn)?))
        .await
        .is_ok();

    Json(HealthResponse {
        status: if database_connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database_connected,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::web::test_support::{app, get_json};

    #[tokio::test]
    async fn test_health() {
        let (app, _db) = app();
        let (status, body) = get_json(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database_connected"], true);
    }
}
