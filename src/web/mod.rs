//! HTTP/JSON API over the metabolite database.

pub mod error;
pub mod json;
pub mod routes;

pub use error::AppError;

use axum::Router;
use rusqlite::Connection;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::state::DbConnection;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(db: DbConnection, config: ServerConfig) -> Self {
        Self { db, config }
    }

    /// Run blocking database work off the async executor.
    pub async fn run<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock();
            f(&conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Database task failed: {}", e)))?
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::compounds::routes())
        .merge(routes::compound_lists::routes())
        .merge(routes::methods::routes())
        .merge(routes::standard_runs::routes())
        .layer(cors)
        .with_state(state)
}
