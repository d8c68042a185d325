use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::FileStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is a pool handle or behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: clubhouse_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Backend holding uploaded file contents.
    pub storage: Arc<dyn FileStorage>,
}
