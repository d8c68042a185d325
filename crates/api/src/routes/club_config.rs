use axum::routing::get;
use axum::Router;

use crate::handlers::club_config;
use crate::state::AppState;

/// Routes mounted at `/club-config`.
///
/// ```text
/// GET /   -> get_config
/// PUT /   -> update_config (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(club_config::get_config).put(club_config::update_config),
    )
}
