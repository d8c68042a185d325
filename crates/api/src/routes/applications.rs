use axum::routing::{get, post};
use axum::Router;

use crate::handlers::applications;
use crate::state::AppState;

/// Routes mounted at `/membership-applications`.
///
/// ```text
/// POST /               -> submit_application (public)
/// GET  /               -> list_applications (staff)
/// GET  /{id}           -> get_application (staff)
/// POST /{id}/approve   -> approve_application (admin)
/// POST /{id}/reject    -> reject_application (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(applications::list_applications).post(applications::submit_application),
        )
        .route("/{id}", get(applications::get_application))
        .route("/{id}/approve", post(applications::approve_application))
        .route("/{id}/reject", post(applications::reject_application))
}
