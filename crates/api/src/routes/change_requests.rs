use axum::routing::{get, post};
use axum::Router;

use crate::handlers::change_requests;
use crate::state::AppState;

/// Routes mounted at `/member-requests`.
///
/// ```text
/// POST /               -> create_request
/// GET  /               -> list_requests
/// GET  /{id}           -> get_request
/// POST /{id}/approve   -> approve_request (admin)
/// POST /{id}/reject    -> reject_request (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(change_requests::list_requests).post(change_requests::create_request),
        )
        .route("/{id}", get(change_requests::get_request))
        .route("/{id}/approve", post(change_requests::approve_request))
        .route("/{id}/reject", post(change_requests::reject_request))
}
