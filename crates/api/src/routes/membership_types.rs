use axum::routing::get;
use axum::Router;

use crate::handlers::membership_types;
use crate::state::AppState;

/// Routes mounted at `/membership-types`. Writes require `admin`.
///
/// ```text
/// GET    /       -> list_membership_types
/// POST   /       -> create_membership_type
/// GET    /{id}   -> get_membership_type
/// PUT    /{id}   -> update_membership_type
/// DELETE /{id}   -> deactivate_membership_type
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(membership_types::list_membership_types)
                .post(membership_types::create_membership_type),
        )
        .route(
            "/{id}",
            get(membership_types::get_membership_type)
                .put(membership_types::update_membership_type)
                .delete(membership_types::deactivate_membership_type),
        )
}
