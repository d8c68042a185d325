use axum::routing::{get, post};
use axum::Router;

use crate::handlers::memberships;
use crate::state::AppState;

/// Routes mounted at `/memberships`.
///
/// ```text
/// GET  /                      -> list_memberships (staff)
/// GET  /{id}                  -> get_membership
/// PUT  /{id}                  -> update_membership (admin)
/// POST /{id}/members          -> add_member
/// POST /{id}/suspend          -> suspend (admin)
/// POST /{id}/disaffiliate     -> disaffiliate (admin)
/// POST /{id}/reactivate       -> reactivate (admin)
/// GET  /{id}/bills            -> list_membership_bills
/// GET  /{id}/account-status   -> account_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(memberships::list_memberships))
        .route(
            "/{id}",
            get(memberships::get_membership).put(memberships::update_membership),
        )
        .route("/{id}/members", post(memberships::add_member))
        .route("/{id}/suspend", post(memberships::suspend))
        .route("/{id}/disaffiliate", post(memberships::disaffiliate))
        .route("/{id}/reactivate", post(memberships::reactivate))
        .route("/{id}/bills", get(memberships::list_membership_bills))
        .route("/{id}/account-status", get(memberships::account_status))
}
