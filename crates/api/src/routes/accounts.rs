use axum::routing::{get, post};
use axum::Router;

use crate::handlers::accounts;
use crate::state::AppState;

/// Admin account management mounted at `/accounts`.
///
/// ```text
/// GET    /                       -> list_accounts
/// POST   /                       -> create_account
/// GET    /{id}                   -> get_account
/// PUT    /{id}                   -> update_account
/// DELETE /{id}                   -> deactivate_account
/// POST   /{id}/reset-password    -> reset_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/{id}",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::deactivate_account),
        )
        .route("/{id}/reset-password", post(accounts::reset_password))
}
