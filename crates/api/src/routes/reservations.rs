use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::reservations;
use crate::state::AppState;

/// Routes mounted at `/reservations`.
///
/// ```text
/// GET    /                                   -> list_reservations
/// POST   /                                   -> create_reservation
/// GET    /{id}                               -> get_reservation
/// POST   /{id}/cancel                        -> cancel_reservation
/// GET    /{id}/inscriptions                  -> list_inscriptions
/// POST   /{id}/inscriptions                  -> add_inscription
/// DELETE /{id}/inscriptions/{inscription_id} -> remove_inscription
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/{id}", get(reservations::get_reservation))
        .route("/{id}/cancel", post(reservations::cancel_reservation))
        .route(
            "/{id}/inscriptions",
            get(reservations::list_inscriptions).post(reservations::add_inscription),
        )
        .route(
            "/{id}/inscriptions/{inscription_id}",
            delete(reservations::remove_inscription),
        )
}
