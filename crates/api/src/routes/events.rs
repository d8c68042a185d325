use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// GET    /                      -> list_events
/// POST   /                      -> create_event (staff)
/// GET    /{id}                  -> get_event
/// PUT    /{id}                  -> update_event (staff)
/// POST   /{id}/cancel           -> cancel_event (staff)
/// GET    /{id}/inscriptions     -> list_inscriptions (staff)
/// POST   /{id}/inscriptions     -> inscribe (caller)
/// DELETE /{id}/inscriptions     -> withdraw (caller)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/{id}", get(events::get_event).put(events::update_event))
        .route("/{id}/cancel", post(events::cancel_event))
        .route(
            "/{id}/inscriptions",
            get(events::list_inscriptions)
                .post(events::inscribe)
                .delete(events::withdraw),
        )
}
