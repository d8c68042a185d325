use axum::routing::get;
use axum::Router;

use crate::handlers::spaces;
use crate::state::AppState;

/// Routes mounted at `/spaces`. Writes require `admin`.
///
/// ```text
/// GET    /       -> list_spaces
/// POST   /       -> create_space
/// GET    /{id}   -> get_space
/// PUT    /{id}   -> update_space
/// DELETE /{id}   -> deactivate_space
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(spaces::list_spaces).post(spaces::create_space))
        .route(
            "/{id}",
            get(spaces::get_space)
                .put(spaces::update_space)
                .delete(spaces::deactivate_space),
        )
}
