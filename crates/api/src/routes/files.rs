use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Routes mounted at `/files`.
///
/// ```text
/// GET    /               -> list_files
/// POST   /               -> upload_file (multipart, field `file`)
/// GET    /{id}           -> get_file
/// DELETE /{id}           -> delete_file
/// GET    /{id}/content   -> download_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(files::list_files).post(files::upload_file))
        .route("/{id}", get(files::get_file).delete(files::delete_file))
        .route("/{id}/content", get(files::download_file))
}
