use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::bills;
use crate::state::AppState;

/// Routes mounted at `/bills`.
///
/// ```text
/// GET    /                          -> list_bills
/// POST   /                          -> create_bill (staff)
/// POST   /generate                  -> generate_monthly (staff)
/// POST   /mark-overdue              -> run_sweep (staff)
/// GET    /{id}                      -> get_bill
/// POST   /{id}/details              -> add_detail (staff)
/// DELETE /{id}/details/{detail_id}  -> delete_detail (staff)
/// POST   /{id}/recalculate          -> recalculate (staff)
/// POST   /{id}/pay                  -> pay_bill (staff)
/// POST   /{id}/cancel               -> cancel_bill (staff)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(bills::list_bills).post(bills::create_bill))
        .route("/generate", post(bills::generate_monthly))
        .route("/mark-overdue", post(bills::run_sweep))
        .route("/{id}", get(bills::get_bill))
        .route("/{id}/details", post(bills::add_detail))
        .route("/{id}/details/{detail_id}", delete(bills::delete_detail))
        .route("/{id}/recalculate", post(bills::recalculate))
        .route("/{id}/pay", post(bills::pay_bill))
        .route("/{id}/cancel", post(bills::cancel_bill))
}
