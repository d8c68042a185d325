pub mod accounts;
pub mod applications;
pub mod auth;
pub mod bills;
pub mod change_requests;
pub mod club_config;
pub mod events;
pub mod files;
pub mod health;
pub mod membership_types;
pub mod memberships;
pub mod reservations;
pub mod spaces;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth                        login, refresh, logout, me, password
/// /accounts                    login accounts (admin)
/// /users                       club members and dependents
/// /membership-types            fee plans
/// /memberships                 memberships, dependents, transitions, balances
/// /membership-applications     applications with recommenders
/// /member-requests             suspension / disaffiliation / reactivation requests
/// /bills                       billing, payments, overdue sweep
/// /spaces                      bookable spaces
/// /reservations                space reservations and inscriptions
/// /events                      club events and inscriptions
/// /club-config                 club-wide billing and reservation policy
/// /files                       uploaded files
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/accounts", accounts::router())
        .nest("/users", users::router())
        .nest("/membership-types", membership_types::router())
        .nest("/memberships", memberships::router())
        .nest("/membership-applications", applications::router())
        .nest("/member-requests", change_requests::router())
        .nest("/bills", bills::router())
        .nest("/spaces", spaces::router())
        .nest("/reservations", reservations::router())
        .nest("/events", events::router())
        .nest("/club-config", club_config::router())
        .nest("/files", files::router())
}
