//! Handlers for the `/club-config` resource.

use axum::extract::State;
use axum::Json;
use clubhouse_db::models::club_config::{ClubConfig, UpdateClubConfig};
use clubhouse_db::repositories::ClubConfigRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/club-config
pub async fn get_config(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<ClubConfig>>> {
    let config = ClubConfigRepo::get(&state.pool).await?;
    Ok(Json(DataResponse { data: config }))
}

/// PUT /api/v1/club-config
///
/// Rate changes apply to bills computed afterwards; existing totals stay.
pub async fn update_config(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<UpdateClubConfig>,
) -> AppResult<Json<DataResponse<ClubConfig>>> {
    input.validate()?;
    let config = ClubConfigRepo::update(&state.pool, &input).await?;
    tracing::info!(updated_by = admin.account_id, ?input, "Club configuration updated");
    Ok(Json(DataResponse { data: config }))
}
