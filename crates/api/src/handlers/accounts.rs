//! Handlers for the `/accounts` resource (login account management).
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::account::{AccountResponse, CreateAccount, UpdateAccount};
use clubhouse_db::repositories::{AccountRepo, RoleRepo, SessionRepo};
use clubhouse_db::DbPool;
use serde::Deserialize;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /accounts`.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    /// Role name: `admin`, `employee` or `member`.
    pub role: String,
    /// Existing club member to link the account to.
    pub user_id: Option<DbId>,
}

/// Request body for `PUT /accounts/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /accounts/{id}/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/accounts
///
/// Create an account, optionally linking it to an existing user.
pub async fn create_account(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AccountResponse>>)> {
    let email = normalize_email(&input.email)?;

    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let role_id = resolve_role(&state.pool, &input.role).await?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create_dto = CreateAccount {
        email,
        password_hash: hashed,
        role_id,
        user_id: input.user_id,
    };

    let account = AccountRepo::create(&state.pool, &create_dto)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "User is missing or already linked to an account".into(),
            ))
        })?;

    tracing::info!(
        account_id = account.id,
        role = %input.role,
        created_by = admin.account_id,
        "Account created"
    );

    let response = load_response(&state.pool, account.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<AccountResponse>>>> {
    let (limit, offset) = params.resolve();
    let accounts = AccountRepo::list(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: accounts }))
}

/// GET /api/v1/accounts/{id}
pub async fn get_account(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AccountResponse>>> {
    let response = load_response(&state.pool, id).await?;
    Ok(Json(DataResponse { data: response }))
}

/// PUT /api/v1/accounts/{id}
///
/// Update email, role or active flag. Deactivating revokes all sessions.
pub async fn update_account(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAccountRequest>,
) -> AppResult<Json<DataResponse<AccountResponse>>> {
    let email = input.email.as_deref().map(normalize_email).transpose()?;
    let role_id = match input.role.as_deref() {
        Some(role) => Some(resolve_role(&state.pool, role).await?),
        None => None,
    };

    let update_dto = UpdateAccount {
        email,
        role_id,
        is_active: input.is_active,
    };

    AccountRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Account",
            id,
        }))?;

    if input.is_active == Some(false) {
        SessionRepo::revoke_all_for_account(&state.pool, id).await?;
    }

    let response = load_response(&state.pool, id).await?;
    Ok(Json(DataResponse { data: response }))
}

/// DELETE /api/v1/accounts/{id}
///
/// Soft-deactivate an account and revoke its sessions.
pub async fn deactivate_account(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.account_id {
        return Err(AppError::Core(CoreError::Conflict(
            "You cannot deactivate your own account".into(),
        )));
    }

    let deactivated = AccountRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Account",
            id,
        }));
    }

    SessionRepo::revoke_all_for_account(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/accounts/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let updated = AccountRepo::update_password(&state.pool, id, &hashed).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Account",
            id,
        }));
    }

    SessionRepo::revoke_all_for_account(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_response(pool: &DbPool, id: DbId) -> AppResult<AccountResponse> {
    AccountRepo::find_response(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Account",
            id,
        }))
}

async fn resolve_role(pool: &DbPool, name: &str) -> AppResult<DbId> {
    RoleRepo::find_by_name(pool, name.trim())
        .await?
        .map(|role| role.id)
        .ok_or_else(|| AppError::Core(CoreError::Validation(format!("Unknown role '{name}'"))))
}

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !validator::ValidateEmail::validate_email(&email) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "'{raw}' is not a valid email address"
        ))));
    }
    Ok(email)
}
