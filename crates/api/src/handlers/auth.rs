//! Handlers for the `/auth` resource (login, refresh, logout, profile).

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::models::account::AccountResponse;
use clubhouse_db::models::session::CreateSession;
use clubhouse_db::models::user::User;
use clubhouse_db::repositories::{AccountRepo, RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::cookie::{access_token_cookie, clear_access_token_cookie};
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `PUT /auth/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub account: AccountInfo,
}

/// Public account info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct AccountInfo {
    pub id: DbId,
    pub email: String,
    pub role: String,
}

/// Body of `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub account: AccountResponse,
    /// Club member profile, absent for staff accounts without one.
    pub user: Option<User>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns access and refresh tokens and
/// sets the `access_token` cookie.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = input.email.trim();

    // 1. Find account by email.
    let account = AccountRepo::find_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid email or password".into()))
        })?;

    // 2. Check if the account is active.
    if !account.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 3. Check if the account is temporarily locked.
    if let Some(locked_until) = account.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    // 4. Verify password.
    let password_valid = verify_password(&input.password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        // 5. On failure: count it, lock once the threshold is reached.
        let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
        let failures = AccountRepo::record_failed_login(
            &state.pool,
            account.id,
            MAX_FAILED_ATTEMPTS,
            lock_until,
        )
        .await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            tracing::warn!(account_id = account.id, failures, "Account locked after failed logins");
        }

        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        )));
    }

    // 6. On success: reset failed count, set last_login_at.
    AccountRepo::record_successful_login(&state.pool, account.id).await?;

    let role_name = role_name(&state, account.role_id).await?;
    let response =
        create_auth_response(&state, &headers, account.id, &account.email, &role_name).await?;

    Ok(with_cookie(&state, response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<impl IntoResponse> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // Rotation: the presented token is single-use.
    SessionRepo::revoke(&state.pool, session.id).await?;

    let account = AccountRepo::find_by_id(&state.pool, session.account_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Account no longer exists".into()))
        })?;

    if !account.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let role_name = role_name(&state, account.role_id).await?;
    let response =
        create_auth_response(&state, &headers, account.id, &account.email, &role_name).await?;

    Ok(with_cookie(&state, response))
}

/// POST /api/v1/auth/logout
///
/// Revoke all sessions for the caller and clear the cookie. Returns 204.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse> {
    let revoked = SessionRepo::revoke_all_for_account(&state.pool, auth.account_id).await?;
    tracing::debug!(account_id = auth.account_id, revoked, "Logged out");

    Ok((
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_access_token_cookie(state.config.cookie_secure),
        )],
    ))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    let account = AccountRepo::find_response(&state.pool, auth.account_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Account",
            id: auth.account_id,
        }))?;
    let user = UserRepo::find_by_account_id(&state.pool, auth.account_id).await?;

    Ok(Json(DataResponse {
        data: MeResponse { account, user },
    }))
}

/// PUT /api/v1/auth/password
///
/// Change the caller's password. Every session is revoked afterwards.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let account = AccountRepo::find_by_id(&state.pool, auth.account_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Account",
            id: auth.account_id,
        }))?;

    let current_ok = verify_password(&input.current_password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_ok {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }

    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let new_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    AccountRepo::update_password(&state.pool, account.id, &new_hash).await?;
    SessionRepo::revoke_all_for_account(&state.pool, account.id).await?;

    tracing::info!(account_id = account.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate access + refresh tokens, persist a session row, and build the response.
async fn create_auth_response(
    state: &AppState,
    headers: &HeaderMap,
    account_id: DbId,
    email: &str,
    role: &str,
) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(account_id, role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();

    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.chars().take(500).collect());

    let session_input = CreateSession {
        account_id,
        refresh_token_hash: refresh_hash,
        expires_at,
        user_agent,
        ip_address: None,
    };
    SessionRepo::create(&state.pool, &session_input).await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        account: AccountInfo {
            id: account_id,
            email: email.to_string(),
            role: role.to_string(),
        },
    })
}

/// Attach the `access_token` cookie to an auth response.
fn with_cookie(state: &AppState, response: AuthResponse) -> impl IntoResponse {
    let cookie = access_token_cookie(
        &response.access_token,
        response.expires_in,
        state.config.cookie_secure,
    );
    ([(header::SET_COOKIE, cookie)], Json(response))
}

async fn role_name(state: &AppState, role_id: DbId) -> AppResult<String> {
    RoleRepo::name_of(&state.pool, role_id).await?.ok_or_else(|| {
        AppError::Core(CoreError::Internal(format!("Role {role_id} does not exist")))
    })
}
