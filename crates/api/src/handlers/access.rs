//! Ownership checks shared by handlers that members and staff both reach.

use chrono::{NaiveDate, Utc};
use clubhouse_core::error::CoreError;
use clubhouse_core::status::MembershipState;
use clubhouse_core::types::DbId;
use clubhouse_db::models::membership::Membership;
use clubhouse_db::models::user::User;
use clubhouse_db::repositories::{MembershipRepo, UserRepo};
use clubhouse_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Club calendar day (UTC).
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The user profile linked to the caller's account.
pub async fn linked_user(pool: &DbPool, auth: &AuthUser) -> AppResult<User> {
    UserRepo::find_by_account_id(pool, auth.account_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Forbidden(
                "Account is not linked to a club member".into(),
            ))
        })
}

/// Membership of the caller's linked user.
pub async fn own_membership_id(pool: &DbPool, auth: &AuthUser) -> AppResult<DbId> {
    linked_user(pool, auth).await?.membership_id.ok_or_else(|| {
        AppError::Core(CoreError::Forbidden(
            "Account does not belong to a membership".into(),
        ))
    })
}

/// Staff may touch any membership; members only their own.
pub async fn ensure_membership_access(
    pool: &DbPool,
    auth: &AuthUser,
    membership_id: DbId,
) -> AppResult<()> {
    if auth.is_staff() {
        return Ok(());
    }
    if own_membership_id(pool, auth).await? != membership_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not have access to this membership".into(),
        )));
    }
    Ok(())
}

pub async fn load_membership(pool: &DbPool, id: DbId) -> AppResult<Membership> {
    MembershipRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Membership",
            id,
        }))
}

pub fn membership_state(membership: &Membership) -> AppResult<MembershipState> {
    MembershipState::from_id(membership.state_id).ok_or_else(|| {
        AppError::Core(CoreError::Internal(format!(
            "Unknown membership state id {}",
            membership.state_id
        )))
    })
}
