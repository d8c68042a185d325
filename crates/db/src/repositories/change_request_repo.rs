//! Repository for the `member_change_requests` table.

use clubhouse_core::status::RequestStatus;
use clubhouse_core::types::{Cents, DbId};
use sqlx::PgPool;

use crate::models::change_request::{ChangeRequestListParams, MemberChangeRequest};
use crate::models::membership::Membership;
use crate::repositories::membership_repo::StateChange;
use crate::repositories::MembershipRepo;

const COLUMNS: &str = "id, membership_id, requested_by, kind, reason, suspend_until, \
                        status_id, reviewed_by, review_notes, reviewed_at, devolution_cents, \
                        created_at, updated_at";

/// Validated request ready to insert.
#[derive(Debug, Clone)]
pub struct NewChangeRequest {
    pub membership_id: DbId,
    pub requested_by: DbId,
    pub kind: String,
    pub reason: String,
    pub suspend_until: Option<chrono::NaiveDate>,
}

/// Review data recorded on approval or rejection.
#[derive(Debug, Clone)]
pub struct Review<'a> {
    pub reviewed_by: DbId,
    pub review_notes: Option<&'a str>,
}

pub struct ChangeRequestRepo;

impl ChangeRequestRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewChangeRequest,
    ) -> Result<MemberChangeRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO member_change_requests
                (membership_id, requested_by, kind, reason, suspend_until)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MemberChangeRequest>(&query)
            .bind(input.membership_id)
            .bind(input.requested_by)
            .bind(&input.kind)
            .bind(input.reason.trim())
            .bind(input.suspend_until)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MemberChangeRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM member_change_requests WHERE id = $1");
        sqlx::query_as::<_, MemberChangeRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &ChangeRequestListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MemberChangeRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM member_change_requests
             WHERE ($1::BIGINT IS NULL OR membership_id = $1)
               AND ($2::SMALLINT IS NULL OR status_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, MemberChangeRequest>(&query)
            .bind(params.membership_id)
            .bind(params.status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Approve a pending request and apply its membership transition.
    ///
    /// Both writes share one transaction. Returns `None` (and changes
    /// nothing) when the request is no longer pending or the membership
    /// left `change.from` in the meantime.
    pub async fn approve(
        pool: &PgPool,
        id: DbId,
        review: &Review<'_>,
        change: &StateChange<'_>,
        devolution_cents: Cents,
    ) -> Result<Option<(MemberChangeRequest, Membership)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE member_change_requests SET
                status_id = $2, reviewed_by = $3, review_notes = $4, reviewed_at = NOW(),
                devolution_cents = $5
             WHERE id = $1 AND status_id = $6
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, MemberChangeRequest>(&query)
            .bind(id)
            .bind(RequestStatus::Approved.id())
            .bind(review.reviewed_by)
            .bind(review.review_notes)
            .bind(devolution_cents)
            .bind(RequestStatus::Pending.id())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let Some(membership) =
            MembershipRepo::change_state_in_tx(&mut tx, request.membership_id, change).await?
        else {
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some((request, membership)))
    }

    /// Reject a pending request. `None` if it is no longer pending.
    pub async fn reject(
        pool: &PgPool,
        id: DbId,
        review: &Review<'_>,
    ) -> Result<Option<MemberChangeRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE member_change_requests SET
                status_id = $2, reviewed_by = $3, review_notes = $4, reviewed_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MemberChangeRequest>(&query)
            .bind(id)
            .bind(RequestStatus::Rejected.id())
            .bind(review.reviewed_by)
            .bind(review.review_notes)
            .bind(RequestStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }
}
