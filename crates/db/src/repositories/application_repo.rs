//! Repository for `membership_applications` and `recommendation_members`.

use chrono::NaiveDate;
use clubhouse_core::billing::KIND_ADMISSION;
use clubhouse_core::membership::RELATIONSHIP_TITULAR;
use clubhouse_core::recommendation::RecommenderSnapshot;
use clubhouse_core::status::{BillStatus, RequestStatus};
use clubhouse_core::types::{Cents, DbId};
use sqlx::{FromRow, PgPool};

use crate::models::application::{
    ApplicationDetail, ApplicationListParams, CreateApplication, MembershipApplication,
    NewRecommendation, RecommendationMember,
};
use crate::models::bill::{Bill, NewBill, NewBillDetail};
use crate::models::membership::Membership;
use crate::models::user::User;
use crate::repositories::{user_repo, BillRepo, MembershipRepo};

const COLUMNS: &str = "id, membership_type_id, first_name, last_name, document_number, \
                        birth_date, email, phone, address, status_id, reviewed_by, \
                        review_notes, reviewed_at, membership_id, created_at, updated_at";

/// Everything approval needs besides the application itself.
#[derive(Debug, Clone)]
pub struct ApprovalPlan {
    pub reviewed_by: DbId,
    pub review_notes: Option<String>,
    pub started_on: NaiveDate,
    /// Admission fee of the applied-for plan; no bill when zero.
    pub admission_fee_cents: Cents,
    pub admission_due_date: NaiveDate,
}

/// Rows written by a successful approval.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub application: MembershipApplication,
    pub membership: Membership,
    pub titular: User,
    pub admission_bill: Option<Bill>,
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    user_id: DbId,
    first_name: String,
    last_name: String,
    relationship: String,
    is_active: bool,
    membership_id: Option<DbId>,
    state_id: Option<i16>,
    started_on: Option<NaiveDate>,
    overdue_bills: i64,
}

/// Provides persistence for membership applications.
pub struct ApplicationRepo;

impl ApplicationRepo {
    /// Insert an application and its recommendations in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &CreateApplication,
        recommendations: &[NewRecommendation],
    ) -> Result<MembershipApplication, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO membership_applications
                (membership_type_id, first_name, last_name, document_number, birth_date,
                 email, phone, address)
             VALUES ($1, $2, $3, UPPER($4), $5, LOWER($6), $7, $8)
             RETURNING {COLUMNS}"
        );
        let application = sqlx::query_as::<_, MembershipApplication>(&query)
            .bind(input.membership_type_id)
            .bind(input.first_name.trim())
            .bind(input.last_name.trim())
            .bind(&input.document_number)
            .bind(input.birth_date)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .fetch_one(&mut *tx)
            .await?;

        for rec in recommendations {
            sqlx::query(
                "INSERT INTO recommendation_members
                    (application_id, recommender_user_id, recommender_membership_id)
                 VALUES ($1, $2, $3)",
            )
            .bind(application.id)
            .bind(rec.user_id)
            .bind(rec.membership_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(application)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MembershipApplication>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM membership_applications WHERE id = $1");
        sqlx::query_as::<_, MembershipApplication>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Application with its recommendations.
    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ApplicationDetail>, sqlx::Error> {
        let Some(application) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let recommendations = Self::list_recommendations(pool, id).await?;
        Ok(Some(ApplicationDetail {
            application,
            recommendations,
        }))
    }

    pub async fn list_recommendations(
        pool: &PgPool,
        application_id: DbId,
    ) -> Result<Vec<RecommendationMember>, sqlx::Error> {
        sqlx::query_as::<_, RecommendationMember>(
            "SELECT rm.id, rm.application_id, rm.recommender_user_id,
                    rm.recommender_membership_id,
                    u.first_name || ' ' || u.last_name AS recommender_name,
                    rm.created_at
             FROM recommendation_members rm
             JOIN users u ON u.id = rm.recommender_user_id
             WHERE rm.application_id = $1
             ORDER BY rm.id ASC",
        )
        .bind(application_id)
        .fetch_all(pool)
        .await
    }

    /// List applications, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &ApplicationListParams,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MembershipApplication>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM membership_applications
             WHERE ($1::SMALLINT IS NULL OR status_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, MembershipApplication>(&query)
            .bind(params.status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Load what recommendation validation needs for each user id.
    ///
    /// Ids with no matching user are simply absent from the result.
    pub async fn recommender_snapshots(
        pool: &PgPool,
        user_ids: &[DbId],
    ) -> Result<Vec<RecommenderSnapshot>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT u.id AS user_id, u.first_name, u.last_name, u.relationship, u.is_active,
                    m.id AS membership_id, m.state_id, m.started_on,
                    (SELECT COUNT(*) FROM bills b
                      WHERE b.membership_id = u.membership_id AND b.status_id = $2) AS overdue_bills
             FROM users u
             LEFT JOIN memberships m ON m.id = u.membership_id
             WHERE u.id = ANY($1)
             ORDER BY u.id ASC",
        )
        .bind(user_ids)
        .bind(BillStatus::Overdue.id())
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RecommenderSnapshot {
                user_id: r.user_id,
                full_name: format!("{} {}", r.first_name, r.last_name),
                relationship: r.relationship,
                is_active: r.is_active,
                membership_id: r.membership_id,
                membership_state_id: r.state_id,
                membership_started_on: r.started_on,
                overdue_bills: r.overdue_bills,
            })
            .collect())
    }

    /// Approve a pending application.
    ///
    /// In one transaction: marks the application APPROVED, creates the
    /// membership and its titular user from the applicant data, issues the
    /// admission bill when the plan charges one, and links the membership
    /// back to the application. Returns `None` if the application is no
    /// longer pending.
    pub async fn approve(
        pool: &PgPool,
        id: DbId,
        plan: &ApprovalPlan,
    ) -> Result<Option<ApprovalOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE membership_applications SET
                status_id = $2, reviewed_by = $3, review_notes = $4, reviewed_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        let Some(application) = sqlx::query_as::<_, MembershipApplication>(&query)
            .bind(id)
            .bind(RequestStatus::Approved.id())
            .bind(plan.reviewed_by)
            .bind(&plan.review_notes)
            .bind(RequestStatus::Pending.id())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let membership =
            MembershipRepo::create_in_tx(&mut tx, application.membership_type_id, plan.started_on)
                .await?;

        let user_query = format!(
            "INSERT INTO users
                (membership_id, relationship, first_name, last_name, document_number,
                 birth_date, email, phone, address)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            user_repo::COLUMNS
        );
        let titular = sqlx::query_as::<_, User>(&user_query)
            .bind(membership.id)
            .bind(RELATIONSHIP_TITULAR)
            .bind(&application.first_name)
            .bind(&application.last_name)
            .bind(&application.document_number)
            .bind(application.birth_date)
            .bind(&application.email)
            .bind(&application.phone)
            .bind(&application.address)
            .fetch_one(&mut *tx)
            .await?;

        let admission_bill = if plan.admission_fee_cents > 0 {
            let bill = NewBill {
                membership_id: membership.id,
                kind: KIND_ADMISSION.to_string(),
                period: None,
                issued_on: plan.started_on,
                due_date: plan.admission_due_date,
                notes: None,
            };
            let detail = NewBillDetail {
                description: format!("Admission fee {}", membership.code),
                quantity: 1,
                unit_price_cents: plan.admission_fee_cents,
                discount_percent: 0,
                amount_cents: plan.admission_fee_cents,
            };
            Some(BillRepo::create_in_tx(&mut tx, &bill, &[detail]).await?)
        } else {
            None
        };

        let query = format!(
            "UPDATE membership_applications SET membership_id = $2 WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let application = sqlx::query_as::<_, MembershipApplication>(&query)
            .bind(id)
            .bind(membership.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(ApprovalOutcome {
            application,
            membership,
            titular,
            admission_bill,
        }))
    }

    /// Reject a pending application. `None` if it is no longer pending.
    pub async fn reject(
        pool: &PgPool,
        id: DbId,
        reviewed_by: DbId,
        review_notes: Option<&str>,
    ) -> Result<Option<MembershipApplication>, sqlx::Error> {
        let query = format!(
            "UPDATE membership_applications SET
                status_id = $2, reviewed_by = $3, review_notes = $4, reviewed_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MembershipApplication>(&query)
            .bind(id)
            .bind(RequestStatus::Rejected.id())
            .bind(reviewed_by)
            .bind(review_notes)
            .bind(RequestStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }
}
