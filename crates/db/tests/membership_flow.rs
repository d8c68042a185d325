//! Integration tests for applications, approval, and membership transitions.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use clubhouse_core::billing::KIND_ADMISSION;
use clubhouse_core::membership::RELATIONSHIP_TITULAR;
use clubhouse_core::status::{MembershipState, RequestStatus};
use clubhouse_core::types::DbId;
use clubhouse_db::models::application::{CreateApplication, NewRecommendation};
use clubhouse_db::models::membership::Membership;
use clubhouse_db::models::membership_type::CreateMembershipType;
use clubhouse_db::models::user::{CreateUser, User};
use clubhouse_db::repositories::application_repo::ApprovalPlan;
use clubhouse_db::repositories::change_request_repo::{NewChangeRequest, Review};
use clubhouse_db::repositories::membership_repo::StateChange;
use clubhouse_db::repositories::{
    AccountRepo, ApplicationRepo, BillRepo, ChangeRequestRepo, MembershipRepo,
    MembershipTypeRepo, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed_type(pool: &PgPool, name: &str, admission: i64) -> DbId {
    MembershipTypeRepo::create(
        pool,
        &CreateMembershipType {
            name: name.to_string(),
            description: None,
            monthly_fee_cents: 20_000,
            admission_fee_cents: Some(admission),
            max_dependents: Some(2),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_membership(pool: &PgPool, type_id: DbId, started_on: NaiveDate) -> Membership {
    let mut tx = pool.begin().await.unwrap();
    let membership = MembershipRepo::create_in_tx(&mut tx, type_id, started_on)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    membership
}

async fn seed_titular(pool: &PgPool, membership_id: DbId, document: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            account_id: None,
            membership_id: Some(membership_id),
            relationship: None,
            first_name: "Titular".into(),
            last_name: document.into(),
            document_number: document.into(),
            birth_date: None,
            email: None,
            phone: None,
            address: None,
        },
    )
    .await
    .unwrap()
}

fn application(type_id: DbId, document: &str, recommenders: Vec<DbId>) -> CreateApplication {
    CreateApplication {
        membership_type_id: type_id,
        first_name: "Lucia".into(),
        last_name: "Paredes".into(),
        document_number: document.into(),
        birth_date: Some(date(1990, 5, 4)),
        email: "Lucia@Example.com".into(),
        phone: None,
        address: None,
        recommender_user_ids: recommenders,
    }
}

async fn admin_account(pool: &PgPool) -> DbId {
    AccountRepo::create(
        pool,
        &clubhouse_db::models::account::CreateAccount {
            email: "admin@club.test".into(),
            password_hash: "hash".into(),
            role_id: 1,
            user_id: None,
        },
    )
    .await
    .unwrap()
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

fn dependent(membership_id: DbId, document: &str) -> CreateUser {
    CreateUser {
        account_id: None,
        membership_id: Some(membership_id),
        relationship: Some("child".into()),
        first_name: "Mateo".into(),
        last_name: "Paredes".into(),
        document_number: document.into(),
        birth_date: None,
        email: None,
        phone: None,
        address: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_dependent_stops_at_plan_cap(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2020, 1, 1)).await;
    seed_titular(&pool, membership.id, "11111111").await;

    for document in ["CHILD001", "CHILD002"] {
        let created =
            UserRepo::create_dependent(&pool, &dependent(membership.id, document), membership.id, 2)
                .await
                .unwrap();
        assert_matches!(created, Some(user) if user.relationship == "child");
    }

    let third =
        UserRepo::create_dependent(&pool, &dependent(membership.id, "CHILD003"), membership.id, 2)
            .await
            .unwrap();
    assert_matches!(third, None);

    // Deactivated dependents free their slot.
    let members = UserRepo::list_by_membership(&pool, membership.id).await.unwrap();
    let child = members.iter().find(|u| u.relationship == "child").unwrap();
    assert!(UserRepo::deactivate(&pool, child.id).await.unwrap());
    let again =
        UserRepo::create_dependent(&pool, &dependent(membership.id, "CHILD003"), membership.id, 2)
            .await
            .unwrap();
    assert_matches!(again, Some(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_membership_code_derives_from_id(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2020, 1, 1)).await;
    assert_eq!(membership.code, format!("M-{:06}", membership.id));
    assert_eq!(membership.state_id, MembershipState::Active.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_titular_is_rejected(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2020, 1, 1)).await;
    seed_titular(&pool, membership.id, "11111111").await;

    let err = UserRepo::create(
        &pool,
        &CreateUser {
            account_id: None,
            membership_id: Some(membership.id),
            relationship: Some(RELATIONSHIP_TITULAR.into()),
            first_name: "Other".into(),
            last_name: "Titular".into(),
            document_number: "22222222".into(),
            birth_date: None,
            email: None,
            phone: None,
            address: None,
        },
    )
    .await
    .unwrap_err();
    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.constraint(), Some("uq_users_membership_titular"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recommender_snapshots_report_overdue_bills(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2019, 3, 1)).await;
    let titular = seed_titular(&pool, membership.id, "33333333").await;

    sqlx::query(
        "INSERT INTO bills (membership_id, kind, due_date, status_id) VALUES ($1, 'other', '2026-01-10', 3)",
    )
    .bind(membership.id)
    .execute(&pool)
    .await
    .unwrap();

    let snaps = ApplicationRepo::recommender_snapshots(&pool, &[titular.id, 999_999])
        .await
        .unwrap();
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].membership_id, Some(membership.id));
    assert_eq!(snaps[0].membership_started_on, Some(date(2019, 3, 1)));
    assert_eq!(snaps[0].overdue_bills, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approve_creates_membership_titular_and_admission_bill(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 150_000).await;
    let m1 = seed_membership(&pool, type_id, date(2019, 1, 1)).await;
    let m2 = seed_membership(&pool, type_id, date(2018, 1, 1)).await;
    let r1 = seed_titular(&pool, m1.id, "44444444").await;
    let r2 = seed_titular(&pool, m2.id, "55555555").await;
    let admin = admin_account(&pool).await;

    let app = ApplicationRepo::create(
        &pool,
        &application(type_id, "ab123456", vec![r1.id, r2.id]),
        &[
            NewRecommendation {
                user_id: r1.id,
                membership_id: m1.id,
            },
            NewRecommendation {
                user_id: r2.id,
                membership_id: m2.id,
            },
        ],
    )
    .await
    .unwrap();
    assert_eq!(app.document_number, "AB123456");
    assert_eq!(app.email, "lucia@example.com");
    assert_eq!(
        ApplicationRepo::list_recommendations(&pool, app.id)
            .await
            .unwrap()
            .len(),
        2
    );

    let plan = ApprovalPlan {
        reviewed_by: admin,
        review_notes: Some("Welcome".into()),
        started_on: date(2026, 10, 18),
        admission_fee_cents: 150_000,
        admission_due_date: date(2026, 11, 2),
    };
    let outcome = ApplicationRepo::approve(&pool, app.id, &plan)
        .await
        .unwrap()
        .expect("pending application");

    assert_eq!(outcome.application.status_id, RequestStatus::Approved.id());
    assert_eq!(outcome.application.membership_id, Some(outcome.membership.id));
    assert_eq!(outcome.titular.relationship, RELATIONSHIP_TITULAR);
    assert_eq!(outcome.titular.document_number, "AB123456");
    let bill = outcome.admission_bill.expect("admission bill");
    assert_eq!(bill.kind, KIND_ADMISSION);
    assert_eq!(bill.total_cents, 150_000);

    // A second review finds nothing pending.
    assert!(ApplicationRepo::approve(&pool, app.id, &plan)
        .await
        .unwrap()
        .is_none());
    assert!(ApplicationRepo::reject(&pool, app.id, admin, None)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_pending_application_conflicts(pool: PgPool) {
    let type_id = seed_type(&pool, "Single", 0).await;
    ApplicationRepo::create(&pool, &application(type_id, "77777777", vec![]), &[])
        .await
        .unwrap();
    let err = ApplicationRepo::create(&pool, &application(type_id, "77777777", vec![]), &[])
        .await
        .unwrap_err();
    assert_eq!(
        err.as_database_error().unwrap().constraint(),
        Some("uq_membership_applications_pending_document")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_change_state_is_guarded_by_current_state(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2020, 1, 1)).await;

    let suspend = StateChange {
        from: MembershipState::Active,
        to: MembershipState::Suspended,
        suspended_until: Some(date(2027, 1, 1)),
        reason: Some("Travelling"),
    };
    let updated = MembershipRepo::change_state(&pool, membership.id, &suspend)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.state_id, MembershipState::Suspended.id());
    assert_eq!(updated.suspended_until, Some(date(2027, 1, 1)));

    // Same change again no longer matches the `from` state.
    assert!(MembershipRepo::change_state(&pool, membership.id, &suspend)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approved_disaffiliation_deactivates_members(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2020, 1, 1)).await;
    let titular = seed_titular(&pool, membership.id, "88888888").await;
    let admin = admin_account(&pool).await;

    let request = ChangeRequestRepo::create(
        &pool,
        &NewChangeRequest {
            membership_id: membership.id,
            requested_by: admin,
            kind: "disaffiliation".into(),
            reason: "Moving abroad".into(),
            suspend_until: None,
        },
    )
    .await
    .unwrap();

    let change = StateChange {
        from: MembershipState::Active,
        to: MembershipState::Disaffiliated,
        suspended_until: None,
        reason: Some("Moving abroad"),
    };
    let review = Review {
        reviewed_by: admin,
        review_notes: None,
    };
    let (request, membership) =
        ChangeRequestRepo::approve(&pool, request.id, &review, &change, 2_500)
            .await
            .unwrap()
            .unwrap();
    assert_eq!(request.status_id, RequestStatus::Approved.id());
    assert_eq!(request.devolution_cents, 2_500);
    assert_eq!(membership.state_id, MembershipState::Disaffiliated.id());

    let titular = UserRepo::find_by_id(&pool, titular.id).await.unwrap().unwrap();
    assert!(!titular.is_active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_change_request_rolls_back(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let membership = seed_membership(&pool, type_id, date(2020, 1, 1)).await;
    let admin = admin_account(&pool).await;

    let request = ChangeRequestRepo::create(
        &pool,
        &NewChangeRequest {
            membership_id: membership.id,
            requested_by: admin,
            kind: "reactivation".into(),
            reason: "Back home".into(),
            suspend_until: None,
        },
    )
    .await
    .unwrap();

    // Membership is ACTIVE, so a SUSPENDED -> ACTIVE change does not apply.
    let change = StateChange {
        from: MembershipState::Suspended,
        to: MembershipState::Active,
        suspended_until: None,
        reason: None,
    };
    let review = Review {
        reviewed_by: admin,
        review_notes: None,
    };
    assert!(ChangeRequestRepo::approve(&pool, request.id, &review, &change, 0)
        .await
        .unwrap()
        .is_none());

    let request = ChangeRequestRepo::find_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status_id, RequestStatus::Pending.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_suspensions_are_lifted(pool: PgPool) {
    let type_id = seed_type(&pool, "Family", 0).await;
    let clean = seed_membership(&pool, type_id, date(2020, 1, 1)).await;
    let owing = seed_membership(&pool, type_id, date(2020, 1, 1)).await;

    for id in [clean.id, owing.id] {
        MembershipRepo::change_state(
            &pool,
            id,
            &StateChange {
                from: MembershipState::Active,
                to: MembershipState::Suspended,
                suspended_until: Some(date(2026, 9, 30)),
                reason: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    }
    sqlx::query(
        "INSERT INTO bills (membership_id, kind, due_date, status_id) VALUES ($1, 'other', '2026-08-10', 3)",
    )
    .bind(owing.id)
    .execute(&pool)
    .await
    .unwrap();

    let lifted = MembershipRepo::lift_expired_suspensions(&pool, date(2026, 10, 18))
        .await
        .unwrap();
    assert_eq!(lifted, vec![clean.id]);
    assert_eq!(BillRepo::count_overdue(&pool, owing.id).await.unwrap(), 1);
}
