//! HTTP-level integration tests for `/bills`.

mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Duration};
use clubhouse_core::status::{BillStatus, MembershipState};
use common::{
    admin_token, body_json, delete_auth, employee_token, get_auth, post_json_auth,
    seed_member_login, seed_membership, seed_type, today, years_ago,
};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create_bill(app: axum::Router, token: &str, membership_id: i64) -> Value {
    let response = post_json_auth(
        app,
        "/api/v1/bills",
        json!({
            "membership_id": membership_id,
            "notes": "Locker and towels",
            "details": [
                { "description": "Locker rental", "quantity": 2, "unit_price_cents": 1_500, "discount_percent": 10 },
                { "description": "Towel service", "unit_price_cents": 800 },
            ],
        }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn push_due_date_back(pool: &PgPool, bill_id: i64, days: i64) {
    sqlx::query("UPDATE bills SET due_date = $2 WHERE id = $1")
        .bind(bill_id)
        .bind(today() - Duration::days(days))
        .execute(pool)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Monthly generation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_generate_monthly_bills_is_idempotent(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (active, _) = seed_membership(&pool, plan.id, years_ago(1), "ACTIVE01").await;
    let (suspended, _) = seed_membership(&pool, plan.id, years_ago(1), "SUSPEND1").await;
    let (gone, _) = seed_membership(&pool, plan.id, years_ago(1), "GONE0001").await;

    sqlx::query("UPDATE memberships SET discount_percent = 10 WHERE id = $1")
        .bind(active.id)
        .execute(&pool)
        .await
        .unwrap();
    for (id, state) in [
        (suspended.id, MembershipState::Suspended),
        (gone.id, MembershipState::Disaffiliated),
    ] {
        sqlx::query("UPDATE memberships SET state_id = $2 WHERE id = $1")
            .bind(id)
            .bind(state.id())
            .execute(&pool)
            .await
            .unwrap();
    }

    let (_, token) = employee_token(&pool).await;
    let app = common::build_test_app(pool);
    let period = today().with_day(20).unwrap();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/bills/generate",
        json!({ "period": period }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["created"], 2);
    assert_eq!(json["data"]["period"], today().with_day(1).unwrap().to_string());

    let active_bills = body_json(
        get_auth(app.clone(), &format!("/api/v1/memberships/{}/bills", active.id), &token).await,
    )
    .await;
    let bill = &active_bills["data"][0];
    assert_eq!(bill["kind"], "monthly_fee");
    assert_eq!(bill["total_cents"], 18_000);
    assert_eq!(bill["due_date"], today().with_day(10).unwrap().to_string());

    let suspended_bills = body_json(
        get_auth(app.clone(), &format!("/api/v1/memberships/{}/bills", suspended.id), &token).await,
    )
    .await;
    assert_eq!(suspended_bills["data"][0]["total_cents"], 5_000);

    // Running the same period again creates nothing.
    let json = body_json(
        post_json_auth(app, "/api/v1/bills/generate", json!({ "period": period }), &token).await,
    )
    .await;
    assert_eq!(json["data"]["created"], 0);
    assert_eq!(json["data"]["skipped"], 2);
}

// ---------------------------------------------------------------------------
// Manual bills and details
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manual_bill_totals(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, token) = employee_token(&pool).await;
    let app = common::build_test_app(pool);

    let json = create_bill(app, &token, membership.id).await;
    let bill = &json["data"];
    assert_eq!(bill["kind"], "other");
    assert_eq!(bill["status_id"], BillStatus::Pending.id());
    assert_eq!(bill["subtotal_cents"], 3_800);
    assert_eq!(bill["discount_cents"], 300);
    assert_eq!(bill["mora_cents"], 0);
    assert_eq!(bill["total_cents"], 3_500);
    assert_eq!(bill["details"].as_array().unwrap().len(), 2);
    assert_eq!(bill["details"][0]["amount_cents"], 2_700);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manual_bill_validation(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, token) = employee_token(&pool).await;
    let app = common::build_test_app(pool);

    let no_lines = json!({ "membership_id": membership.id, "details": [] });
    let response = post_json_auth(app.clone(), "/api/v1/bills", no_lines, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_line = json!({
        "membership_id": membership.id,
        "details": [{ "description": "Oops", "quantity": 0, "unit_price_cents": 100 }],
    });
    let response = post_json_auth(app.clone(), "/api/v1/bills", bad_line, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["fields"]["details[0].quantity"].is_array());

    // Lines large enough to overflow the total are rejected up front.
    let huge = i64::MAX / 2 + 1;
    let oversized = json!({
        "membership_id": membership.id,
        "details": [
            { "description": "Huge", "unit_price_cents": huge },
            { "description": "Huge", "unit_price_cents": huge },
        ],
    });
    let response = post_json_auth(app.clone(), "/api/v1/bills", oversized, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["fields"]["details[0].unit_price_cents"].is_array());
    assert!(json["fields"]["details[1].unit_price_cents"].is_array());

    let past_due = json!({
        "membership_id": membership.id,
        "due_date": today() - Duration::days(1),
        "details": [{ "description": "Late", "unit_price_cents": 100 }],
    });
    let response = post_json_auth(app.clone(), "/api/v1/bills", past_due, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_kind = json!({
        "membership_id": membership.id,
        "kind": "donation",
        "details": [{ "description": "Gift", "unit_price_cents": 100 }],
    });
    let response = post_json_auth(app.clone(), "/api/v1/bills", bad_kind, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let missing = json!({
        "membership_id": 999_999,
        "details": [{ "description": "Ghost", "unit_price_cents": 100 }],
    });
    let response = post_json_auth(app, "/api/v1/bills", missing, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_and_delete_detail_recompute_totals(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, token) = employee_token(&pool).await;
    let app = common::build_test_app(pool);

    let bill_id = create_bill(app.clone(), &token, membership.id).await["data"]["id"]
        .as_i64()
        .unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/details"),
        json!({ "description": "Parking", "unit_price_cents": 1_000 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total_cents"], 4_500);
    let detail_id = json["data"]["details"][2]["id"].as_i64().unwrap();

    let response = delete_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/details/{detail_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total_cents"], 3_500);

    let response = delete_auth(
        app,
        &format!("/api/v1/bills/{bill_id}/details/{detail_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Payment, cancellation, overdue sweep
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pay_then_cancel_records_devolution(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, token) = employee_token(&pool).await;
    let app = common::build_test_app(pool);

    let bill_id = create_bill(app.clone(), &token, membership.id).await["data"]["id"]
        .as_i64()
        .unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/pay"),
        json!({ "payment_method": "cash" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], BillStatus::Paid.id());
    assert!(json["data"]["paid_at"].is_string());

    // Paid bills are frozen.
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/pay"),
        json!({ "payment_method": "cash" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/details"),
        json!({ "description": "Late add", "unit_price_cents": 100 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/cancel"),
        json!({ "reason": "Charged twice" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], BillStatus::Cancelled.id());
    assert_eq!(json["data"]["devolution_cents"], 1_750);
    assert_eq!(json["data"]["cancel_reason"], "Charged twice");

    let response = post_json_auth(
        app,
        &format!("/api/v1/bills/{bill_id}/cancel"),
        json!({ "reason": "Again" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_pending_bill_has_no_devolution(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, token) = employee_token(&pool).await;
    let app = common::build_test_app(pool);

    let bill_id = create_bill(app.clone(), &token, membership.id).await["data"]["id"]
        .as_i64()
        .unwrap();
    let response = post_json_auth(
        app,
        &format!("/api/v1/bills/{bill_id}/cancel"),
        json!({ "reason": "Issued by mistake" }),
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["devolution_cents"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_overdue_applies_mora(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, token) = admin_token(&pool).await;
    let app = common::build_test_app(pool.clone());

    let bill_id = create_bill(app.clone(), &token, membership.id).await["data"]["id"]
        .as_i64()
        .unwrap();
    push_due_date_back(&pool, bill_id, 3).await;

    let response = post_json_auth(app.clone(), "/api/v1/bills/mark-overdue", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["bills_marked_overdue"], 1);

    let json = body_json(get_auth(app.clone(), &format!("/api/v1/bills/{bill_id}"), &token).await).await;
    assert_eq!(json["data"]["status_id"], BillStatus::Overdue.id());
    // 5% of 3500.
    assert_eq!(json["data"]["mora_cents"], 175);
    assert_eq!(json["data"]["total_cents"], 3_675);

    // A second sweep finds nothing new.
    let json = body_json(
        post_json_auth(app.clone(), "/api/v1/bills/mark-overdue", json!({}), &token).await,
    )
    .await;
    assert_eq!(json["data"]["bills_marked_overdue"], 0);

    let json = body_json(
        get_auth(app, &format!("/api/v1/memberships/{}/account-status", membership.id), &token)
            .await,
    )
    .await;
    assert_eq!(json["data"]["overdue_bills"], 1);
    assert_eq!(json["data"]["overdue_cents"], 3_675);
    assert_eq!(json["data"]["delinquent"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sweep_lifts_expired_suspensions(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    sqlx::query("UPDATE memberships SET state_id = $2, suspended_until = $3 WHERE id = $1")
        .bind(membership.id)
        .bind(MembershipState::Suspended.id())
        .bind(today() - Duration::days(1))
        .execute(&pool)
        .await
        .unwrap();
    let (_, token) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let json = body_json(
        post_json_auth(app.clone(), "/api/v1/bills/mark-overdue", json!({}), &token).await,
    )
    .await;
    assert_eq!(json["data"]["suspensions_lifted"], 1);

    let json = body_json(
        get_auth(app, &format!("/api/v1/memberships/{}", membership.id), &token).await,
    )
    .await;
    assert_eq!(json["data"]["state_id"], MembershipState::Active.id());
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_member_sees_only_own_bills(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (mine, _, member) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let (other, _) = seed_membership(&pool, plan.id, years_ago(1), "OTHER001").await;
    let (_, staff) = employee_token(&pool).await;
    let app = common::build_test_app(pool);

    let own_bill = create_bill(app.clone(), &staff, mine.id).await["data"]["id"]
        .as_i64()
        .unwrap();
    let other_bill = create_bill(app.clone(), &staff, other.id).await["data"]["id"]
        .as_i64()
        .unwrap();

    // The membership filter is overridden for members.
    let json = body_json(
        get_auth(
            app.clone(),
            &format!("/api/v1/bills?membership_id={}", other.id),
            &member,
        )
        .await,
    )
    .await;
    let bills = json["data"].as_array().unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0]["id"], own_bill);

    let response = get_auth(app.clone(), &format!("/api/v1/bills/{other_bill}"), &member).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app,
        &format!("/api/v1/bills/{own_bill}/pay"),
        json!({ "payment_method": "cash" }),
        &member,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sweep_loop_survives_zero_interval(pool: PgPool) {
    use clubhouse_api::background::billing_sweep;
    use tokio_util::sync::CancellationToken;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(billing_sweep::run(
        pool,
        std::time::Duration::ZERO,
        cancel.clone(),
    ));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.cancel();

    // A panicking loop would surface here as a JoinError.
    handle.await.unwrap();
}
