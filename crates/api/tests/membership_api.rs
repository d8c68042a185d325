//! HTTP-level integration tests for applications, memberships, dependents
//! and member change requests.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use clubhouse_core::status::{BillStatus, MembershipState, RequestStatus};
use common::{
    admin_token, body_json, get_auth, post_auth, post_json, post_json_auth, seed_member_login,
    seed_membership, seed_type, today, years_ago,
};
use serde_json::{json, Value};
use sqlx::PgPool;

fn application_body(type_id: i64, document: &str, recommenders: &[i64]) -> Value {
    json!({
        "membership_type_id": type_id,
        "first_name": "Lucia",
        "last_name": "Paredes",
        "document_number": document,
        "email": "lucia@example.com",
        "phone": "+51 987 654 321",
        "recommender_user_ids": recommenders,
    })
}

/// Two titulars with long-standing active memberships.
async fn seed_recommenders(pool: &PgPool, type_id: i64) -> [i64; 2] {
    let (_, first) = seed_membership(pool, type_id, years_ago(3), "REC00001").await;
    let (_, second) = seed_membership(pool, type_id, years_ago(2), "REC00002").await;
    [first.id, second.id]
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_and_approve_application(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 100_000, 3).await;
    let recommenders = seed_recommenders(&pool, plan.id).await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/membership-applications",
        application_body(plan.id, "APP12345", &recommenders),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let submitted = body_json(response).await;
    let id = submitted["data"]["id"].as_i64().unwrap();
    assert_eq!(submitted["data"]["status_id"], RequestStatus::Pending.id());
    assert_eq!(submitted["data"]["recommendations"].as_array().unwrap().len(), 2);

    let uri = format!("/api/v1/membership-applications/{id}/approve");
    let response =
        post_json_auth(app.clone(), &uri, json!({ "review_notes": "Welcome" }), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = body_json(response).await;
    let data = &approved["data"];
    assert_eq!(data["application"]["status_id"], RequestStatus::Approved.id());
    assert_eq!(data["membership"]["state_id"], MembershipState::Active.id());
    assert!(data["membership"]["code"].as_str().unwrap().starts_with("M-"));
    assert_eq!(data["titular"]["relationship"], "titular");
    assert_eq!(data["titular"]["document_number"], "APP12345");
    assert_eq!(data["admission_bill"]["kind"], "admission");
    assert_eq!(data["admission_bill"]["total_cents"], 100_000);

    // A second approval is a conflict.
    let response = post_json_auth(app, &uri, json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reject_application(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let recommenders = seed_recommenders(&pool, plan.id).await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let submitted = body_json(
        post_json(
            app.clone(),
            "/api/v1/membership-applications",
            application_body(plan.id, "APP12345", &recommenders),
        )
        .await,
    )
    .await;
    let id = submitted["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/membership-applications/{id}/reject");
    let response = post_json_auth(app, &uri, json!({ "review_notes": "Incomplete" }), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], RequestStatus::Rejected.id());
    assert_eq!(json["data"]["review_notes"], "Incomplete");
    assert!(json["data"]["membership_id"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_application_needs_two_eligible_recommenders(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let [veteran, _] = seed_recommenders(&pool, plan.id).await;
    let (_, junior) = seed_membership(&pool, plan.id, today() - Duration::days(30), "JUNIOR01").await;
    let app = common::build_test_app(pool);

    // Only one recommender.
    let response = post_json(
        app.clone(),
        "/api/v1/membership-applications",
        application_body(plan.id, "APP12345", &[veteran]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The second one has not been a member long enough.
    let response = post_json(
        app.clone(),
        "/api/v1/membership-applications",
        application_body(plan.id, "APP12345", &[veteran, junior.id]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("month(s)"));

    // Unknown user id.
    let response = post_json(
        app,
        "/api/v1/membership-applications",
        application_body(plan.id, "APP12345", &[veteran, 999_999]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_application_schema_errors_list_fields(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let app = common::build_test_app(pool);

    let mut body = application_body(plan.id, "12", &[1, 2]);
    body["email"] = json!("not-an-email");
    let response = post_json(app, "/api/v1/membership-applications", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["fields"]["document_number"].is_array());
    assert!(json["fields"]["email"].is_array());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_existing_member_cannot_apply(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let recommenders = seed_recommenders(&pool, plan.id).await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/membership-applications",
        application_body(plan.id, "REC00001", &recommenders),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_applications_listing_is_staff_only(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (_, _, member) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/membership-applications", &member).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Memberships and dependents
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_member_adds_dependents_up_to_the_cap(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 1).await;
    let (membership, _, token) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/memberships/{}/members", membership.id);

    let child = json!({
        "first_name": "Mateo",
        "last_name": "Paredes",
        "document_number": "CHILD001",
        "relationship": "child",
    });
    let response = post_json_auth(app.clone(), &uri, child, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["membership_id"], membership.id);
    assert_eq!(json["data"]["relationship"], "child");

    let spouse = json!({
        "first_name": "Rosa",
        "last_name": "Paredes",
        "document_number": "SPOUSE01",
        "relationship": "spouse",
    });
    let response = post_json_auth(app.clone(), &uri, spouse, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let detail = body_json(
        get_auth(app, &format!("/api/v1/memberships/{}", membership.id), &token).await,
    )
    .await;
    assert_eq!(detail["data"]["members"].as_array().unwrap().len(), 2);
    assert_eq!(detail["data"]["members"][0]["relationship"], "titular");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_member_cannot_touch_other_memberships(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (_, _, token) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let (other, _) = seed_membership(&pool, plan.id, years_ago(1), "OTHER001").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app.clone(), &format!("/api/v1/memberships/{}", other.id), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app,
        &format!("/api/v1/memberships/{}/members", other.id),
        json!({
            "first_name": "Intruder",
            "last_name": "Child",
            "document_number": "CHILD002",
            "relationship": "child",
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_transitions(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);
    let base = format!("/api/v1/memberships/{}", membership.id);

    // Suspension without a date is rejected.
    let response =
        post_json_auth(app.clone(), &format!("{base}/suspend"), json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let until = today() + Duration::days(60);
    let response = post_json_auth(
        app.clone(),
        &format!("{base}/suspend"),
        json!({ "reason": "Travelling", "suspend_until": until }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["state_id"], MembershipState::Suspended.id());
    assert_eq!(json["data"]["suspended_until"], until.to_string());

    let response =
        post_json_auth(app.clone(), &format!("{base}/reactivate"), json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response =
        post_json_auth(app.clone(), &format!("{base}/disaffiliate"), json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["state_id"], MembershipState::Disaffiliated.id());

    // Disaffiliation is terminal.
    let response = post_json_auth(app, &format!("{base}/reactivate"), json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reactivation_blocked_by_overdue_bills(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _) = seed_membership(&pool, plan.id, years_ago(1), "MEMBER01").await;
    let (_, admin) = admin_token(&pool).await;

    sqlx::query("UPDATE memberships SET state_id = $2 WHERE id = $1")
        .bind(membership.id)
        .bind(MembershipState::Suspended.id())
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO bills (membership_id, kind, issued_on, due_date, status_id, total_cents)
         VALUES ($1, 'other', $2, $2, $3, 5000)",
    )
    .bind(membership.id)
    .bind(today() - Duration::days(40))
    .bind(BillStatus::Overdue.id())
    .execute(&pool)
    .await
    .unwrap();

    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/memberships/{}/reactivate", membership.id);
    let response = post_json_auth(app, &uri, json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("overdue"));
}

// ---------------------------------------------------------------------------
// Change requests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_member_requests_suspension_and_admin_approves(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _, member) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let until = today() + Duration::days(90);
    let response = post_json_auth(
        app.clone(),
        "/api/v1/member-requests",
        json!({ "kind": "suspension", "reason": "Working abroad", "suspend_until": until }),
        &member,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(json["data"]["membership_id"], membership.id);

    // A second pending request for the same membership is refused.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/member-requests",
        json!({ "kind": "disaffiliation", "reason": "Changed my mind" }),
        &member,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/member-requests/{id}/approve"),
        json!({}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["request"]["status_id"], RequestStatus::Approved.id());
    assert_eq!(json["data"]["membership"]["state_id"], MembershipState::Suspended.id());
    assert_eq!(json["data"]["membership"]["state_reason"], "Working abroad");

    // Members only see their own requests.
    let json = body_json(get_auth(app, "/api/v1/member-requests", &member).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_disaffiliation_records_devolution_of_paid_admission(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 100_000, 3).await;
    let recommenders = seed_recommenders(&pool, plan.id).await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let submitted = body_json(
        post_json(
            app.clone(),
            "/api/v1/membership-applications",
            application_body(plan.id, "APP12345", &recommenders),
        )
        .await,
    )
    .await;
    let application_id = submitted["data"]["id"].as_i64().unwrap();
    let approved = body_json(
        post_json_auth(
            app.clone(),
            &format!("/api/v1/membership-applications/{application_id}/approve"),
            json!({}),
            &admin,
        )
        .await,
    )
    .await;
    let membership_id = approved["data"]["membership"]["id"].as_i64().unwrap();
    let bill_id = approved["data"]["admission_bill"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/bills/{bill_id}/pay"),
        json!({ "payment_method": "transfer", "payment_reference": "OP-778" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/member-requests",
        json!({ "membership_id": membership_id, "kind": "disaffiliation", "reason": "Moving" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        app,
        &format!("/api/v1/member-requests/{request_id}/approve"),
        json!({ "review_notes": "Refund by transfer" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    // Default devolution rate is 50%.
    assert_eq!(json["data"]["request"]["devolution_cents"], 50_000);
    assert_eq!(json["data"]["membership"]["state_id"], MembershipState::Disaffiliated.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reject_change_request(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let (membership, _, member) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/v1/member-requests",
            json!({ "kind": "disaffiliation", "reason": "Too expensive" }),
            &member,
        )
        .await,
    )
    .await;
    let id = json["data"]["id"].as_i64().unwrap();

    // Members cannot review requests.
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/member-requests/{id}/reject"),
        json!({}),
        &member,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/member-requests/{id}/reject"),
        json!({ "review_notes": "Talk to the board" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], RequestStatus::Rejected.id());

    let detail = body_json(
        get_auth(app, &format!("/api/v1/memberships/{}", membership.id), &admin).await,
    )
    .await;
    assert_eq!(detail["data"]["state_id"], MembershipState::Active.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reviews_accept_an_empty_body(pool: PgPool) {
    let plan = seed_type(&pool, 20_000, 0, 3).await;
    let recommenders = seed_recommenders(&pool, plan.id).await;
    let (membership, _, member) = seed_member_login(&pool, plan.id, "MEMBER01").await;
    let (_, admin) = admin_token(&pool).await;
    let app = common::build_test_app(pool);

    let submitted = body_json(
        post_json(
            app.clone(),
            "/api/v1/membership-applications",
            application_body(plan.id, "APP12345", &recommenders),
        )
        .await,
    )
    .await;
    let id = submitted["data"]["id"].as_i64().unwrap();
    let response = post_auth(
        app.clone(),
        &format!("/api/v1/membership-applications/{id}/reject"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], RequestStatus::Rejected.id());
    assert!(json["data"]["review_notes"].is_null());

    let until = today() + Duration::days(60);
    let requested = body_json(
        post_json_auth(
            app.clone(),
            "/api/v1/member-requests",
            json!({ "kind": "suspension", "reason": "Travelling", "suspend_until": until }),
            &member,
        )
        .await,
    )
    .await;
    let request_id = requested["data"]["id"].as_i64().unwrap();
    let response = post_auth(
        app.clone(),
        &format!("/api/v1/member-requests/{request_id}/approve"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let detail = body_json(
        get_auth(app, &format!("/api/v1/memberships/{}", membership.id), &admin).await,
    )
    .await;
    assert_eq!(detail["data"]["state_id"], MembershipState::Suspended.id());
}
