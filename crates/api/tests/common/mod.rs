#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{Months, NaiveDate, Utc};
use clubhouse_api::auth::jwt::{generate_access_token, JwtConfig};
use clubhouse_api::auth::password::hash_password;
use clubhouse_api::config::ServerConfig;
use clubhouse_api::router::build_app_router;
use clubhouse_api::state::AppState;
use clubhouse_api::storage::LocalStorage;
use clubhouse_core::types::DbId;
use clubhouse_db::models::account::CreateAccount;
use clubhouse_db::models::membership::Membership;
use clubhouse_db::models::membership_type::{CreateMembershipType, MembershipType};
use clubhouse_db::models::user::{CreateUser, User};
use clubhouse_db::repositories::{AccountRepo, MembershipRepo, MembershipTypeRepo, RoleRepo, UserRepo};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "club_password_123";

/// Build a test `ServerConfig` with safe defaults and a throwaway files dir.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        files_dir: std::env::temp_dir().join(format!("clubhouse-test-{}", uuid::Uuid::new_v4())),
        max_upload_bytes: 64 * 1024,
        billing_sweep_interval_secs: 3600,
        cookie_secure: false,
    }
}

/// Build the full application router, exactly as `main.rs` does.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let files_dir: PathBuf = config.files_dir.clone();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage: Arc::new(LocalStorage::new(files_dir)),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, request(Method::GET, uri, None, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::GET, uri, Some(token), None)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, request(Method::POST, uri, None, Some(body))).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    send(app, request(Method::POST, uri, Some(token), Some(body))).await
}

/// POST without a body (no `Content-Type` either).
pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::POST, uri, Some(token), None)).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: serde_json::Value, token: &str) -> Response {
    send(app, request(Method::PUT, uri, Some(token), Some(body))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::DELETE, uri, Some(token), None)).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn years_ago(years: u32) -> NaiveDate {
    today() - Months::new(12 * years)
}

/// Create an account with [`TEST_PASSWORD`], optionally linked to a user.
pub async fn seed_account(pool: &PgPool, email: &str, role: &str, user_id: Option<DbId>) -> DbId {
    let role_id = RoleRepo::find_by_name(pool, role).await.unwrap().unwrap().id;
    AccountRepo::create(
        pool,
        &CreateAccount {
            email: email.to_string(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role_id,
            user_id,
        },
    )
    .await
    .unwrap()
    .expect("user should be linkable")
    .id
}

/// Access token signed with the test secret.
pub fn token_for(account_id: DbId, role: &str) -> String {
    generate_access_token(account_id, role, &test_config().jwt).unwrap()
}

pub async fn admin_token(pool: &PgPool) -> (DbId, String) {
    let id = seed_account(pool, "admin@club.test", "admin", None).await;
    (id, token_for(id, "admin"))
}

pub async fn employee_token(pool: &PgPool) -> (DbId, String) {
    let id = seed_account(pool, "desk@club.test", "employee", None).await;
    (id, token_for(id, "employee"))
}

pub async fn seed_type(pool: &PgPool, monthly: i64, admission: i64, max_dependents: i32) -> MembershipType {
    MembershipTypeRepo::create(
        pool,
        &CreateMembershipType {
            name: format!("Plan {monthly}/{admission}/{max_dependents}"),
            description: None,
            monthly_fee_cents: monthly,
            admission_fee_cents: Some(admission),
            max_dependents: Some(max_dependents),
        },
    )
    .await
    .unwrap()
}

/// An ACTIVE membership started on `started_on` with its titular user.
pub async fn seed_membership(
    pool: &PgPool,
    type_id: DbId,
    started_on: NaiveDate,
    document: &str,
) -> (Membership, User) {
    let mut tx = pool.begin().await.unwrap();
    let membership = MembershipRepo::create_in_tx(&mut tx, type_id, started_on)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let titular = UserRepo::create(
        pool,
        &CreateUser {
            account_id: None,
            membership_id: Some(membership.id),
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
    .unwrap();
    (membership, titular)
}

/// Membership whose titular can log in as a `member`. Returns the token too.
pub async fn seed_member_login(
    pool: &PgPool,
    type_id: DbId,
    document: &str,
) -> (Membership, User, String) {
    let (membership, titular) = seed_membership(pool, type_id, years_ago(2), document).await;
    let email = format!("{}@members.test", document.to_lowercase());
    let account_id = seed_account(pool, &email, "member", Some(titular.id)).await;
    (membership, titular, token_for(account_id, "member"))
}
