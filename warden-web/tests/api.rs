//! End-to-end API tests against an in-memory database with the demo dataset

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use warden_web::{create_app, AppState, WebConfig};

async fn test_app() -> Router {
    let config = WebConfig {
        seed_demo_data: true,
        ..WebConfig::default()
    };
    let state = AppState::new(config).await.unwrap();
    create_app(state)
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_me_flow() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "newbie@example.com",
            "first_name": "New",
            "last_name": "Comer",
            "password": "secret123",
            "password_confirm": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["email"], "newbie@example.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());

    let token = login(&app, "newbie@example.com", "secret123").await;

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "newbie@example.com");

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_validation_failures() {
    let app = test_app().await;

    let base = json!({
        "email": "short@example.com",
        "first_name": "S",
        "last_name": "P",
        "password": "abc",
        "password_confirm": "abc"
    });
    let (status, _) = send(&app, "POST", "/api/auth/register", None, Some(base)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mismatch = json!({
        "email": "mismatch@example.com",
        "first_name": "M",
        "last_name": "M",
        "password": "secret123",
        "password_confirm": "secret124"
    });
    let (status, _) = send(&app, "POST", "/api/auth/register", None, Some(mismatch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Seeded account, so the email is taken
    let duplicate = json!({
        "email": "user@example.com",
        "first_name": "D",
        "last_name": "D",
        "password": "secret123",
        "password_confirm": "secret123"
    });
    let (status, body) = send(&app, "POST", "/api/auth/register", None, Some(duplicate)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email is already registered");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "user@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_requests_to_gated_resources_are_401() {
    let app = test_app().await;

    let (status, _) = send(&app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/products", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guest_can_browse_the_catalog_and_nothing_else() {
    let app = test_app().await;
    let token = login(&app, "guest@example.com", "guest123").await;

    let (status, body) = send(&app, "GET", "/api/products", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 5);

    let (status, body) = send(&app, "GET", "/api/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = send(
        &app,
        "POST",
        "/api/products",
        Some(&token),
        Some(json!({ "name": "Mouse", "price": 1500.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ownership_filter_narrows_collection_reads() {
    let app = test_app().await;

    // Seeded orders: two owned by user id 3, two by guest id 4
    let user_token = login(&app, "user@example.com", "user123").await;
    let (status, body) = send(&app, "GET", "/api/orders", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    for order in body["results"].as_array().unwrap() {
        assert_eq!(order["owner_id"], 3);
    }

    let admin_token = login(&app, "admin@example.com", "admin123").await;
    let (status, body) = send(&app, "GET", "/api/orders", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
}

#[tokio::test]
async fn detail_routes_enforce_ownership() {
    let app = test_app().await;
    let token = login(&app, "user@example.com", "user123").await;

    // Order 1 belongs to this user, order 3 does not
    let (status, body) = send(&app, "GET", "/api/orders/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"], 3);

    let (status, body) = send(&app, "GET", "/api/orders/3", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "You can only access your own objects");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders/1",
        Some(&token),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, _) = send(&app, "DELETE", "/api/orders/3", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/orders/999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn created_orders_belong_to_their_creator() {
    let app = test_app().await;
    let token = login(&app, "user@example.com", "user123").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({ "product_id": 1, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner_id"], 3);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn logout_invalidates_exactly_the_presented_token() {
    let app = test_app().await;
    let first = login(&app, "user@example.com", "user123").await;
    let second = login(&app, "user@example.com", "user123").await;

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&first), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_with_padded_bearer_header_still_revokes_the_session() {
    let app = test_app().await;
    let token = login(&app, "user@example.com", "user123").await;

    // Extra whitespace after the scheme; authentication trims it, and
    // logout must revoke the same trimmed token
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::AUTHORIZATION, format!("Bearer  {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_deletion_revokes_access_and_login() {
    let app = test_app().await;
    let token = login(&app, "guest@example.com", "guest123").await;

    let (status, _) = send(&app, "DELETE", "/api/auth/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "guest@example.com", "password": "guest123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_updates_are_partial() {
    let app = test_app().await;
    let token = login(&app, "user@example.com", "user123").await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/auth/profile",
        Some(&token),
        Some(json!({ "first_name": "Updated" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["first_name"], "Updated");
    assert_eq!(body["last_name"], "User");
}

#[tokio::test]
async fn admin_api_requires_the_admin_role() {
    let app = test_app().await;

    let user_token = login(&app, "user@example.com", "user123").await;
    let (status, _) = send(&app, "GET", "/api/admin/roles", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = login(&app, "admin@example.com", "admin123").await;
    let (status, body) = send(&app, "GET", "/api/admin/roles", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn duplicate_rule_and_role_in_use_are_rejected() {
    let app = test_app().await;
    let token = login(&app, "admin@example.com", "admin123").await;

    // guest (role 4) already has a rule for products (element 2)
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/rules",
        Some(&token),
        Some(json!({ "role_id": 4, "element_id": 2, "read_all": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Every seeded role has users attached
    let (status, body) = send(&app, "DELETE", "/api/admin/roles/4", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Role is assigned to users and cannot be deleted"
    );
}

#[tokio::test]
async fn matrix_edits_take_effect_immediately() {
    let app = test_app().await;
    let admin_token = login(&app, "admin@example.com", "admin123").await;
    let guest_token = login(&app, "guest@example.com", "guest123").await;

    let (status, _) = send(&app, "GET", "/api/orders", Some(&guest_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Grant guests (role 4) read over all orders (element 3)
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/rules",
        Some(&admin_token),
        Some(json!({ "role_id": 4, "element_id": 3, "read_all": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/api/orders", Some(&guest_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
}

#[tokio::test]
async fn rule_listing_filters_by_role() {
    let app = test_app().await;
    let token = login(&app, "admin@example.com", "admin123").await;

    let (status, body) = send(&app, "GET", "/api/admin/rules", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 12);

    // guest has exactly one rule
    let (status, body) = send(
        &app,
        "GET",
        "/api/admin/rules?role_id=4",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rules = body.as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["element"], "products");
}

#[tokio::test]
async fn unmapped_methods_get_405() {
    let app = test_app().await;
    let token = login(&app, "admin@example.com", "admin123").await;

    let (status, _) = send(&app, "PATCH", "/api/products/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
