use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::test::RequestBuilder;

use roomstay_auth::auth::user::{Account, UserRole};
use roomstay_auth::config::ServerConfig;
use roomstay_auth::server::{routes, AppState};
use roomstay_auth::storage::MemoryAccountStore;

const SECRET: &str = "k7Qv2pX9mR4tL8wZ3nB6yH1cF5jD0sGa";
const LOCKED_MESSAGE: &str = "Account is temporarily locked due to too many failed login attempts";

fn state(development_mode: bool) -> Arc<AppState> {
    let mut config = ServerConfig::with_secret(SECRET).unwrap();
    config.argon2_memory_kib = 1024;
    config.argon2_iterations = 1;
    config.login_min_duration = Duration::ZERO;
    config.development_mode = development_mode;
    Arc::new(AppState::new(config, Arc::new(MemoryAccountStore::new())).unwrap())
}

async fn send(state: &Arc<AppState>, request: RequestBuilder) -> (StatusCode, Value) {
    let response = request.reply(&routes(state.clone())).await;
    let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (response.status(), body)
}

fn post(path: &str, body: Value) -> RequestBuilder {
    warp::test::request().method("POST").path(path).json(&body)
}

fn authed(method: &str, path: &str, token: &str) -> RequestBuilder {
    warp::test::request()
        .method(method)
        .path(path)
        .header("authorization", format!("Bearer {}", token))
}

fn registration() -> Value {
    json!({
        "fullName": "Nguyen Van A",
        "email": "a@x.com",
        "phone": "0123456789",
        "password": "Test123456",
        "confirmPassword": "Test123456"
    })
}

async fn register_and_login(state: &Arc<AppState>) -> String {
    let (status, _) = send(state, post("/api/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        state,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "a@x.com", "password": "Test123456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_end_to_end_flow() {
    let app = state(false);

    let (status, body) = send(&app, post("/api/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
    assert_eq!(body["data"]["user"]["role"], "tenant");
    assert!(body["data"]["token"].is_string());
    assert!(!body.to_string().contains("Test123456"));

    let (status, body) = send(
        &app,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "a@x.com", "password": "Test123456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["user"]["lastLogin"].is_string());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, authed("GET", "/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "a@x.com");

    let (status, body) = send(&app, warp::test::request().path("/api/auth/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    for _ in 0..5 {
        let (status, body) = send(
            &app,
            post(
                "/api/auth/login",
                json!({ "emailOrPhone": "a@x.com", "password": "Wrong123456" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid login credentials");
    }

    let (status, body) = send(
        &app,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "a@x.com", "password": "Test123456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], LOCKED_MESSAGE);
}

#[tokio::test]
async fn test_login_by_phone() {
    let app = state(false);
    send(&app, post("/api/auth/register", registration())).await;

    let (status, _) = send(
        &app,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "0123456789", "password": "Test123456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = state(false);
    let (status, body) = send(
        &app,
        post(
            "/api/auth/register",
            json!({
                "fullName": "A",
                "email": "bad",
                "phone": "123",
                "password": "short",
                "confirmPassword": "other"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request data");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"fullName"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"phone"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"confirmPassword"));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = state(false);
    send(&app, post("/api/auth/register", registration())).await;

    let (status, body) = send(&app, post("/api/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = state(false);
    let request = warp::test::request()
        .method("POST")
        .path("/api/auth/login")
        .header("content-type", "application/json")
        .body("{not json");

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request data");
}

#[tokio::test]
async fn test_logout_and_change_password() {
    let app = state(false);
    let token = register_and_login(&app).await;

    let (status, body) = send(&app, authed("POST", "/api/auth/logout", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, _) = send(
        &app,
        authed("POST", "/api/auth/change-password", &token).json(&json!({
            "currentPassword": "NotMine123",
            "newPassword": "Newpass789",
            "confirmNewPassword": "Newpass789"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        authed("POST", "/api/auth/change-password", &token).json(&json!({
            "currentPassword": "Test123456",
            "newPassword": "Newpass789",
            "confirmNewPassword": "Newpass789"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "a@x.com", "password": "Newpass789" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_in_development_mode() {
    let app = state(true);
    send(&app, post("/api/auth/register", registration())).await;

    let (status, body) = send(
        &app,
        post("/api/auth/forgot-password", json!({ "email": "a@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["data"]["resetToken"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post(
            "/api/auth/reset-password",
            json!({
                "email": "a@x.com",
                "token": "wrong-token",
                "newPassword": "Newpass789",
                "confirmNewPassword": "Newpass789"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post(
            "/api/auth/reset-password",
            json!({
                "email": "a@x.com",
                "token": reset_token,
                "newPassword": "Newpass789",
                "confirmNewPassword": "Newpass789"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "a@x.com", "password": "Newpass789" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_hides_token_in_production() {
    let app = state(false);
    send(&app, post("/api/auth/register", registration())).await;

    let (status, body) = send(
        &app,
        post("/api/auth/forgot-password", json!({ "email": "a@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("data").is_none());

    let (status, _) = send(
        &app,
        post("/api/auth/forgot-password", json!({ "email": "ghost@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post("/api/auth/forgot-password", json!({ "email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_preferences_and_stats() {
    let app = state(false);
    let token = register_and_login(&app).await;

    let (status, body) = send(&app, authed("GET", "/api/user/profile", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["fullName"], "Nguyen Van A");

    let (status, body) = send(
        &app,
        authed("PUT", "/api/user/profile", &token).json(&json!({
            "fullName": "Nguyen Van B",
            "gender": "male",
            "address": {
                "street": "12 Le Loi",
                "ward": "Ben Nghe",
                "district": "District 1",
                "city": "Ho Chi Minh City"
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["fullName"], "Nguyen Van B");
    assert_eq!(
        body["data"]["user"]["address"]["fullAddress"],
        "12 Le Loi, Ben Nghe, District 1, Ho Chi Minh City"
    );

    let (status, body) = send(
        &app,
        authed("PUT", "/api/user/preferences", &token).json(&json!({
            "budget": { "min": 2000000, "max": 4000000 },
            "roomType": "shared",
            "location": ["District 1", "District 3"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["preferences"]["roomType"], "shared");
    assert_eq!(body["data"]["preferences"]["location"][1], "District 3");

    let (status, _) = send(
        &app,
        authed("PUT", "/api/user/preferences", &token)
            .json(&json!({ "budget": { "min": 5, "max": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, authed("GET", "/api/user/stats", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accountAgeDays"], 0);
    assert_eq!(body["data"]["isVerified"], false);
    assert!(body["data"]["lastLogin"].is_string());
}

#[tokio::test]
async fn test_deleted_account_tokens_stop_working() {
    let app = state(false);
    let token = register_and_login(&app).await;

    let (status, _) = send(&app, authed("DELETE", "/api/user/account", &token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, authed("GET", "/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account disabled");

    let (status, _) = send(
        &app,
        post(
            "/api/auth/login",
            json!({ "emailOrPhone": "a@x.com", "password": "Test123456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_landlord_cannot_set_tenant_preferences() {
    let app = state(false);

    let mut landlord = Account::new(
        "Le Thi C".to_string(),
        "landlord@x.com".to_string(),
        "0987654321".to_string(),
        "$argon2id$stub".to_string(),
    );
    landlord.role = UserRole::Landlord;
    let landlord = app.store.insert(landlord).await.unwrap();
    let token = app.tokens.issue(&landlord.identity()).unwrap();

    let (status, body) = send(
        &app,
        authed("PUT", "/api/user/preferences", &token).json(&json!({ "roomType": "single" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Only tenants can access this resource");

    // Routes open to any role still work for the same token
    let (status, _) = send(&app, authed("GET", "/api/user/profile", &token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_status_is_optional() {
    let app = state(false);
    let token = register_and_login(&app).await;

    let (status, body) = send(&app, warp::test::request().path("/api/auth/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], false);

    let (status, body) = send(&app, authed("GET", "/api/auth/status", "garbage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], false);

    let (_, body) = send(&app, authed("GET", "/api/auth/status", &token)).await;
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let app = state(false);

    let response = warp::test::request()
        .path("/health")
        .reply(&routes(app.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"OK");

    let (status, body) = send(&app, warp::test::request().path("/api/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_api_responses_carry_security_headers() {
    let app = state(false);
    let response = warp::test::request()
        .path("/api/auth/me")
        .reply(&routes(app))
        .await;

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers["cache-control"].to_str().unwrap().contains("no-store"));
}
