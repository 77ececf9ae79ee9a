use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use roomstay_auth::auth::token::{extract_bearer_token, TokenManager};
use roomstay_auth::auth::user::{IdentityContext, UserRole};
use roomstay_auth::error::RoomStayError;

const SECRET: &str = "k7Qv2pX9mR4tL8wZ3nB6yH1cF5jD0sGa";
const OTHER_SECRET: &str = "Zr8Lw3Nq6Tb1Yc9Vm4Hx7Kp2Fd5Gs0Ja";

fn identity() -> IdentityContext {
    IdentityContext {
        id: "0b7e4a52-5f0e-4c1a-9f43-2f1f0d8d9c11".to_string(),
        email: "a@x.com".to_string(),
        role: UserRole::Tenant,
    }
}

fn manager() -> TokenManager {
    TokenManager::new(SECRET, Duration::days(7))
}

#[test]
fn test_token_generation_and_validation() {
    let tm = manager();
    let token = tm.issue(&identity()).unwrap();

    let claims = tm.verify(&token).unwrap();
    assert_eq!(claims.id, identity().id);
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.role, UserRole::Tenant);
    assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    assert!(!claims.is_expired());
    assert_eq!(claims.identity(), identity());
}

#[test]
fn test_expired_token_is_rejected_as_expired() {
    let tm = manager();
    let token = tm.issue_at(&identity(), Utc::now() - Duration::days(8)).unwrap();

    assert!(matches!(tm.verify(&token), Err(RoomStayError::TokenExpired)));
}

#[test]
fn test_token_just_inside_window_is_accepted() {
    let tm = manager();
    let issued = Utc::now() - Duration::days(7) + Duration::minutes(1);
    let token = tm.issue_at(&identity(), issued).unwrap();

    assert!(tm.verify(&token).is_ok());
}

#[test]
fn test_token_signed_with_other_key_is_invalid() {
    let token = TokenManager::new(OTHER_SECRET, Duration::days(7))
        .issue(&identity())
        .unwrap();

    assert!(matches!(manager().verify(&token), Err(RoomStayError::TokenInvalid)));
}

#[test]
fn test_tampered_payload_is_invalid() {
    let tm = manager();
    let token = tm.issue(&identity()).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    // Promote the caller to admin without re-signing
    let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
    let mut claims: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    claims["role"] = serde_json::json!("admin");
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    assert!(matches!(tm.verify(&forged), Err(RoomStayError::TokenInvalid)));
}

#[test]
fn test_malformed_tokens_are_invalid() {
    let tm = manager();
    for token in ["", "not-a-token", "a.b.c", "a.b"] {
        assert!(
            matches!(tm.verify(token), Err(RoomStayError::TokenInvalid)),
            "accepted {:?}",
            token
        );
    }
}

#[test]
fn test_bearer_token_extraction() {
    assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    assert_eq!(extract_bearer_token("Bearer   abc "), Some("abc"));
    assert_eq!(extract_bearer_token("Bearer "), None);
    assert_eq!(extract_bearer_token("Basic dXNlcjpwYXNz"), None);
    assert_eq!(extract_bearer_token("abc.def.ghi"), None);
}
