//! Session resolution and logout cookie clearing

mod common;

use axum::http::{HeaderName, HeaderValue};
use common::{create_test_app, set_cookies};
use cookie::Cookie;
use realty_core::Role;
use realty_server::routes::{all_session_cookies, SESSION_COOKIE};
use serde_json::Value;

#[tokio::test]
async fn test_me_without_cookie_is_null() {
    let app = create_test_app();

    let response = app.server.get("/api/auth/me").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>(), Value::Null);
}

#[tokio::test]
async fn test_me_with_tampered_token_is_null() {
    let app = create_test_app();
    let cookie = app.login_as("visitor", Role::User);
    let tampered = format!("{}x", cookie.value());

    let response = app
        .server
        .get("/api/auth/me")
        .add_cookie(Cookie::new(SESSION_COOKIE, tampered))
        .await;
    assert_eq!(response.json::<Value>(), Value::Null);
}

#[tokio::test]
async fn test_me_for_unknown_user_is_null() {
    let app = create_test_app();
    let token = app
        .state
        .codec
        .issue("never-synced", "Ghost", realty_core::session_ttl())
        .unwrap();

    let response = app
        .server
        .get("/api/auth/me")
        .add_cookie(Cookie::new(SESSION_COOKIE, token))
        .await;
    assert_eq!(response.json::<Value>(), Value::Null);
}

#[tokio::test]
async fn test_me_returns_session_user() {
    let app = create_test_app();
    let cookie = app.login_as("visitor", Role::Admin);

    let response = app.server.get("/api/auth/me").add_cookie(cookie).await;
    let body: Value = response.json();
    assert_eq!(body["openId"], "visitor");
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_logout_clears_every_name_and_variant() {
    let app = create_test_app();

    let response = app.server.post("/api/auth/logout").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["success"], true);

    let cookies = set_cookies(&response);
    // Insecure request: the current policy equals the lax fallback
    assert_eq!(cookies.len(), 8);

    for name in all_session_cookies() {
        let variants: Vec<&String> = cookies
            .iter()
            .filter(|c| c.starts_with(&format!("{}=;", name)))
            .collect();
        assert_eq!(variants.len(), 2, "{}", name);
        assert!(variants.iter().all(|c| c.contains("Max-Age=0")));
        assert!(variants.iter().any(|c| c.contains("Secure")));
        assert!(variants.iter().any(|c| !c.contains("Secure")));
    }

    let mut unique = cookies.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), cookies.len());
}

#[tokio::test]
async fn test_logout_over_https_has_no_duplicates() {
    let app = create_test_app();

    let response = app
        .server
        .post("/api/auth/logout")
        .add_header(
            HeaderName::from_static("x-forwarded-proto"),
            HeaderValue::from_static("https"),
        )
        .await;

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 8);
    let mut unique = cookies.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 8);
}

#[tokio::test]
async fn test_get_logout_redirects_home() {
    let app = create_test_app();

    let response = app.server.get("/logout").await;
    assert_eq!(response.status_code(), 303);
    assert_eq!(response.header("location"), "/");
    assert_eq!(set_cookies(&response).len(), 8);
}
