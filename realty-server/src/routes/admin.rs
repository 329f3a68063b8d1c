//! Admin UI token gate
//!
//! The admin bundle under `/admin` is guarded by a static token held in a
//! cookie. This is separate from OAuth sessions and never consulted by RPC.

use std::sync::Arc;

use axum::extract::{OriginalUri, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use realty_core::cookies::clear_variants;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::rpc::RpcInput;
use super::session::{request_policy, set_cookie_headers};
use crate::crypto::constant_time_eq;
use crate::error::AppError;
use crate::state::AppState;

/// Cookie carrying the admin token
pub const ADMIN_COOKIE: &str = "admin_token";

/// Admin cookie lifetime (12 hours)
pub const ADMIN_COOKIE_MAX_AGE_SECS: i64 = 12 * 60 * 60;

const DEFAULT_REDIRECT: &str = "/admin";

/// Paths below `/admin` reachable without the token
const OPEN_PATHS: [&str; 2] = ["/login", "/logout"];

fn token_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) => {
            constant_time_eq(expected.as_bytes(), presented.as_bytes())
        }
        _ => false,
    }
}

/// Only same-site absolute paths are followed after login
fn safe_redirect(target: Option<&str>) -> String {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => {
            t.to_string()
        }
        _ => DEFAULT_REDIRECT.to_string(),
    }
}

/// Middleware in front of the admin bundle
pub async fn admin_gate<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
    N: Send + Sync + 'static,
{
    if OPEN_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let presented = cookies.get(ADMIN_COOKIE);
    if token_matches(
        state.config.admin_token.as_deref(),
        presented.as_ref().map(|c| c.value()),
    ) {
        return next.run(request).await;
    }

    let original = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let target = original
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_REDIRECT.to_string());

    tracing::debug!(path = %target, "Admin token missing or invalid");
    Redirect::to(&format!(
        "/admin/login?redirect={}",
        urlencoding::encode(&target)
    ))
    .into_response()
}

/// GET /admin/login
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub token: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Serialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub redirect: String,
}

/// POST /admin/login
pub async fn login<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    RpcInput(req): RpcInput<AdminLoginRequest>,
) -> Result<Response, AppError>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
    N: Send + Sync + 'static,
{
    if !token_matches(state.config.admin_token.as_deref(), Some(req.token.as_str())) {
        tracing::warn!("Rejected admin login");
        return Err(AppError::InvalidCredentials);
    }

    let policy = request_policy(&headers, &uri);
    let cookie = policy.set_header(ADMIN_COOKIE, &req.token, ADMIN_COOKIE_MAX_AGE_SECS);

    Ok((
        set_cookie_headers([cookie]),
        Json(AdminLoginResponse {
            success: true,
            redirect: safe_redirect(req.redirect.as_deref()),
        }),
    )
        .into_response())
}

/// POST /admin/logout
pub async fn logout(headers: HeaderMap, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let policy = request_policy(&headers, &uri);
    (
        set_cookie_headers(clear_variants(ADMIN_COOKIE, policy)),
        Json(serde_json::json!({ "success": true })),
    )
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Admin sign in</title></head>
<body>
<form id="login">
  <label>Admin token <input type="password" name="token" autofocus></label>
  <button type="submit">Sign in</button>
  <p id="error" hidden>Invalid token</p>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (event) => {
  event.preventDefault();
  const redirect = new URLSearchParams(location.search).get("redirect");
  const res = await fetch("/admin/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ token: event.target.token.value, redirect }),
  });
  if (res.ok) {
    location.href = (await res.json()).redirect;
  } else {
    document.getElementById("error").hidden = false;
  }
});
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches(Some("s3cret"), Some("s3cret")));
        assert!(!token_matches(Some("s3cret"), Some("s3cret!")));
        assert!(!token_matches(Some("s3cret"), None));
        assert!(!token_matches(None, Some("anything")));
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/admin/viewings?page=2")), "/admin/viewings?page=2");
        assert_eq!(safe_redirect(Some("//evil.example")), "/admin");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/admin");
        assert_eq!(safe_redirect(None), "/admin");
    }
}
