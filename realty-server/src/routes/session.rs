//! Session cookie helpers

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Uri};
use realty_core::cookies::clear_all;
use realty_core::CookiePolicy;
use tower_cookies::Cookies;

use crate::authz::{require_admin, require_user};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::oauth::IdentityProvider;
use crate::state::AppState;
use crate::store::{Store, User};

/// Current session cookie
pub const SESSION_COOKIE: &str = "app_session_id";

/// Names earlier releases stored the session under
pub const LEGACY_SESSION_COOKIES: [&str; 3] = ["session", "session_token", "auth_token"];

/// Every name a logout has to clear
pub fn all_session_cookies() -> [&'static str; 4] {
    [
        SESSION_COOKIE,
        LEGACY_SESSION_COOKIES[0],
        LEGACY_SESSION_COOKIES[1],
        LEGACY_SESSION_COOKIES[2],
    ]
}

/// Cookie policy for the transport this request arrived over
pub fn request_policy(headers: &HeaderMap, uri: &Uri) -> CookiePolicy {
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok());
    CookiePolicy::derive(forwarded, uri.scheme_str())
}

/// Collect raw `Set-Cookie` values into headers, keeping duplicates of one name
pub fn set_cookie_headers(values: impl IntoIterator<Item = String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for value in values {
        match HeaderValue::from_str(&value) {
            Ok(v) => {
                headers.append(SET_COOKIE, v);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping unencodable Set-Cookie value"),
        }
    }
    headers
}

/// Headers that set the session cookie
pub fn session_cookie_headers(policy: CookiePolicy, token: &str, max_age_secs: i64) -> HeaderMap {
    set_cookie_headers([policy.set_header(SESSION_COOKIE, token, max_age_secs)])
}

/// Headers that clear the session cookie and every legacy name under every policy variant
pub fn clear_session_headers(policy: CookiePolicy) -> HeaderMap {
    set_cookie_headers(clear_all(&all_session_cookies(), policy))
}

/// Resolve the caller from the session cookie. Any failure means no session.
pub fn current_user<S, P, N>(state: &AppState<S, P, N>, cookies: &Cookies) -> Option<User>
where
    S: Store,
{
    let token = cookies.get(SESSION_COOKIE)?;
    let claims = state.codec.verify(token.value())?;

    match state.store.get_user_by_open_id(&claims.open_id) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load session user");
            None
        }
    }
}

async fn resolve_caller<S, P, N>(
    parts: &mut Parts,
    state: &Arc<AppState<S, P, N>>,
) -> Result<Option<User>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let cookies = Cookies::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;
    Ok(current_user(state, &cookies))
}

/// The signed-in caller. Rejects with 401 before the body is read.
pub struct SessionUser(pub User);

#[async_trait]
impl<S, P, N> FromRequestParts<Arc<AppState<S, P, N>>> for SessionUser
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S, P, N>>,
    ) -> Result<Self, Self::Rejection> {
        let caller = resolve_caller(parts, state).await?;
        require_user(caller).map(Self)
    }
}

/// A signed-in admin. Rejects with 401 / 403 before the body is read.
pub struct AdminUser(pub User);

#[async_trait]
impl<S, P, N> FromRequestParts<Arc<AppState<S, P, N>>> for AdminUser
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S, P, N>>,
    ) -> Result<Self, Self::Rejection> {
        let caller = resolve_caller(parts, state).await?;
        require_admin(caller).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_policy_uses_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http, HTTPS"));
        let uri: Uri = "/api/auth/me".parse().unwrap();

        let policy = request_policy(&headers, &uri);
        assert!(policy.secure);

        let policy = request_policy(&HeaderMap::new(), &uri);
        assert!(!policy.secure);
    }

    #[test]
    fn test_clear_session_headers_cover_every_name() {
        let headers = clear_session_headers(CookiePolicy::derive(None, None));
        let values: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();

        for name in all_session_cookies() {
            let prefix = format!("{}=;", name);
            assert_eq!(values.iter().filter(|v| v.starts_with(&prefix)).count(), 2);
        }
    }
}
