//! Authentication endpoints: OAuth callback, local accounts, logout

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use realty_core::user::role_on_sync;
use realty_core::{session_ttl, SESSION_TTL_SECS};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::rpc::RpcInput;
use super::session::{clear_session_headers, current_user, request_policy, session_cookie_headers};
use crate::crypto::{check_password_length, generate_local_open_id, hash_password, password_matches};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::oauth::{decode_state, IdentityProvider};
use crate::state::AppState;
use crate::store::{Store, UpsertUser, User};

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// GET /api/oauth/callback
pub async fn oauth_callback<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let (Some(code), Some(oauth_state)) = (non_empty(params.code), non_empty(params.state)) else {
        return Err(AppError::Validation("code and state are required".to_string()));
    };

    let user = match sync_oauth_user(&state, &code, &oauth_state).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "OAuth callback failed");
            return Err(AppError::Internal("OAuth callback failed".to_string()));
        }
    };

    let token = state
        .codec
        .issue(&user.open_id, user.name.as_deref().unwrap_or_default(), session_ttl())?;
    let cookies = session_cookie_headers(request_policy(&headers, &uri), &token, SESSION_TTL_SECS);

    tracing::info!(open_id = %user.open_id, role = user.role.as_str(), "OAuth login");
    Ok((cookies, Redirect::to("/")).into_response())
}

/// Exchange the code, fetch the identity and upsert the local user
async fn sync_oauth_user<S, P, N>(
    state: &AppState<S, P, N>,
    code: &str,
    oauth_state: &str,
) -> Result<User, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    // A malformed state is a failed exchange, not a client error
    let redirect_uri =
        decode_state(oauth_state).map_err(|e| AppError::Upstream(e.to_string()))?;

    let tokens = state.identity.exchange_code(code, &redirect_uri).await?;
    let info = state.identity.get_user_info(&tokens.access_token).await?;

    let open_id = non_empty(info.open_id.clone())
        .ok_or_else(|| AppError::Upstream("openId missing from user info".to_string()))?;

    let role = role_on_sync(&open_id, state.config.owner_open_id.as_deref());
    state.store.upsert_user(UpsertUser {
        login_method: info.provider(),
        name: info.name,
        email: info.email,
        role,
        open_id,
        ..Default::default()
    })
}

/// GET /api/auth/me
pub async fn me<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    cookies: Cookies,
) -> Json<Option<User>>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Json(current_user(&state, &cookies))
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /api/auth/logout
pub async fn logout(headers: HeaderMap, uri: Uri) -> impl IntoResponse {
    (
        clear_session_headers(request_policy(&headers, &uri)),
        Json(SuccessResponse { success: true }),
    )
}

/// GET /logout
pub async fn logout_redirect(headers: HeaderMap, uri: Uri) -> impl IntoResponse {
    (
        clear_session_headers(request_policy(&headers, &uri)),
        Redirect::to("/"),
    )
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn signed_in<S, P, N>(
    state: &AppState<S, P, N>,
    headers: &HeaderMap,
    uri: &Uri,
    user: User,
) -> Result<Response, AppError> {
    let token = state
        .codec
        .issue(&user.open_id, user.name.as_deref().unwrap_or_default(), session_ttl())?;
    let cookies = session_cookie_headers(request_policy(headers, uri), &token, SESSION_TTL_SECS);
    Ok((cookies, Json(user)).into_response())
}

/// POST /api/auth/register
pub async fn register<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    headers: HeaderMap,
    uri: Uri,
    RpcInput(req): RpcInput<RegisterRequest>,
) -> Result<Response, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    check_password_length(&req.password)?;

    if state.store.get_user_by_email(&email)?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    let open_id = generate_local_open_id();
    let user = state.store.upsert_user(UpsertUser {
        role: role_on_sync(&open_id, state.config.owner_open_id.as_deref()),
        open_id,
        name: Some(name),
        email: Some(email),
        phone: req.phone.filter(|p| !p.trim().is_empty()),
        password_hash: Some(password_hash),
        login_method: Some("email".to_string()),
    })?;

    tracing::info!(open_id = %user.open_id, "Local account registered");
    signed_in(&state, &headers, &uri, user)
}

/// POST /api/auth/login
pub async fn login<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    headers: HeaderMap,
    uri: Uri,
    RpcInput(req): RpcInput<LoginRequest>,
) -> Result<Response, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let user = state
        .store
        .get_user_by_email(&req.email.trim().to_lowercase())?
        .ok_or(AppError::InvalidCredentials)?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;
    if !password_matches(&req.password, hash) {
        return Err(AppError::InvalidCredentials);
    }

    // Re-sync to stamp last_signed_in and the owner role
    let user = state.store.upsert_user(UpsertUser {
        role: role_on_sync(&user.open_id, state.config.owner_open_id.as_deref()),
        open_id: user.open_id,
        ..Default::default()
    })?;

    signed_in(&state, &headers, &uri, user)
}
