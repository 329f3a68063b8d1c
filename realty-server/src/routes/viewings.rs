//! Viewing procedures

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use realty_core::{NewViewing, Viewing, ViewingFilter, ViewingStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use super::rpc::{IdInput, RpcInput};
use super::session::{AdminUser, SessionUser};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::oauth::IdentityProvider;
use crate::state::AppState;
use crate::store::Store;

/// POST /api/rpc/viewings.create
pub async fn create<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<NewViewing>,
) -> Result<Json<Viewing>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let viewing = state.viewings().create(&user, input)?;
    Ok(Json(viewing))
}

/// POST /api/rpc/viewings.mine
pub async fn mine<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<Viewing>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.viewings().list_mine(&user)?))
}

/// POST /api/rpc/viewingsAdmin.listAll
pub async fn list_all<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    AdminUser(user): AdminUser,
    RpcInput(filter): RpcInput<ViewingFilter>,
) -> Result<Json<Vec<Viewing>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.viewings().list_all(&user, &filter)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusInput {
    pub id: i64,
    pub status: ViewingStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

/// POST /api/rpc/viewingsAdmin.updateStatus
pub async fn update_status<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    AdminUser(user): AdminUser,
    RpcInput(input): RpcInput<UpdateStatusInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    state.viewings().update_status(
        &user,
        input.id,
        input.status,
        input.cancellation_reason.as_deref(),
    )?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct BulkUpdateInput {
    pub ids: Vec<i64>,
    pub status: ViewingStatus,
}

/// POST /api/rpc/viewingsAdmin.bulkUpdateStatus
///
/// `count` is the number of ids submitted; `updated` the number that existed.
pub async fn bulk_update_status<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    AdminUser(user): AdminUser,
    RpcInput(input): RpcInput<BulkUpdateInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let outcome = state
        .viewings()
        .bulk_update_status(&user, &input.ids, input.status)?;
    Ok(Json(json!({
        "success": true,
        "count": outcome.count,
        "updated": outcome.updated,
    })))
}

/// POST /api/rpc/viewingsAdmin.delete
pub async fn delete<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    AdminUser(user): AdminUser,
    RpcInput(input): RpcInput<IdInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    state.viewings().delete(&user, input.id)?;
    Ok(Json(json!({ "success": true })))
}
