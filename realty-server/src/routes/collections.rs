//! Per-user collections: favorites, saved searches, comparison list

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use realty_core::PropertyFilter;
use serde::Deserialize;
use serde_json::{json, Value};

use super::rpc::{IdInput, PropertyIdInput, RpcInput};
use super::session::SessionUser;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::oauth::IdentityProvider;
use crate::state::AppState;
use crate::store::{ComparisonEntry, Favorite, SavedSearch, Store};

/// Most properties a comparison list can hold
pub const MAX_COMPARISON_ENTRIES: usize = 4;

fn ensure_property<S: Store>(store: &S, property_id: i64) -> Result<(), AppError> {
    store
        .get_property(property_id)?
        .map(|_| ())
        .ok_or(AppError::NotFound("Property"))
}

/// POST /api/rpc/favorites.list
pub async fn list_favorites<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<Favorite>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.store.list_favorites(user.id)?))
}

/// POST /api/rpc/favorites.add
pub async fn add_favorite<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<PropertyIdInput>,
) -> Result<Json<Favorite>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    ensure_property(state.store.as_ref(), input.property_id)?;
    Ok(Json(state.store.add_favorite(user.id, input.property_id)?))
}

/// POST /api/rpc/favorites.remove
pub async fn remove_favorite<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<PropertyIdInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    state.store.remove_favorite(user.id, input.property_id)?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/rpc/savedSearches.list
pub async fn list_saved_searches<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<SavedSearch>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.store.list_saved_searches(user.id)?))
}

#[derive(Deserialize)]
pub struct CreateSavedSearchInput {
    pub name: String,
    #[serde(default)]
    pub filter: PropertyFilter,
}

/// POST /api/rpc/savedSearches.create
pub async fn create_saved_search<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<CreateSavedSearchInput>,
) -> Result<Json<SavedSearch>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("search name is required".to_string()));
    }
    Ok(Json(state.store.create_saved_search(user.id, name, &input.filter)?))
}

/// POST /api/rpc/savedSearches.delete
pub async fn delete_saved_search<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<IdInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    if !state.store.delete_saved_search(user.id, input.id)? {
        return Err(AppError::NotFound("Saved search"));
    }
    Ok(Json(json!({ "success": true })))
}

/// POST /api/rpc/comparison.list
pub async fn list_comparison<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<ComparisonEntry>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.store.list_comparison(user.id)?))
}

/// POST /api/rpc/comparison.add
pub async fn add_comparison<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<PropertyIdInput>,
) -> Result<Json<ComparisonEntry>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    ensure_property(state.store.as_ref(), input.property_id)?;

    let current = state.store.list_comparison(user.id)?;
    if let Some(existing) = current.iter().find(|e| e.property_id == input.property_id) {
        return Ok(Json(existing.clone()));
    }
    if current.len() >= MAX_COMPARISON_ENTRIES {
        return Err(AppError::Validation(format!(
            "at most {} properties can be compared",
            MAX_COMPARISON_ENTRIES
        )));
    }

    Ok(Json(state.store.add_comparison(user.id, input.property_id)?))
}

/// POST /api/rpc/comparison.remove
pub async fn remove_comparison<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
    RpcInput(input): RpcInput<PropertyIdInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    state.store.remove_comparison(user.id, input.property_id)?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/rpc/comparison.clear
pub async fn clear_comparison<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    SessionUser(user): SessionUser,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    state.store.clear_comparison(user.id)?;
    Ok(Json(json!({ "success": true })))
}
