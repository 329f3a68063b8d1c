//! Property browsing and administration procedures

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use realty_core::{Property, PropertyFilter, PropertyImage, PropertyInput, PropertyStatus, PropertyUpdate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::rpc::{IdInput, RpcInput};
use super::session::AdminUser;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::oauth::IdentityProvider;
use crate::state::AppState;
use crate::store::Store;

/// A listing together with its ordered images
#[derive(Serialize)]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    pub images: Vec<PropertyImage>,
}

/// POST /api/rpc/properties.list
pub async fn list<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    RpcInput(filter): RpcInput<PropertyFilter>,
) -> Result<Json<Vec<Property>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.store.list_properties(&filter)?))
}

/// POST /api/rpc/properties.get
pub async fn get<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    RpcInput(input): RpcInput<IdInput>,
) -> Result<Json<PropertyDetail>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let property = state
        .store
        .get_property(input.id)?
        .ok_or(AppError::NotFound("Property"))?;
    let images = state.store.list_images(property.id)?;
    Ok(Json(PropertyDetail { property, images }))
}

/// POST /api/rpc/propertiesAdmin.create
pub async fn create<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<PropertyInput>,
) -> Result<Json<Property>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let property = state.store.create_property(input.validate()?)?;
    tracing::info!(property_id = property.id, "Property created");
    Ok(Json(property))
}

#[derive(Deserialize)]
pub struct UpdatePropertyInput {
    pub id: i64,
    #[serde(flatten)]
    pub update: PropertyUpdate,
}

/// POST /api/rpc/propertiesAdmin.update
pub async fn update<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<UpdatePropertyInput>,
) -> Result<Json<Property>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    Ok(Json(state.store.update_property(input.id, input.update)?))
}

#[derive(Deserialize)]
pub struct SetStatusInput {
    pub id: i64,
    pub status: PropertyStatus,
}

/// POST /api/rpc/propertiesAdmin.setStatus
pub async fn set_status<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<SetStatusInput>,
) -> Result<Json<Property>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let update = PropertyUpdate {
        status: Some(input.status),
        ..Default::default()
    };
    Ok(Json(state.store.update_property(input.id, update)?))
}

/// POST /api/rpc/propertiesAdmin.delete
pub async fn delete<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<IdInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    state.store.delete_property(input.id)?;
    tracing::info!(property_id = input.id, "Property deleted");
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddImageInput {
    pub property_id: i64,
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// POST /api/rpc/images.add
pub async fn add_image<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<AddImageInput>,
) -> Result<Json<PropertyImage>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let url = input.url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("image url is required".to_string()));
    }
    let image = state
        .store
        .add_image(input.property_id, url, input.caption.as_deref())?;
    Ok(Json(image))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderImagesInput {
    pub property_id: i64,
    pub image_ids: Vec<i64>,
}

/// POST /api/rpc/images.reorder
pub async fn reorder_images<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<ReorderImagesInput>,
) -> Result<Json<Vec<PropertyImage>>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    let images = state
        .store
        .reorder_images(input.property_id, &input.image_ids)?;
    Ok(Json(images))
}

/// POST /api/rpc/images.delete
pub async fn delete_image<S, P, N>(
    State(state): State<Arc<AppState<S, P, N>>>,
    _admin: AdminUser,
    RpcInput(input): RpcInput<IdInput>,
) -> Result<Json<Value>, AppError>
where
    S: Store,
    P: IdentityProvider,
    N: Notifier,
{
    if !state.store.delete_image(input.id)? {
        return Err(AppError::NotFound("Image"));
    }
    Ok(Json(json!({ "success": true })))
}
