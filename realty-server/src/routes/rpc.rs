//! Typed decoding of RPC inputs

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::AppError;

/// JSON body of an RPC call, decoded in one step.
///
/// Decode failures become validation errors in the usual error envelope.
pub struct RpcInput<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for RpcInput<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Input of procedures that address a single record
#[derive(Debug, Deserialize)]
pub struct IdInput {
    pub id: i64,
}

/// Input of procedures that address a property
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyIdInput {
    pub property_id: i64,
}
