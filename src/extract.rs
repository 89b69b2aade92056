use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::ApiError;

/// A JSON body whose rejection renders as a 400 with a `{"message": ...}` body.
///
/// Unlike [`axum::Json`], no `Content-Type` check is made.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::Validation("failed to read request body".to_string()))?;
        serde_json::from_slice::<T>(&bytes)
            .map(ApiJson)
            .map_err(|e| ApiError::Validation(format!("invalid json: {}", e)))
    }
}
