//! HTTP handlers, grouped by resource. Route wiring lives in `crate::routes`.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

pub mod accounts;
pub mod catalog;
pub mod categories;
pub mod media;
pub mod products;
pub mod translate;

/// JsonBody
///
/// `Json<T>` whose rejection is an `AppError::Validation`, so malformed bodies get the
/// same `{"error": ...}` shape and 400 status as every other input error.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(request, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| AppError::Validation(rejection.body_text()))
    }
}

/// Parses a numeric path id; anything else is a 400 naming the resource.
pub fn parse_id(raw: &str, resource: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::Validation(format!("Invalid {resource} ID")))
}
