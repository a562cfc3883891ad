//! HTTP handlers, one module per resource.
//!
//! Every handler returns `crate::error::Result`, so failures reach the client as the
//! JSON error body produced by `AppError`. Protected handlers take the `AuthUser`
//! extractor and call `require` with the operation they perform before touching state.

pub mod auth;
pub mod comments;
pub mod movies;
pub mod operations;
pub mod ratings;
pub mod roles;
pub mod users;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

/// QueryParams
///
/// `Query` whose rejection is an `AppError::BadRequest`, so a malformed query
/// string (`start=abc`) gets the same JSON error body as every other failure.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }
}

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
