use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::QueryParams;
use crate::{AppState, auth::AuthUser, error::Result, models::Operation};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OperationQuery {
    /// Operation name, e.g. `Add Role`.
    pub operation: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OperationCheck {
    pub operation: String,
    pub allowed: bool,
}

/// verify_operation
///
/// [Authenticated Route] Runs the authorization gate for a single named operation.
/// Answers 200 when the caller's role holds it and 403 otherwise.
#[utoipa::path(
    get,
    path = "/operations/verify",
    params(OperationQuery),
    responses(
        (status = 200, description = "Allowed", body = OperationCheck),
        (status = 403, description = "Denied")
    )
)]
pub async fn verify_operation(
    auth: AuthUser,
    QueryParams(query): QueryParams<OperationQuery>,
) -> Result<Json<OperationCheck>> {
    auth.require(&query.operation).await?;
    Ok(Json(OperationCheck {
        operation: query.operation,
        allowed: true,
    }))
}

#[utoipa::path(
    get,
    path = "/operations/all",
    responses((status = 200, description = "Operation registry", body = [Operation]))
)]
pub async fn list_operations(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Operation>>> {
    Ok(Json(state.repo.list_operations().await?))
}
