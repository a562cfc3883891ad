use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{QueryParams, non_empty};
use crate::{
    AppState,
    auth::{AuthUser, ops},
    error::{AppError, Result},
    listing::ListParams,
    models::{CreatedResponse, Role, RoleDetails, RoleList, RoleRequest},
};

#[utoipa::path(
    get,
    path = "/roles",
    params(ListParams),
    responses(
        (status = 200, description = "Roles", body = RoleList),
        (status = 403, description = "Missing 'List Roles'")
    )
)]
pub async fn list_roles(
    auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<RoleList>> {
    auth.require(ops::LIST_ROLES).await?;
    let query = params.validate::<Role>()?;
    let (total, items) = state.repo.list_roles(&query).await?;
    Ok(Json(RoleList { total, items }))
}

/// all_roles
///
/// [Authenticated Route] Every role, unpaginated. Used by clients to fill role pickers.
#[utoipa::path(
    get,
    path = "/roles/all",
    responses((status = 200, description = "All roles", body = [Role]))
)]
pub async fn all_roles(_auth: AuthUser, State(state): State<AppState>) -> Result<Json<Vec<Role>>> {
    Ok(Json(state.repo.all_roles().await?))
}

/// create_role
///
/// [Admin Route] Creates a role together with its operation set.
#[utoipa::path(
    post,
    path = "/roles",
    request_body = RoleRequest,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 400, description = "Unknown operation id"),
        (status = 403, description = "Missing 'Add Role'"),
        (status = 409, description = "Role name taken")
    )
)]
pub async fn create_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RoleRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    auth.require(ops::ADD_ROLE).await?;
    let name = non_empty("name", &payload.name)?;

    let role = state.repo.create_role(&name, &payload.operations).await?;
    tracing::info!(role_id = %role.id, name = %role.name, "role created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: role.id })))
}

/// get_role
///
/// [Admin Route] A role with its operations, as loaded by the role editor. Gated on
/// `Update Role`.
#[utoipa::path(
    get,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Found", body = RoleDetails),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleDetails>> {
    auth.require(ops::UPDATE_ROLE).await?;
    let role = state
        .repo
        .get_role(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role {id}")))?;
    Ok(Json(role))
}

/// update_role
///
/// [Admin Route] Replaces the name and the whole operation set.
#[utoipa::path(
    put,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = RoleRequest,
    responses(
        (status = 204, description = "Updated"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Role name taken")
    )
)]
pub async fn update_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> Result<StatusCode> {
    auth.require(ops::UPDATE_ROLE).await?;
    let name = non_empty("name", &payload.name)?;

    if !state.repo.update_role(id, &name, &payload.operations).await? {
        return Err(AppError::NotFound(format!("role {id}")));
    }
    tracing::info!(role_id = %id, "role updated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Role still assigned to users, or the sign-up role")
    )
)]
pub async fn delete_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require(ops::DELETE_ROLE).await?;
    let role = state
        .repo
        .get_role(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role {id}")))?;
    // Sign-up resolves DEFAULT_ROLE by name on every request.
    if role.name.to_lowercase() == state.config.default_role.to_lowercase() {
        return Err(AppError::Conflict(format!(
            "role '{}' is assigned at sign-up",
            role.name
        )));
    }
    if !state.repo.delete_role(id).await? {
        return Err(AppError::NotFound(format!("role {id}")));
    }
    tracing::info!(role_id = %id, "role deleted");
    Ok(StatusCode::NO_CONTENT)
}
