use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::QueryParams;
use crate::{
    AppState,
    auth::{AuthUser, ops},
    error::{AppError, Result},
    listing::ListParams,
    models::{AddUserRequest, CreatedResponse, UpdateUserRequest, User, UserList, UserProfile},
};

/// list_users
///
/// [Admin Route] Paginated user listing. Soft-deleted accounts are not listed.
#[utoipa::path(
    get,
    path = "/users",
    params(ListParams),
    responses(
        (status = 200, description = "Users", body = UserList),
        (status = 403, description = "Missing 'List Users'")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<UserList>> {
    auth.require(ops::LIST_USERS).await?;
    let query = params.validate::<User>()?;

    let (total, users) = state.repo.list_users(&query).await?;
    Ok(Json(UserList {
        total,
        items: users.into_iter().map(UserProfile::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>> {
    auth.require(ops::LIST_USERS).await?;
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    Ok(Json(user.into()))
}

/// add_user
///
/// [Admin Route] Creates an account with an explicit role.
#[utoipa::path(
    post,
    path = "/users",
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "Created", body = CreatedResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn add_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    auth.require(ops::ADD_USER).await?;
    let user = state
        .credentials
        .create_user(&payload.email, &payload.password, payload.role_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: user.id })))
}

/// update_user
///
/// [Admin Route] Changes email and/or role of another account.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>> {
    auth.require(ops::UPDATE_USER).await?;
    let user = state
        .credentials
        .update_profile(id, payload.email.as_deref(), payload.role_id)
        .await?;
    Ok(Json(user.into()))
}

/// delete_user
///
/// [Admin Route] Soft delete. The account keeps its row but can no longer log in
/// and its outstanding tokens stop resolving.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require(ops::DELETE_USER).await?;
    if id == auth.id() {
        return Err(AppError::BadRequest("you cannot delete your own account".into()));
    }

    if state.repo.delete_user(id).await? {
        tracing::info!(user_id = %id, by = %auth.id(), "user deleted");
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound(format!("user {id}")))
    }
}
