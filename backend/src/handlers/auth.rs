use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, SignUpRequest, UpdateProfileRequest,
        User, UserProfile,
    },
};

fn session(state: &AppState, user: User) -> Result<Json<AuthResponse>> {
    let token = state.tokens.issue(user.id)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// login
///
/// [Public Route] Exchanges email and password for a session token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state
        .credentials
        .authenticate(&payload.email, &payload.password)
        .await?;
    tracing::debug!(user_id = %user.id, "login succeeded");
    session(&state, user)
}

/// sign_up
///
/// [Public Route] Self-registration. New accounts get the configured default role
/// and are logged in straight away.
#[utoipa::path(
    post,
    path = "/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<AuthResponse>> {
    let role = state
        .repo
        .find_role_by_name(&state.config.default_role)
        .await?
        .ok_or_else(|| {
            AppError::Internal(format!(
                "default role '{}' is not seeded",
                state.config.default_role
            ))
        })?;

    let user = state
        .credentials
        .create_user(&payload.email, &payload.password, role.id)
        .await?;
    session(&state, user)
}

#[utoipa::path(
    post,
    path = "/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state
        .credentials
        .change_password(&auth.user, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::OK)
}

/// get_profile
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Current user", body = UserProfile))
)]
pub async fn get_profile(auth: AuthUser) -> Json<UserProfile> {
    Json(auth.user.into())
}

#[utoipa::path(
    put,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let user = state
        .credentials
        .update_profile(auth.id(), payload.email.as_deref(), None)
        .await?;
    Ok(Json(user.into()))
}
