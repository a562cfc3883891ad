use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::User,
    repository::RepositoryState,
    token::TokenService,
};

/// Operation names checked by the authorization gate. The same names are seeded
/// into the `operations` table by the initial migration.
pub mod ops {
    pub const LIST_USERS: &str = "List Users";
    pub const ADD_USER: &str = "Add User";
    pub const UPDATE_USER: &str = "Update User";
    pub const DELETE_USER: &str = "Delete User";

    pub const LIST_ROLES: &str = "List Roles";
    pub const ADD_ROLE: &str = "Add Role";
    pub const UPDATE_ROLE: &str = "Update Role";
    pub const DELETE_ROLE: &str = "Delete Role";

    pub const ADD_MOVIES: &str = "add movies";
    pub const UPDATE_MOVIES: &str = "update movies";
    pub const DELETE_MOVIES: &str = "delete movies";

    pub const ADD_COMMENTS: &str = "add comments";
    pub const UPDATE_COMMENTS: &str = "update comments";
    pub const DELETE_COMMENTS: &str = "delete comments";
    // Delete other users' comments.
    pub const MODERATE_COMMENTS: &str = "moderate comments";

    pub const ADD_RATINGS: &str = "add ratings";
    pub const UPDATE_RATINGS: &str = "update ratings";
    pub const DELETE_RATINGS: &str = "delete ratings";
    pub const MODERATE_RATINGS: &str = "moderate ratings";

    pub const ALL: &[&str] = &[
        LIST_USERS,
        ADD_USER,
        UPDATE_USER,
        DELETE_USER,
        LIST_ROLES,
        ADD_ROLE,
        UPDATE_ROLE,
        DELETE_ROLE,
        ADD_MOVIES,
        UPDATE_MOVIES,
        DELETE_MOVIES,
        ADD_COMMENTS,
        UPDATE_COMMENTS,
        DELETE_COMMENTS,
        MODERATE_COMMENTS,
        ADD_RATINGS,
        UPDATE_RATINGS,
        DELETE_RATINGS,
        MODERATE_RATINGS,
    ];

    /// Operations granted to the seeded `User` role.
    pub const USER_DEFAULTS: &[&str] = &[
        ADD_COMMENTS,
        UPDATE_COMMENTS,
        DELETE_COMMENTS,
        ADD_RATINGS,
        UPDATE_RATINGS,
        DELETE_RATINGS,
    ];
}

/// Legacy header carrying the raw token (no `Bearer` prefix).
pub const TOKEN_HEADER: &str = "token";

/// AuthUser
///
/// The resolved identity of an authenticated request: a live user whose session
/// token verified. Handlers receive it as an extractor argument and call
/// `require` before touching protected state.
#[derive(Clone)]
pub struct AuthUser {
    pub user: User,
    repo: RepositoryState,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    /// require
    ///
    /// Second half of the gate: the user's role must list `operation`.
    /// Fails `Forbidden` otherwise.
    pub async fn require(&self, operation: &str) -> Result<&User> {
        check_operation(&self.repo, &self.user, operation).await?;
        Ok(&self.user)
    }

    /// Same lookup as `require`, as a plain yes/no.
    pub async fn can(&self, operation: &str) -> Result<bool> {
        self.repo
            .role_has_operation(self.user.role_id, operation)
            .await
    }
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser").field("user", &self.user).finish()
    }
}

/// Pulls the session token out of `Authorization: Bearer <token>` or the legacy
/// `token` header.
pub fn token_from_parts(parts: &Parts) -> Option<&str> {
    if let Some(bearer) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(bearer.trim());
    }
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// authenticate
///
/// First half of the gate: token → user id → live user record. Every failure is
/// `Unauthenticated`, including a valid token whose user has since been deleted.
pub async fn authenticate(
    repo: &RepositoryState,
    tokens: &TokenService,
    token: &str,
) -> Result<User> {
    let user_id = tokens
        .verify(token)
        .map_err(|_| AppError::Unauthenticated("invalid or expired token".into()))?;

    repo.get_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("user no longer exists".into()))
}

async fn check_operation(repo: &RepositoryState, user: &User, operation: &str) -> Result<()> {
    if repo.role_has_operation(user.role_id, operation).await? {
        Ok(())
    } else {
        tracing::info!(user_id = %user.id, role = %user.role, operation, "operation denied");
        Err(AppError::Forbidden(format!(
            "role '{}' may not perform '{}'",
            user.role, operation
        )))
    }
}

/// authorize
///
/// The complete authorization chain: resolve `token` to a user, then check that the
/// user's role permits `operation`. Returns the user on success.
pub async fn authorize(
    repo: &RepositoryState,
    tokens: &TokenService,
    token: &str,
    operation: &str,
) -> Result<User> {
    let user = authenticate(repo, tokens, token).await?;
    check_operation(repo, &user, operation).await?;
    Ok(user)
}

/// AuthUser Extractor Implementation
///
/// 1. Dependency Resolution: Repository and TokenService from the application state.
/// 2. Token Extraction: Bearer header, falling back to the `token` header.
/// 3. Verification and DB lookup through `authenticate`.
///
/// Rejection: `AppError::Unauthenticated` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let repo = RepositoryState::from_ref(state);
        let tokens = TokenService::from_ref(state);

        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthenticated("missing session token".into()))?;

        let user = authenticate(&repo, &tokens, token).await?;

        Ok(AuthUser { user, repo })
    }
}
