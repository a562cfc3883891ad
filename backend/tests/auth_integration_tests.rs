use axum::{
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
};
use chrono::{Duration, Utc};
use movie_admin::{
    AppConfig, AppError, AppState,
    auth::{self, AuthUser, TOKEN_HEADER, ops},
    models::User,
};
use uuid::Uuid;

// --- Helpers ---

fn parts_with(headers: &[(&str, String)]) -> Parts {
    let mut builder = Request::builder().uri("/profile");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    parts
}

async fn user_with_role(state: &AppState, email: &str, role: &str) -> User {
    let role = state.repo.find_role_by_name(role).await.unwrap().unwrap();
    state
        .credentials
        .create_user(email, "pw123456", role.id)
        .await
        .unwrap()
}

async fn extract(state: &AppState, headers: &[(&str, String)]) -> Result<AuthUser, AppError> {
    let mut parts = parts_with(headers);
    AuthUser::from_request_parts(&mut parts, state).await
}

// --- Extractor ---

#[tokio::test]
async fn test_bearer_token_resolves_user() {
    let state = AppState::in_memory(AppConfig::default());
    let user = user_with_role(&state, "viewer@x.com", "User").await;
    let token = state.tokens.issue(user.id).unwrap();

    let auth = extract(
        &state,
        &[(header::AUTHORIZATION.as_str(), format!("Bearer {token}"))],
    )
    .await
    .unwrap();

    assert_eq!(auth.id(), user.id);
    assert_eq!(auth.user.email, "viewer@x.com");
    assert_eq!(auth.user.role, "User");
}

#[tokio::test]
async fn test_legacy_token_header_resolves_user() {
    let state = AppState::in_memory(AppConfig::default());
    let user = user_with_role(&state, "legacy@x.com", "User").await;
    let token = state.tokens.issue(user.id).unwrap();

    let auth = extract(&state, &[(TOKEN_HEADER, token)]).await.unwrap();
    assert_eq!(auth.id(), user.id);
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let state = AppState::in_memory(AppConfig::default());

    let err = extract(&state, &[]).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    // A non-Bearer Authorization header is not a session token either.
    let err = extract(
        &state,
        &[(header::AUTHORIZATION.as_str(), "Basic dXNlcjpwYXNz".into())],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_invalid_and_expired_tokens_are_unauthenticated() {
    let state = AppState::in_memory(AppConfig::default());
    let user = user_with_role(&state, "expired@x.com", "User").await;

    let err = extract(&state, &[(TOKEN_HEADER, "garbage".into())])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));

    let stale = state
        .tokens
        .issue_at(user.id, Utc::now() - Duration::hours(2))
        .unwrap();
    let err = extract(&state, &[(TOKEN_HEADER, stale)]).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_token_of_deleted_or_unknown_user_is_unauthenticated() {
    let state = AppState::in_memory(AppConfig::default());
    let user = user_with_role(&state, "leaving@x.com", "User").await;
    let token = state.tokens.issue(user.id).unwrap();

    assert!(state.repo.delete_user(user.id).await.unwrap());
    let err = extract(&state, &[(TOKEN_HEADER, token)]).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));

    let ghost = state.tokens.issue(Uuid::new_v4()).unwrap();
    let err = extract(&state, &[(TOKEN_HEADER, ghost)]).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

// --- Operation checks ---

#[tokio::test]
async fn test_require_follows_role_operations() {
    let state = AppState::in_memory(AppConfig::default());
    let user = user_with_role(&state, "member@x.com", "User").await;
    let token = state.tokens.issue(user.id).unwrap();
    let auth = extract(&state, &[(TOKEN_HEADER, token)]).await.unwrap();

    assert!(auth.require(ops::ADD_COMMENTS).await.is_ok());
    assert!(auth.can(ops::ADD_RATINGS).await.unwrap());
    assert!(!auth.can(ops::MODERATE_COMMENTS).await.unwrap());

    let err = auth.require(ops::ADD_ROLE).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_holds_every_operation() {
    let state = AppState::in_memory(AppConfig::default());
    let admin = user_with_role(&state, "root@x.com", "Admin").await;
    let token = state.tokens.issue(admin.id).unwrap();
    let auth = extract(&state, &[(TOKEN_HEADER, token)]).await.unwrap();

    for operation in ops::ALL {
        assert!(
            auth.require(operation).await.is_ok(),
            "Admin should hold '{operation}'"
        );
    }
}

#[tokio::test]
async fn test_operation_names_match_exactly() {
    let state = AppState::in_memory(AppConfig::default());
    let admin = user_with_role(&state, "exact@x.com", "Admin").await;
    let token = state.tokens.issue(admin.id).unwrap();
    let auth = extract(&state, &[(TOKEN_HEADER, token)]).await.unwrap();

    assert!(!auth.can("add role").await.unwrap());
    assert!(!auth.can("Launch Rockets").await.unwrap());
}

#[tokio::test]
async fn test_authorize_runs_the_full_chain() {
    let state = AppState::in_memory(AppConfig::default());
    let admin = user_with_role(&state, "chain-admin@x.com", "Admin").await;
    let member = user_with_role(&state, "chain-user@x.com", "User").await;

    let admin_token = state.tokens.issue(admin.id).unwrap();
    let resolved = auth::authorize(&state.repo, &state.tokens, &admin_token, ops::ADD_ROLE)
        .await
        .unwrap();
    assert_eq!(resolved.id, admin.id);

    let member_token = state.tokens.issue(member.id).unwrap();
    let err = auth::authorize(&state.repo, &state.tokens, &member_token, ops::ADD_ROLE)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = auth::authorize(&state.repo, &state.tokens, "nope", ops::ADD_COMMENTS)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_role_changes_apply_to_existing_sessions() {
    let state = AppState::in_memory(AppConfig::default());
    let user = user_with_role(&state, "promoted@x.com", "User").await;
    let token = state.tokens.issue(user.id).unwrap();

    let err = auth::authorize(&state.repo, &state.tokens, &token, ops::ADD_MOVIES)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin_role = state.repo.find_role_by_name("Admin").await.unwrap().unwrap();
    state
        .credentials
        .update_profile(user.id, None, Some(admin_role.id))
        .await
        .unwrap();

    assert!(
        auth::authorize(&state.repo, &state.tokens, &token, ops::ADD_MOVIES)
            .await
            .is_ok()
    );
}
