use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services.
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod listing;
pub mod models;
pub mod repository;
pub mod token;

// HTTP surface.
pub mod handlers;
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use credentials::CredentialStore;
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryState};
pub use token::TokenService;

/// ApiDoc
///
/// OpenAPI document assembled from every `#[utoipa::path]` handler and the
/// request/response schemas. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::sign_up, handlers::auth::change_password,
        handlers::auth::get_profile, handlers::auth::update_profile,
        handlers::users::list_users, handlers::users::get_user, handlers::users::add_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::operations::verify_operation, handlers::operations::list_operations,
        handlers::roles::list_roles, handlers::roles::all_roles, handlers::roles::create_role,
        handlers::roles::get_role, handlers::roles::update_role, handlers::roles::delete_role,
        handlers::movies::list_movies, handlers::movies::get_movie, handlers::movies::create_movie,
        handlers::movies::update_movie, handlers::movies::delete_movie,
        handlers::comments::list_comments, handlers::comments::create_comment,
        handlers::comments::movie_comments, handlers::comments::get_comment,
        handlers::comments::update_comment, handlers::comments::delete_comment,
        handlers::ratings::list_ratings, handlers::ratings::create_rating,
        handlers::ratings::movie_ratings, handlers::ratings::get_rating,
        handlers::ratings::update_rating, handlers::ratings::delete_rating,
    ),
    components(
        schemas(
            models::Role, models::Operation, models::Movie, models::Comment, models::Rating,
            models::LoginRequest, models::SignUpRequest, models::ChangePasswordRequest,
            models::UpdateProfileRequest, models::AddUserRequest, models::UpdateUserRequest,
            models::RoleRequest, models::MovieRequest, models::UpdateMovieRequest,
            models::CreateCommentRequest, models::UpdateCommentRequest,
            models::CreateRatingRequest, models::UpdateRatingRequest,
            models::UserProfile, models::AuthResponse, models::CreatedResponse,
            models::RoleDetails, models::UserList, models::RoleList, models::MovieList,
            models::CommentList, models::RatingList, models::MovieComments, models::MovieRatings,
            handlers::operations::OperationCheck,
        )
    ),
    tags(
        (name = "movie-admin", description = "Movie catalogue administration API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for every service a handler may need. Cloned per
/// request; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Session token issue/verify.
    pub tokens: TokenService,
    /// Password hashing, login checks and account creation.
    pub credentials: CredentialStore,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the services around `repo` according to `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            tokens: TokenService::from_config(&config),
            credentials: CredentialStore::new(repo.clone(), config.password.clone()),
            repo,
            config,
        }
    }

    /// In-memory state for tests and local experiments.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(Arc::new(InMemoryRepository::new()), config)
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(app_state: &AppState) -> CredentialStore {
        app_state.credentials.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Session gate for the protected routers. Extracting `AuthUser` verifies the token
/// and loads the live user; on failure the extractor rejects with 401 and the handler
/// never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles public, authenticated and admin routes, the docs, and the observability
/// layers around them.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Every request gets an x-request-id, echoed back on the response.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, carrying method, URI and the request id so every log
/// line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
