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
    listing::{ListParams, MovieFilter},
    models::{Movie, MovieList, MovieRequest, UpdateMovieRequest},
};

/// list_movies
///
/// [Public Route] Paginated catalogue. Soft-deleted movies never appear here.
#[utoipa::path(
    get,
    path = "/movies",
    params(ListParams, MovieFilter),
    responses(
        (status = 200, description = "Movies", body = MovieList),
        (status = 400, description = "Invalid listing parameters")
    )
)]
pub async fn list_movies(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
    QueryParams(filter): QueryParams<MovieFilter>,
) -> Result<Json<MovieList>> {
    let query = params.validate::<Movie>()?;
    let year = filter.year()?;

    let (total, items) = state.repo.list_movies(&query, year).await?;
    Ok(Json(MovieList { total, items }))
}

#[utoipa::path(
    get,
    path = "/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Found", body = Movie),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Movie>> {
    let movie = state
        .repo
        .get_movie(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("movie {id}")))?;
    Ok(Json(movie))
}

/// create_movie
///
/// [Authenticated Route] Adds a movie owned by the caller.
#[utoipa::path(
    post,
    path = "/movies",
    request_body = MovieRequest,
    responses(
        (status = 201, description = "Created", body = Movie),
        (status = 403, description = "Missing 'add movies'")
    )
)]
pub async fn create_movie(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut payload): Json<MovieRequest>,
) -> Result<(StatusCode, Json<Movie>)> {
    auth.require(ops::ADD_MOVIES).await?;
    payload.title = non_empty("title", &payload.title)?;
    payload.path = non_empty("path", &payload.path)?;

    let movie = state.repo.create_movie(auth.id(), payload).await?;
    tracing::info!(movie_id = %movie.id, user_id = %auth.id(), "movie created");
    Ok((StatusCode::CREATED, Json(movie)))
}

/// update_movie
///
/// [Authenticated Route] Partial update; absent fields keep their value.
#[utoipa::path(
    put,
    path = "/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie ID")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Updated", body = Movie),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_movie(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateMovieRequest>,
) -> Result<Json<Movie>> {
    auth.require(ops::UPDATE_MOVIES).await?;
    payload.title = payload.title.map(|t| non_empty("title", &t)).transpose()?;
    payload.path = payload.path.map(|p| non_empty("path", &p)).transpose()?;

    let movie = state
        .repo
        .update_movie(id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("movie {id}")))?;
    Ok(Json(movie))
}

/// delete_movie
///
/// [Authenticated Route] Soft delete. Comments and ratings of the movie stay readable.
#[utoipa::path(
    delete,
    path = "/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_movie(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require(ops::DELETE_MOVIES).await?;
    if !state.repo.delete_movie(id).await? {
        return Err(AppError::NotFound(format!("movie {id}")));
    }
    tracing::info!(movie_id = %id, user_id = %auth.id(), "movie deleted");
    Ok(StatusCode::OK)
}
