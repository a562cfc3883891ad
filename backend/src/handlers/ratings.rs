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
    listing::{ListParams, MovieIdFilter},
    models::{CreateRatingRequest, MovieRatings, Rating, RatingList, UpdateRatingRequest},
};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

fn check_score(score: i32) -> Result<i32> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(AppError::BadRequest(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )))
    }
}

async fn find_rating(state: &AppState, movie_id: Uuid, rating_id: Uuid) -> Result<Rating> {
    state
        .repo
        .get_rating(movie_id, rating_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rating {rating_id} on movie {movie_id}")))
}

/// list_ratings
///
/// [Public Route] Paginated ratings. `search` matches the rated movie's title.
#[utoipa::path(
    get,
    path = "/movies/ratings",
    params(ListParams, MovieIdFilter),
    responses((status = 200, description = "Ratings", body = RatingList))
)]
pub async fn list_ratings(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
    QueryParams(filter): QueryParams<MovieIdFilter>,
) -> Result<Json<RatingList>> {
    let query = params.validate::<Rating>()?;
    let movie_id = filter.movie_id()?;

    let (total, items) = state.repo.list_ratings(&query, movie_id).await?;
    Ok(Json(RatingList { total, items }))
}

/// create_rating
///
/// [Authenticated Route] One rating per user per movie; a second one is `409`.
#[utoipa::path(
    post,
    path = "/movies/ratings",
    request_body = CreateRatingRequest,
    responses(
        (status = 201, description = "Rated", body = Rating),
        (status = 400, description = "Score out of range"),
        (status = 404, description = "Movie not found"),
        (status = 409, description = "Already rated")
    )
)]
pub async fn create_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRatingRequest>,
) -> Result<(StatusCode, Json<Rating>)> {
    auth.require(ops::ADD_RATINGS).await?;
    let score = check_score(payload.score)?;

    let rating = state
        .repo
        .create_rating(payload.movie_id, auth.id(), score)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

#[utoipa::path(
    get,
    path = "/movies/{id}/ratings/all",
    params(("id" = Uuid, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Ratings with count and average", body = MovieRatings),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn movie_ratings(
    State(state): State<AppState>,
    Path(movie_id): Path<Uuid>,
) -> Result<Json<MovieRatings>> {
    if state.repo.get_movie(movie_id).await?.is_none() {
        return Err(AppError::NotFound(format!("movie {movie_id}")));
    }
    let ratings = state.repo.movie_ratings(movie_id).await?;
    Ok(Json(MovieRatings::new(movie_id, ratings)))
}

#[utoipa::path(
    get,
    path = "/movies/{id}/ratings/{rating_id}",
    params(
        ("id" = Uuid, Path, description = "Movie ID"),
        ("rating_id" = Uuid, Path, description = "Rating ID")
    ),
    responses(
        (status = 200, description = "Found", body = Rating),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_rating(
    State(state): State<AppState>,
    Path((movie_id, rating_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Rating>> {
    Ok(Json(find_rating(&state, movie_id, rating_id).await?))
}

#[utoipa::path(
    put,
    path = "/movies/{id}/ratings/{rating_id}",
    params(
        ("id" = Uuid, Path, description = "Movie ID"),
        ("rating_id" = Uuid, Path, description = "Rating ID")
    ),
    request_body = UpdateRatingRequest,
    responses(
        (status = 200, description = "Updated", body = Rating),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((movie_id, rating_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateRatingRequest>,
) -> Result<Json<Rating>> {
    auth.require(ops::UPDATE_RATINGS).await?;
    let rating = find_rating(&state, movie_id, rating_id).await?;
    if rating.user_id != auth.id() {
        return Err(AppError::Forbidden("only the author can change a rating".into()));
    }
    let score = check_score(payload.score)?;

    let rating = state
        .repo
        .update_rating(rating_id, score)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rating {rating_id}")))?;
    Ok(Json(rating))
}

/// delete_rating
///
/// [Authenticated Route] Author, or a holder of `moderate ratings`.
#[utoipa::path(
    delete,
    path = "/movies/{id}/ratings/{rating_id}",
    params(
        ("id" = Uuid, Path, description = "Movie ID"),
        ("rating_id" = Uuid, Path, description = "Rating ID")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((movie_id, rating_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    auth.require(ops::DELETE_RATINGS).await?;
    let rating = find_rating(&state, movie_id, rating_id).await?;
    if rating.user_id != auth.id() && !auth.can(ops::MODERATE_RATINGS).await? {
        return Err(AppError::Forbidden(
            "only the author or a moderator can delete a rating".into(),
        ));
    }

    if !state.repo.delete_rating(rating_id).await? {
        return Err(AppError::NotFound(format!("rating {rating_id}")));
    }
    Ok(StatusCode::OK)
}
