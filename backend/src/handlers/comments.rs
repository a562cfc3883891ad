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
    listing::{ListParams, MovieIdFilter},
    models::{
        Comment, CommentList, CreateCommentRequest, MovieComments, UpdateCommentRequest,
    },
};

async fn find_comment(state: &AppState, movie_id: Uuid, comment_id: Uuid) -> Result<Comment> {
    state
        .repo
        .get_comment(movie_id, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("comment {comment_id} on movie {movie_id}")))
}

/// list_comments
///
/// [Public Route] Paginated comments across movies, optionally restricted to one.
#[utoipa::path(
    get,
    path = "/movies/comments",
    params(ListParams, MovieIdFilter),
    responses((status = 200, description = "Comments", body = CommentList))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
    QueryParams(filter): QueryParams<MovieIdFilter>,
) -> Result<Json<CommentList>> {
    let query = params.validate::<Comment>()?;
    let movie_id = filter.movie_id()?;

    let (total, items) = state.repo.list_comments(&query, movie_id).await?;
    Ok(Json(CommentList { total, items }))
}

/// create_comment
///
/// [Authenticated Route] Comments on a live movie.
#[utoipa::path(
    post,
    path = "/movies/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn create_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    auth.require(ops::ADD_COMMENTS).await?;
    let text = non_empty("text", &payload.text)?;

    let comment = state
        .repo
        .create_comment(payload.movie_id, auth.id(), &text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// movie_comments
///
/// [Public Route] Every comment of one live movie, oldest first.
#[utoipa::path(
    get,
    path = "/movies/{id}/comments/all",
    params(("id" = Uuid, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Comments", body = MovieComments),
        (status = 404, description = "Movie not found")
    )
)]
pub async fn movie_comments(
    State(state): State<AppState>,
    Path(movie_id): Path<Uuid>,
) -> Result<Json<MovieComments>> {
    if state.repo.get_movie(movie_id).await?.is_none() {
        return Err(AppError::NotFound(format!("movie {movie_id}")));
    }
    let comments = state.repo.movie_comments(movie_id).await?;
    Ok(Json(MovieComments { movie_id, comments }))
}

#[utoipa::path(
    get,
    path = "/movies/{id}/comments/{comment_id}",
    params(
        ("id" = Uuid, Path, description = "Movie ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Found", body = Comment),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((movie_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Comment>> {
    Ok(Json(find_comment(&state, movie_id, comment_id).await?))
}

/// update_comment
///
/// [Authenticated Route] Only the author may edit a comment.
#[utoipa::path(
    put,
    path = "/movies/{id}/comments/{comment_id}",
    params(
        ("id" = Uuid, Path, description = "Movie ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((movie_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>> {
    auth.require(ops::UPDATE_COMMENTS).await?;
    let comment = find_comment(&state, movie_id, comment_id).await?;
    if comment.user_id != auth.id() {
        return Err(AppError::Forbidden("only the author can edit a comment".into()));
    }
    let text = non_empty("text", &payload.text)?;

    let comment = state
        .repo
        .update_comment(comment_id, &text)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("comment {comment_id}")))?;
    Ok(Json(comment))
}

/// delete_comment
///
/// [Authenticated Route] The author may delete their comment; holders of
/// `moderate comments` may delete anyone's.
#[utoipa::path(
    delete,
    path = "/movies/{id}/comments/{comment_id}",
    params(
        ("id" = Uuid, Path, description = "Movie ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((movie_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    auth.require(ops::DELETE_COMMENTS).await?;
    let comment = find_comment(&state, movie_id, comment_id).await?;
    if comment.user_id != auth.id() && !auth.can(ops::MODERATE_COMMENTS).await? {
        return Err(AppError::Forbidden(
            "only the author or a moderator can delete a comment".into(),
        ));
    }

    if !state.repo.delete_comment(comment_id).await? {
        return Err(AppError::NotFound(format!("comment {comment_id}")));
    }
    tracing::info!(comment_id = %comment_id, by = %auth.id(), "comment deleted");
    Ok(StatusCode::OK)
}
