use crate::{AppState, handlers::{auth, comments, movies, ratings}};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. Catalogue reads only ever see live movies; the
/// repository filters soft-deleted rows.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/login", post(auth::login))
        .route("/sign-up", post(auth::sign_up))
        // GET /movies?start=&limit=&sort_by=&order=&search=&year=
        .route("/movies", get(movies::list_movies))
        .route("/movies/{id}", get(movies::get_movie))
        // Static segments win over `{id}`, so these do not shadow the movie routes.
        .route("/movies/comments", get(comments::list_comments))
        .route("/movies/ratings", get(ratings::list_ratings))
        .route("/movies/{id}/comments/all", get(comments::movie_comments))
        .route("/movies/{id}/comments/{comment_id}", get(comments::get_comment))
        .route("/movies/{id}/ratings/all", get(ratings::movie_ratings))
        .route("/movies/{id}/ratings/{rating_id}", get(ratings::get_rating))
}
