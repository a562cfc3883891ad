use crate::{AppState, handlers::{auth, comments, movies, ratings}};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Everything here runs after the session middleware has resolved the caller. The
/// handlers then check the operation they perform, plus authorship for comment and
/// rating edits.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Own account ---
        .route("/change-password", post(auth::change_password))
        .route(
            "/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        // --- Movies ---
        .route("/movies", post(movies::create_movie))
        .route(
            "/movies/{id}",
            put(movies::update_movie).delete(movies::delete_movie),
        )
        // --- Comments ---
        .route("/movies/comments", post(comments::create_comment))
        .route(
            "/movies/{id}/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        // --- Ratings ---
        .route("/movies/ratings", post(ratings::create_rating))
        .route(
            "/movies/{id}/ratings/{rating_id}",
            put(ratings::update_rating).delete(ratings::delete_rating),
        )
}
