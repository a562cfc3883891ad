use crate::{
    error::Result,
    listing::ListQuery,
    models::{
        Comment, Movie, MovieRequest, NewUser, Operation, Rating, Role, RoleDetails,
        UpdateMovieRequest, User, UserChanges,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract behind every handler. Implementations enforce the
/// store-level rules (unique emails and role names, one rating per user per movie,
/// soft-delete visibility) and report violations as `AppError::Conflict`.
///
/// List methods return `(total, page)` where `total` counts every match before
/// pagination.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Live (not soft-deleted) user by id.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    // Live user by email, case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;
    // Soft delete. False when the user is unknown or already deleted.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
    async fn list_users(&self, query: &ListQuery) -> Result<(i64, Vec<User>)>;

    // --- Operations & Roles ---
    async fn list_operations(&self) -> Result<Vec<Operation>>;
    async fn role_has_operation(&self, role_id: Uuid, operation: &str) -> Result<bool>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn get_role(&self, id: Uuid) -> Result<Option<RoleDetails>>;
    async fn all_roles(&self) -> Result<Vec<Role>>;
    async fn list_roles(&self, query: &ListQuery) -> Result<(i64, Vec<Role>)>;
    // Fails BadRequest on unknown operation ids, Conflict on a taken name.
    async fn create_role(&self, name: &str, operations: &[Uuid]) -> Result<Role>;
    // Replaces name and operation set. False when the role does not exist.
    async fn update_role(&self, id: Uuid, name: &str, operations: &[Uuid]) -> Result<bool>;
    // Fails Conflict while any user references the role.
    async fn delete_role(&self, id: Uuid) -> Result<bool>;

    // --- Movies ---
    async fn list_movies(&self, query: &ListQuery, year: Option<i32>) -> Result<(i64, Vec<Movie>)>;
    // Live movie by id; soft-deleted movies are invisible.
    async fn get_movie(&self, id: Uuid) -> Result<Option<Movie>>;
    async fn create_movie(&self, user_id: Uuid, movie: MovieRequest) -> Result<Movie>;
    async fn update_movie(&self, id: Uuid, changes: UpdateMovieRequest) -> Result<Option<Movie>>;
    async fn delete_movie(&self, id: Uuid) -> Result<bool>;

    // --- Comments ---
    async fn list_comments(
        &self,
        query: &ListQuery,
        movie_id: Option<Uuid>,
    ) -> Result<(i64, Vec<Comment>)>;
    async fn movie_comments(&self, movie_id: Uuid) -> Result<Vec<Comment>>;
    async fn get_comment(&self, movie_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>>;
    async fn create_comment(&self, movie_id: Uuid, user_id: Uuid, text: &str) -> Result<Comment>;
    async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<Option<Comment>>;
    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool>;

    // --- Ratings ---
    async fn list_ratings(
        &self,
        query: &ListQuery,
        movie_id: Option<Uuid>,
    ) -> Result<(i64, Vec<Rating>)>;
    async fn movie_ratings(&self, movie_id: Uuid) -> Result<Vec<Rating>>;
    async fn get_rating(&self, movie_id: Uuid, rating_id: Uuid) -> Result<Option<Rating>>;
    // Fails Conflict when the user already rated the movie.
    async fn create_rating(&self, movie_id: Uuid, user_id: Uuid, score: i32) -> Result<Rating>;
    async fn update_rating(&self, rating_id: Uuid, score: i32) -> Result<Option<Rating>>;
    async fn delete_rating(&self, rating_id: Uuid) -> Result<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Escapes LIKE metacharacters so user input is matched literally.
pub(crate) fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
