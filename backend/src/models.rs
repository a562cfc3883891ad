use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Records (Mapped to Database) ---

/// User
///
/// Canonical account row from the `users` table, joined with the role name.
/// The password hash never leaves the server: it is skipped on serialization and
/// responses use `UserProfile` instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub role_id: Uuid,
    // Loaded via a JOIN on `roles`.
    #[sqlx(default)]
    pub role: String,
    #[serde(default, skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role
///
/// A named bundle of permitted operations. List views carry only the header;
/// `RoleDetails` adds the operations.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Operation
///
/// Immutable registry entry naming a permission, e.g. "Add Role".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Operation {
    pub id: Uuid,
    pub name: String,
}

/// Movie
///
/// Catalog entry from the `movies` table. Deletion only flips `is_deleted`, so
/// comments and ratings keep a valid reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    // Storage path of the media file.
    pub path: String,
    pub year: i32,
    // Owner (the user who added the movie).
    pub user_id: Uuid,
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub is_deleted: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub movie_id: Uuid,
    // Author.
    pub user_id: Uuid,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Rating
///
/// One score per (movie, author); the unique constraint lives in the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Rating {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Repository Inputs ---

/// Row to insert into `users`. The hash is produced by the CredentialStore.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role_id: Uuid,
}

/// Partial user update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub password_hash: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "a@x.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpRequest {
    #[schema(example = "a@x.com")]
    pub email: String,
    #[schema(example = "pw123456")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// UpdateProfileRequest
///
/// Self-service profile change. Role changes go through the admin user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AddUserRequest
///
/// Admin-side account creation with an explicit role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AddUserRequest {
    pub email: String,
    pub password: String,
    pub role_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
}

/// RoleRequest
///
/// Used for both creation and full replacement of a role. `operations` holds
/// operation ids from `GET /operations/all`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleRequest {
    #[schema(example = "Editor")]
    pub name: String,
    pub operations: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MovieRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "/movies/id.mkv")]
    pub path: String,
    #[schema(example = 2022)]
    pub year: i32,
}

/// UpdateMovieRequest
///
/// Partial update: only provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMovieRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub movie_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateRatingRequest {
    pub movie_id: Uuid,
    #[schema(minimum = 1, maximum = 5)]
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRatingRequest {
    #[schema(minimum = 1, maximum = 5)]
    pub score: i32,
}

// --- Response Schemas (Output) ---

/// UserProfile
///
/// Public view of a `User`: everything except the password hash and delete flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role_id: Uuid,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role_id: user.role_id,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// AuthResponse
///
/// Returned by login and sign-up: a fresh session token plus the resolved profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Returned by create endpoints that only echo the generated id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleDetails {
    pub id: Uuid,
    pub name: String,
    pub operations: Vec<Operation>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// Paginated list envelopes: `total` counts every match, `items` is the requested page.

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserList {
    pub total: i64,
    pub items: Vec<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleList {
    pub total: i64,
    pub items: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MovieList {
    pub total: i64,
    pub items: Vec<Movie>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentList {
    pub total: i64,
    pub items: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RatingList {
    pub total: i64,
    pub items: Vec<Rating>,
}

/// All comments of a single movie (`GET /movies/{movie_id}/comments/all`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MovieComments {
    pub movie_id: Uuid,
    pub comments: Vec<Comment>,
}

/// MovieRatings
///
/// All ratings of a single movie with summary numbers. `average` is 0 when unrated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MovieRatings {
    pub movie_id: Uuid,
    pub count: i64,
    pub average: f64,
    pub ratings: Vec<Rating>,
}

impl MovieRatings {
    pub fn new(movie_id: Uuid, ratings: Vec<Rating>) -> Self {
        let count = ratings.len() as i64;
        let average = if count == 0 {
            0.0
        } else {
            ratings.iter().map(|r| r.score as f64).sum::<f64>() / count as f64
        };
        Self {
            movie_id,
            count,
            average,
            ratings,
        }
    }
}
