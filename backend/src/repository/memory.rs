use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::{
    auth::ops,
    error::{AppError, Result},
    listing::ListQuery,
    models::{
        Comment, Movie, MovieRequest, NewUser, Operation, Rating, Role, RoleDetails,
        UpdateMovieRequest, User, UserChanges,
    },
};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    role_operations: HashMap<Uuid, HashSet<Uuid>>,
    operations: Vec<Operation>,
    movies: HashMap<Uuid, Movie>,
    comments: HashMap<Uuid, Comment>,
    ratings: HashMap<Uuid, Rating>,
}

impl Store {
    /// Returns the user with its role name refreshed from the role table.
    fn resolved(&self, user: &User) -> User {
        let mut user = user.clone();
        user.role = self
            .roles
            .get(&user.role_id)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        user
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| same_text(&u.email, email) && Some(u.id) != except)
    }

    fn role_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| same_text(&r.name, name) && Some(r.id) != except)
    }

    fn checked_operations(&self, operations: &[Uuid]) -> Result<HashSet<Uuid>> {
        let ids: HashSet<Uuid> = operations.iter().copied().collect();
        if ids
            .iter()
            .all(|id| self.operations.iter().any(|o| o.id == *id))
        {
            Ok(ids)
        } else {
            Err(AppError::BadRequest("unknown operation id".into()))
        }
    }

    fn insert_role(&mut self, name: &str, operations: HashSet<Uuid>) -> Role {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.roles.insert(role.id, role.clone());
        self.role_operations.insert(role.id, operations);
        role
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory behind a `tokio::sync::RwLock`.
/// It enforces the same uniqueness and soft-delete rules as the Postgres schema and
/// starts with the same seeded operations and roles, so handlers can be exercised
/// end to end without a database.
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Creates a store seeded with every operation, an `Admin` role holding all of
    /// them and a `User` role holding the comment and rating operations.
    pub fn new() -> Self {
        let mut store = Store::default();
        store.operations = ops::ALL
            .iter()
            .map(|name| Operation {
                id: Uuid::new_v4(),
                name: name.to_string(),
            })
            .collect();

        let ids_for = |names: &[&str]| -> HashSet<Uuid> {
            store
                .operations
                .iter()
                .filter(|o| names.contains(&o.name.as_str()))
                .map(|o| o.id)
                .collect()
        };
        let admin_ops = ids_for(ops::ALL);
        let user_ops = ids_for(ops::USER_DEFAULTS);

        store.insert_role("Admin", admin_ops);
        store.insert_role("User", user_ops);

        Self {
            store: RwLock::new(store),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .get(&id)
            .filter(|u| !u.is_deleted)
            .map(|u| store.resolved(u)))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .find(|u| !u.is_deleted && same_text(&u.email, email))
            .map(|u| store.resolved(u)))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut store = self.store.write().await;
        if store.email_taken(&user.email, None) {
            return Err(AppError::Conflict("record already exists".into()));
        }
        if !store.roles.contains_key(&user.role_id) {
            return Err(AppError::BadRequest("unknown role".into()));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role_id: user.role_id,
            role: String::new(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(created.id, created.clone());
        Ok(store.resolved(&created))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut store = self.store.write().await;
        if !store.users.get(&id).is_some_and(|u| !u.is_deleted) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if store.email_taken(email, Some(id)) {
                return Err(AppError::Conflict("record already exists".into()));
            }
        }
        if let Some(role_id) = changes.role_id {
            if !store.roles.contains_key(&role_id) {
                return Err(AppError::BadRequest("unknown role".into()));
            }
        }
        let Some(user) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role_id) = changes.role_id {
            user.role_id = role_id;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        let user = user.clone();
        Ok(Some(store.resolved(&user)))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.users.get_mut(&id) {
            Some(user) if !user.is_deleted => {
                user.is_deleted = true;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_users(&self, query: &ListQuery) -> Result<(i64, Vec<User>)> {
        let store = self.store.read().await;
        let needle = query.needle();
        let matches = store
            .users
            .values()
            .filter(|u| !u.is_deleted)
            .filter(|u| {
                needle
                    .as_deref()
                    .is_none_or(|n| u.email.to_lowercase().contains(n))
            })
            .map(|u| store.resolved(u))
            .collect();
        Ok(query.paginate(matches))
    }

    // --- OPERATIONS & ROLES ---

    async fn list_operations(&self) -> Result<Vec<Operation>> {
        let store = self.store.read().await;
        let mut ops = store.operations.clone();
        ops.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ops)
    }

    async fn role_has_operation(&self, role_id: Uuid, operation: &str) -> Result<bool> {
        let store = self.store.read().await;
        Ok(store.role_operations.get(&role_id).is_some_and(|ids| {
            store
                .operations
                .iter()
                .any(|o| o.name == operation && ids.contains(&o.id))
        }))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let store = self.store.read().await;
        Ok(store
            .roles
            .values()
            .find(|r| same_text(&r.name, name))
            .cloned())
    }

    async fn get_role(&self, id: Uuid) -> Result<Option<RoleDetails>> {
        let store = self.store.read().await;
        let Some(role) = store.roles.get(&id) else {
            return Ok(None);
        };
        let ids = store.role_operations.get(&id).cloned().unwrap_or_default();
        let mut operations: Vec<Operation> = store
            .operations
            .iter()
            .filter(|o| ids.contains(&o.id))
            .cloned()
            .collect();
        operations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(RoleDetails {
            id: role.id,
            name: role.name.clone(),
            operations,
            created_at: role.created_at,
        }))
    }

    async fn all_roles(&self) -> Result<Vec<Role>> {
        let store = self.store.read().await;
        let mut roles: Vec<Role> = store.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn list_roles(&self, query: &ListQuery) -> Result<(i64, Vec<Role>)> {
        let store = self.store.read().await;
        let needle = query.needle();
        let matches = store
            .roles
            .values()
            .filter(|r| {
                needle
                    .as_deref()
                    .is_none_or(|n| r.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        Ok(query.paginate(matches))
    }

    async fn create_role(&self, name: &str, operations: &[Uuid]) -> Result<Role> {
        let mut store = self.store.write().await;
        let ids = store.checked_operations(operations)?;
        if store.role_name_taken(name, None) {
            return Err(AppError::Conflict("record already exists".into()));
        }
        Ok(store.insert_role(name, ids))
    }

    async fn update_role(&self, id: Uuid, name: &str, operations: &[Uuid]) -> Result<bool> {
        let mut store = self.store.write().await;
        let ids = store.checked_operations(operations)?;
        if !store.roles.contains_key(&id) {
            return Ok(false);
        }
        if store.role_name_taken(name, Some(id)) {
            return Err(AppError::Conflict("record already exists".into()));
        }
        if let Some(role) = store.roles.get_mut(&id) {
            role.name = name.to_string();
        }
        store.role_operations.insert(id, ids);
        Ok(true)
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.role_id == id) {
            return Err(AppError::Conflict("role is assigned to users".into()));
        }
        store.role_operations.remove(&id);
        Ok(store.roles.remove(&id).is_some())
    }

    // --- MOVIES ---

    async fn list_movies(&self, query: &ListQuery, year: Option<i32>) -> Result<(i64, Vec<Movie>)> {
        let store = self.store.read().await;
        let needle = query.needle();
        let matches = store
            .movies
            .values()
            .filter(|m| !m.is_deleted)
            .filter(|m| year.is_none_or(|y| m.year == y))
            .filter(|m| {
                needle.as_deref().is_none_or(|n| {
                    m.title.to_lowercase().contains(n) || m.description.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        Ok(query.paginate(matches))
    }

    async fn get_movie(&self, id: Uuid) -> Result<Option<Movie>> {
        let store = self.store.read().await;
        Ok(store.movies.get(&id).filter(|m| !m.is_deleted).cloned())
    }

    async fn create_movie(&self, user_id: Uuid, movie: MovieRequest) -> Result<Movie> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let created = Movie {
            id: Uuid::new_v4(),
            title: movie.title,
            description: movie.description,
            path: movie.path,
            year: movie.year,
            user_id,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        store.movies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_movie(&self, id: Uuid, changes: UpdateMovieRequest) -> Result<Option<Movie>> {
        let mut store = self.store.write().await;
        let Some(movie) = store.movies.get_mut(&id).filter(|m| !m.is_deleted) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            movie.title = title;
        }
        if let Some(description) = changes.description {
            movie.description = description;
        }
        if let Some(path) = changes.path {
            movie.path = path;
        }
        if let Some(year) = changes.year {
            movie.year = year;
        }
        movie.updated_at = Utc::now();
        Ok(Some(movie.clone()))
    }

    async fn delete_movie(&self, id: Uuid) -> Result<bool> {
        let mut store = self.store.write().await;
        match store.movies.get_mut(&id) {
            Some(movie) if !movie.is_deleted => {
                movie.is_deleted = true;
                movie.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        query: &ListQuery,
        movie_id: Option<Uuid>,
    ) -> Result<(i64, Vec<Comment>)> {
        let store = self.store.read().await;
        let needle = query.needle();
        let matches = store
            .comments
            .values()
            .filter(|c| movie_id.is_none_or(|id| c.movie_id == id))
            .filter(|c| {
                needle
                    .as_deref()
                    .is_none_or(|n| c.text.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        Ok(query.paginate(matches))
    }

    async fn movie_comments(&self, movie_id: Uuid) -> Result<Vec<Comment>> {
        let store = self.store.read().await;
        let mut comments: Vec<Comment> = store
            .comments
            .values()
            .filter(|c| c.movie_id == movie_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn get_comment(&self, movie_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>> {
        let store = self.store.read().await;
        Ok(store
            .comments
            .get(&comment_id)
            .filter(|c| c.movie_id == movie_id)
            .cloned())
    }

    async fn create_comment(&self, movie_id: Uuid, user_id: Uuid, text: &str) -> Result<Comment> {
        let mut store = self.store.write().await;
        if !store.movies.get(&movie_id).is_some_and(|m| !m.is_deleted) {
            return Err(AppError::NotFound("movie".into()));
        }
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            movie_id,
            user_id,
            text: text.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<Option<Comment>> {
        let mut store = self.store.write().await;
        Ok(store.comments.get_mut(&comment_id).map(|c| {
            c.text = text.to_string();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.comments.remove(&comment_id).is_some())
    }

    // --- RATINGS ---

    async fn list_ratings(
        &self,
        query: &ListQuery,
        movie_id: Option<Uuid>,
    ) -> Result<(i64, Vec<Rating>)> {
        let store = self.store.read().await;
        let needle = query.needle();
        let matches = store
            .ratings
            .values()
            .filter(|r| movie_id.is_none_or(|id| r.movie_id == id))
            .filter(|r| {
                needle.as_deref().is_none_or(|n| {
                    store
                        .movies
                        .get(&r.movie_id)
                        .is_some_and(|m| m.title.to_lowercase().contains(n))
                })
            })
            .cloned()
            .collect();
        Ok(query.paginate(matches))
    }

    async fn movie_ratings(&self, movie_id: Uuid) -> Result<Vec<Rating>> {
        let store = self.store.read().await;
        let mut ratings: Vec<Rating> = store
            .ratings
            .values()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(ratings)
    }

    async fn get_rating(&self, movie_id: Uuid, rating_id: Uuid) -> Result<Option<Rating>> {
        let store = self.store.read().await;
        Ok(store
            .ratings
            .get(&rating_id)
            .filter(|r| r.movie_id == movie_id)
            .cloned())
    }

    async fn create_rating(&self, movie_id: Uuid, user_id: Uuid, score: i32) -> Result<Rating> {
        let mut store = self.store.write().await;
        if !store.movies.get(&movie_id).is_some_and(|m| !m.is_deleted) {
            return Err(AppError::NotFound("movie".into()));
        }
        if store
            .ratings
            .values()
            .any(|r| r.movie_id == movie_id && r.user_id == user_id)
        {
            return Err(AppError::Conflict("movie already rated by this user".into()));
        }
        let now = Utc::now();
        let rating = Rating {
            id: Uuid::new_v4(),
            movie_id,
            user_id,
            score,
            created_at: now,
            updated_at: now,
        };
        store.ratings.insert(rating.id, rating.clone());
        Ok(rating)
    }

    async fn update_rating(&self, rating_id: Uuid, score: i32) -> Result<Option<Rating>> {
        let mut store = self.store.write().await;
        Ok(store.ratings.get_mut(&rating_id).map(|r| {
            r.score = score;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }

    async fn delete_rating(&self, rating_id: Uuid) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.ratings.remove(&rating_id).is_some())
    }
}

// Matches Postgres `LOWER(a) = LOWER(b)`, non-ASCII letters included.
fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
