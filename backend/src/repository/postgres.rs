use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{Repository, like_pattern};
use crate::{
    error::{AppError, Result},
    listing::ListQuery,
    models::{
        Comment, Movie, MovieRequest, NewUser, Operation, Rating, Role, RoleDetails,
        UpdateMovieRequest, User, UserChanges,
    },
};

const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.role_id, r.name AS role,
           u.is_deleted, u.created_at, u.updated_at
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

const MOVIE_COLUMNS: &str =
    "m.id, m.title, m.description, m.path, m.year, m.user_id, m.is_deleted, m.created_at, m.updated_at";

const COMMENT_COLUMNS: &str = "c.id, c.movie_id, c.user_id, c.text, c.created_at, c.updated_at";

const RATING_COLUMNS: &str = "r.id, r.movie_id, r.user_id, r.score, r.created_at, r.updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are checked at runtime so the crate builds without a live database;
/// dynamic filters go through `QueryBuilder` with bound parameters.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `SELECT COUNT(*)` and the page query over the same filter clause.
    ///
    /// `from` is everything after the select list (FROM/JOIN/WHERE with a trailing
    /// `WHERE` already present); `filter` appends the bound conditions.
    async fn paged<T, F>(
        &self,
        columns: &str,
        from: &str,
        sort_expr: &str,
        id_column: &str,
        query: &ListQuery,
        filter: F,
    ) -> Result<(i64, Vec<T>)>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
        F: Fn(&mut QueryBuilder<'_, Postgres>),
    {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) ");
        count.push(from);
        filter(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        page.push(columns).push(" ").push(from);
        filter(&mut page);
        page.push(format!(
            " ORDER BY {} {}, {} ASC",
            sort_expr,
            query.order.as_sql(),
            id_column
        ));
        page.push(" LIMIT ").push_bind(query.limit);
        page.push(" OFFSET ").push_bind(query.start);

        let items = page.build_query_as::<T>().fetch_all(&self.pool).await?;
        Ok((total, items))
    }

    async fn role_operations(&self, role_id: Uuid) -> Result<Vec<Operation>> {
        let ops = sqlx::query_as::<_, Operation>(
            r#"
            SELECT o.id, o.name
            FROM operations o
            JOIN role_operations ro ON ro.operation_id = o.id
            WHERE ro.role_id = $1
            ORDER BY o.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ops)
    }

    /// Rejects operation id lists that reference unknown operations.
    async fn check_operations(&self, operations: &[Uuid]) -> Result<Vec<Uuid>> {
        let mut ids = operations.to_vec();
        ids.sort();
        ids.dedup();
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operations WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_one(&self.pool)
            .await?;
        if known != ids.len() as i64 {
            return Err(AppError::BadRequest("unknown operation id".into()));
        }
        Ok(ids)
    }
}

fn sort_expression(alias: &str, field: &str) -> String {
    match field {
        "email" | "name" | "title" => format!("LOWER({alias}.{field})"),
        other => format!("{alias}.{other}"),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE u.id = $1 AND u.is_deleted = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE LOWER(u.email) = LOWER($1) AND u.is_deleted = false"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts and re-reads through a CTE so the returned row carries the role name.
    /// A duplicate email trips `users_email_key` and surfaces as Conflict.
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            WITH inserted AS (
                INSERT INTO users (id, email, password_hash, role_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, email, password_hash, role_id, is_deleted, created_at, updated_at
            )
            SELECT i.id, i.email, i.password_hash, i.role_id, r.name AS role,
                   i.is_deleted, i.created_at, i.updated_at
            FROM inserted i JOIN roles r ON r.id = i.role_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// update_user
    ///
    /// Partial update via `COALESCE`: only `Some` fields overwrite their column.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            WITH updated AS (
                UPDATE users
                SET email = COALESCE($2, email),
                    role_id = COALESCE($3, role_id),
                    password_hash = COALESCE($4, password_hash),
                    updated_at = NOW()
                WHERE id = $1 AND is_deleted = false
                RETURNING id, email, password_hash, role_id, is_deleted, created_at, updated_at
            )
            SELECT u.id, u.email, u.password_hash, u.role_id, r.name AS role,
                   u.is_deleted, u.created_at, u.updated_at
            FROM updated u JOIN roles r ON r.id = u.role_id
            "#,
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.role_id)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_users(&self, query: &ListQuery) -> Result<(i64, Vec<User>)> {
        let search = query.search.as_deref().map(like_pattern);
        self.paged(
            "u.id, u.email, u.password_hash, u.role_id, r.name AS role, u.is_deleted, u.created_at, u.updated_at",
            "FROM users u JOIN roles r ON r.id = u.role_id WHERE u.is_deleted = false",
            &sort_expression("u", query.sort_by),
            "u.id",
            query,
            |b| {
                if let Some(pattern) = &search {
                    b.push(" AND u.email ILIKE ").push_bind(pattern.clone());
                }
            },
        )
        .await
    }

    // --- OPERATIONS & ROLES ---

    async fn list_operations(&self) -> Result<Vec<Operation>> {
        let ops = sqlx::query_as::<_, Operation>("SELECT id, name FROM operations ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(ops)
    }

    /// role_has_operation
    ///
    /// The lookup at the end of the authorization chain: does `role_id` link to an
    /// operation with exactly this name.
    async fn role_has_operation(&self, role_id: Uuid, operation: &str) -> Result<bool> {
        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM role_operations ro
                JOIN operations o ON o.id = ro.operation_id
                WHERE ro.role_id = $1 AND o.name = $2
            )
            "#,
        )
        .bind(role_id)
        .bind(operation)
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at FROM roles WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn get_role(&self, id: Uuid) -> Result<Option<RoleDetails>> {
        let Some(role) =
            sqlx::query_as::<_, Role>("SELECT id, name, created_at FROM roles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };
        let operations = self.role_operations(role.id).await?;
        Ok(Some(RoleDetails {
            id: role.id,
            name: role.name,
            operations,
            created_at: role.created_at,
        }))
    }

    async fn all_roles(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, created_at FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn list_roles(&self, query: &ListQuery) -> Result<(i64, Vec<Role>)> {
        let search = query.search.as_deref().map(like_pattern);
        self.paged(
            "r.id, r.name, r.created_at",
            "FROM roles r WHERE true",
            &sort_expression("r", query.sort_by),
            "r.id",
            query,
            |b| {
                if let Some(pattern) = &search {
                    b.push(" AND r.name ILIKE ").push_bind(pattern.clone());
                }
            },
        )
        .await
    }

    /// create_role
    ///
    /// Role row and its operation links are written in one transaction.
    async fn create_role(&self, name: &str, operations: &[Uuid]) -> Result<Role> {
        let ids = self.check_operations(operations).await?;
        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING id, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO role_operations (role_id, operation_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(role.id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(role)
    }

    async fn update_role(&self, id: Uuid, name: &str, operations: &[Uuid]) -> Result<bool> {
        let ids = self.check_operations(operations).await?;
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query("UPDATE roles SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM role_operations WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO role_operations (role_id, operation_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool> {
        let assigned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if assigned > 0 {
            return Err(AppError::Conflict("role is assigned to users".into()));
        }

        // role_operations rows go with it (ON DELETE CASCADE).
        let res = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- MOVIES ---

    async fn list_movies(&self, query: &ListQuery, year: Option<i32>) -> Result<(i64, Vec<Movie>)> {
        let search = query.search.as_deref().map(like_pattern);
        self.paged(
            MOVIE_COLUMNS,
            "FROM movies m WHERE m.is_deleted = false",
            &sort_expression("m", query.sort_by),
            "m.id",
            query,
            |b| {
                if let Some(y) = year {
                    b.push(" AND m.year = ").push_bind(y);
                }
                if let Some(pattern) = &search {
                    b.push(" AND (m.title ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR m.description ILIKE ")
                        .push_bind(pattern.clone())
                        .push(")");
                }
            },
        )
        .await
    }

    async fn get_movie(&self, id: Uuid) -> Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies m WHERE m.id = $1 AND m.is_deleted = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn create_movie(&self, user_id: Uuid, movie: MovieRequest) -> Result<Movie> {
        let created = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (id, title, description, path, year, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, path, year, user_id, is_deleted, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(movie.title)
        .bind(movie.description)
        .bind(movie.path)
        .bind(movie.year)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_movie(&self, id: Uuid, changes: UpdateMovieRequest) -> Result<Option<Movie>> {
        let updated = sqlx::query_as::<_, Movie>(
            r#"
            UPDATE movies
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                path = COALESCE($4, path),
                year = COALESCE($5, year),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = false
            RETURNING id, title, description, path, year, user_id, is_deleted, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.path)
        .bind(changes.year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_movie(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE movies SET is_deleted = true, updated_at = NOW() WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        query: &ListQuery,
        movie_id: Option<Uuid>,
    ) -> Result<(i64, Vec<Comment>)> {
        let search = query.search.as_deref().map(like_pattern);
        self.paged(
            COMMENT_COLUMNS,
            "FROM comments c WHERE true",
            &sort_expression("c", query.sort_by),
            "c.id",
            query,
            |b| {
                if let Some(id) = movie_id {
                    b.push(" AND c.movie_id = ").push_bind(id);
                }
                if let Some(pattern) = &search {
                    b.push(" AND c.text ILIKE ").push_bind(pattern.clone());
                }
            },
        )
        .await
    }

    async fn movie_comments(&self, movie_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.movie_id = $1 ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn get_comment(&self, movie_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = $1 AND c.movie_id = $2"
        ))
        .bind(comment_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(&self, movie_id: Uuid, user_id: Uuid, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, movie_id, user_id, text)
            SELECT $1, m.id, $3, $4 FROM movies m
            WHERE m.id = $2 AND m.is_deleted = FALSE
            RETURNING id, movie_id, user_id, text, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(movie_id)
        .bind(user_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        comment.ok_or_else(|| AppError::NotFound(format!("movie {movie_id}")))
    }

    async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments SET text = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, movie_id, user_id, text, created_at, updated_at
            "#,
        )
        .bind(comment_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- RATINGS ---

    async fn list_ratings(
        &self,
        query: &ListQuery,
        movie_id: Option<Uuid>,
    ) -> Result<(i64, Vec<Rating>)> {
        let search = query.search.as_deref().map(like_pattern);
        self.paged(
            RATING_COLUMNS,
            "FROM ratings r JOIN movies m ON m.id = r.movie_id WHERE true",
            &sort_expression("r", query.sort_by),
            "r.id",
            query,
            |b| {
                if let Some(id) = movie_id {
                    b.push(" AND r.movie_id = ").push_bind(id);
                }
                if let Some(pattern) = &search {
                    b.push(" AND m.title ILIKE ").push_bind(pattern.clone());
                }
            },
        )
        .await
    }

    async fn movie_ratings(&self, movie_id: Uuid) -> Result<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings r WHERE r.movie_id = $1 ORDER BY r.created_at ASC, r.id ASC"
        ))
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn get_rating(&self, movie_id: Uuid, rating_id: Uuid) -> Result<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings r WHERE r.id = $1 AND r.movie_id = $2"
        ))
        .bind(rating_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    /// create_rating
    ///
    /// `ratings_movie_id_user_id_key` rejects a second rating by the same user.
    async fn create_rating(&self, movie_id: Uuid, user_id: Uuid, score: i32) -> Result<Rating> {
        let rating = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (id, movie_id, user_id, score)
            SELECT $1, m.id, $3, $4 FROM movies m
            WHERE m.id = $2 AND m.is_deleted = FALSE
            RETURNING id, movie_id, user_id, score, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(movie_id)
        .bind(user_id)
        .bind(score)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("movie already rated by this user".into()),
            other => other,
        })?;
        rating.ok_or_else(|| AppError::NotFound(format!("movie {movie_id}")))
    }

    async fn update_rating(&self, rating_id: Uuid, score: i32) -> Result<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(
            r#"
            UPDATE ratings SET score = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, movie_id, user_id, score, created_at, updated_at
            "#,
        )
        .bind(rating_id)
        .bind(score)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn delete_rating(&self, rating_id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(rating_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
