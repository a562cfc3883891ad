use uuid::Uuid;

use crate::{
    config::PasswordConfig,
    error::{AppError, Result},
    models::{NewUser, User, UserChanges},
    repository::RepositoryState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Seeded role holding every operation.
pub const ADMIN_ROLE: &str = "Admin";

/// CredentialStore
///
/// Owns everything that touches a password: account creation, login checks and
/// password changes. Hashing uses bcrypt with a fresh salt per hash and the cost
/// from the `PasswordConfig` it was built with.
#[derive(Clone)]
pub struct CredentialStore {
    repo: RepositoryState,
    config: PasswordConfig,
}

impl CredentialStore {
    pub fn new(repo: RepositoryState, config: PasswordConfig) -> Self {
        Self { repo, config }
    }

    /// create_user
    ///
    /// Registers a new account under `role_id`.
    /// Fails `BadRequest` on a malformed email, short password or unknown role,
    /// and `Conflict` when the email is already registered.
    pub async fn create_user(&self, email: &str, password: &str, role_id: Uuid) -> Result<User> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!("email '{email}' is already registered")));
        }
        if !self.repo.all_roles().await?.iter().any(|r| r.id == role_id) {
            return Err(AppError::BadRequest("unknown role".into()));
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .repo
            .create_user(NewUser {
                email,
                password_hash,
                role_id,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// ensure_admin
    ///
    /// Creates `email` with the `Admin` role unless the address is already taken.
    /// Returns whether an account was created, so startup can run it every time.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool> {
        let role = self
            .repo
            .find_role_by_name(ADMIN_ROLE)
            .await?
            .ok_or_else(|| AppError::Internal(format!("role '{ADMIN_ROLE}' is not seeded")))?;

        match self.create_user(email, password, role.id).await {
            Ok(_) => Ok(true),
            Err(AppError::Conflict(_)) => {
                tracing::debug!("admin account already present");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// authenticate
    ///
    /// Unknown email, deleted account and wrong password all look the same to the
    /// caller: `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let Some(user) = self.repo.find_user_by_email(email.trim()).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !self.verify(password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "login rejected");
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    /// change_password
    ///
    /// Requires the current password. The new one obeys the same length rule as
    /// sign-up.
    pub async fn change_password(&self, user: &User, old: &str, new: &str) -> Result<()> {
        if !self.verify(old, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        validate_password(new)?;

        let password_hash = self.hash(new).await?;
        self.repo
            .update_user(
                user.id,
                UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;

        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// update_profile
    ///
    /// Changes the email and/or role of an account. Email uniqueness is checked
    /// against every other live account.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        role_id: Option<Uuid>,
    ) -> Result<User> {
        let email = email.map(normalize_email).transpose()?;
        if let Some(email) = &email {
            if let Some(existing) = self.repo.find_user_by_email(email).await? {
                if existing.id != user_id {
                    return Err(AppError::Conflict(format!(
                        "email '{email}' is already registered"
                    )));
                }
            }
        }
        if let Some(role_id) = role_id {
            if !self.repo.all_roles().await?.iter().any(|r| r.id == role_id) {
                return Err(AppError::BadRequest("unknown role".into()));
            }
        }

        self.repo
            .update_user(
                user_id,
                UserChanges {
                    email,
                    role_id,
                    password_hash: None,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))
    }

    // bcrypt is CPU-bound; keep it off the async worker threads.
    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_owned();
        let cost = self.config.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .or_else(|e| {
                // A corrupt stored hash is a failed login, not a server error.
                tracing::warn!("stored password hash rejected: {}", e);
                Ok(false)
            })
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_lowercase())
        }
        _ => Err(AppError::BadRequest(format!("'{email}' is not a valid email"))),
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
