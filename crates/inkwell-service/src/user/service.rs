//! Account operations: credential checks and account creation.

use tracing::{info, warn};
use uuid::Uuid;

use inkwell_auth::password::PasswordHasher;
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_database::repositories::{RoleRepository, UserRepository};
use inkwell_entity::user::{CreateUser, User};

/// Input for [`UserService::register`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    /// Extra roles, by name, on top of the default user role.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_creator: bool,
}

#[derive(Debug, Clone)]
pub struct UserService {
    users: UserRepository,
    roles: RoleRepository,
    hasher: PasswordHasher,
    default_role: String,
}

impl UserService {
    pub fn new(
        users: UserRepository,
        roles: RoleRepository,
        hasher: PasswordHasher,
        default_role: impl Into<String>,
    ) -> Self {
        Self {
            users,
            roles,
            hasher,
            default_role: default_role.into(),
        }
    }

    pub async fn profile(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Check a username/password pair.
    ///
    /// Unknown users, wrong passwords and disabled accounts all yield the
    /// same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let invalid = || AppError::unauthorized("Invalid username or password");

        let user = self.users.find_by_username(username).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(username = %username, "Failed login attempt");
            return Err(invalid());
        }
        if !user.can_login() {
            return Err(invalid());
        }
        Ok(user)
    }

    /// Create an account holding the default role plus `account.roles`.
    pub async fn register(&self, account: NewAccount) -> AppResult<User> {
        let username = normalize_username(&account.username)?;
        check_password(&account.password)?;
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::conflict(format!("Username '{username}' is taken")));
        }

        let user = self
            .users
            .create(&CreateUser {
                username,
                nickname: account.nickname,
                email: account.email,
                password_hash: self.hasher.hash(&account.password)?,
                actived: true,
                is_creator: account.is_creator,
            })
            .await?;

        let mut role_names = vec![self.default_role.clone()];
        role_names.extend(account.roles.into_iter().filter(|r| *r != self.default_role));
        for name in role_names {
            match self.roles.find_by_name(&name).await? {
                Some(role) => self.roles.assign_user(role.id, user.id).await?,
                None => warn!(role = %name, user_id = %user.id, "Role not found; not assigned"),
            }
        }

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }
}

/// Trimmed login name, at least three characters long.
pub(crate) fn normalize_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    if username.chars().count() < 3 {
        return Err(AppError::validation("Username must be at least 3 characters"));
    }
    Ok(username.to_string())
}

pub(crate) fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < 8 {
        return Err(AppError::validation("Password must be at least 8 characters"));
    }
    Ok(())
}
