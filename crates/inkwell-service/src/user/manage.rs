//! Account administration: roles, direct grants and the trash.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use inkwell_auth::password::PasswordHasher;
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse, TrashMode};
use inkwell_database::repositories::UserFilter;
use inkwell_entity::user::{CreateUser, UpdateUser, User, UserAccount};

use super::service::{check_password, normalize_username};
use super::store::UserStore;

/// Input for [`UserManageService::create`].
#[derive(Debug, Clone, Default)]
pub struct ManagedAccount {
    pub username: String,
    pub password: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub actived: Option<bool>,
    /// Role ids; the default user role when absent.
    pub roles: Option<Vec<Uuid>>,
    /// Permission ids granted outside of roles.
    pub permissions: Vec<Uuid>,
}

/// Input for [`UserManageService::update`]; `None` keeps a field.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub actived: Option<bool>,
    /// Replaces the assigned roles.
    pub roles: Option<Vec<Uuid>>,
    /// Replaces the direct grants.
    pub permissions: Option<Vec<Uuid>>,
}

/// Admin operations on accounts.
///
/// The founding account (`is_creator`) can be edited but never disabled,
/// trashed or purged.
#[derive(Clone)]
pub struct UserManageService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    default_role: String,
}

impl std::fmt::Debug for UserManageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserManageService")
            .field("default_role", &self.default_role)
            .finish_non_exhaustive()
    }
}

impl UserManageService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, default_role: impl Into<String>) -> Self {
        Self {
            store,
            hasher,
            default_role: default_role.into(),
        }
    }

    pub async fn list(&self, filter: UserFilter, page: &PageRequest) -> AppResult<PageResponse<User>> {
        self.store.paginate(filter, &page.normalized()).await
    }

    /// An account with its roles and direct permissions.
    pub async fn detail(&self, id: Uuid, trash: TrashMode) -> AppResult<UserAccount> {
        let user = self.find(id, trash).await?;
        self.account(user).await
    }

    pub async fn create(&self, data: ManagedAccount) -> AppResult<UserAccount> {
        let username = normalize_username(&data.username)?;
        check_password(&data.password)?;
        if self.store.find_by_username(&username).await?.is_some() {
            return Err(AppError::conflict(format!("Username '{username}' is taken")));
        }

        let roles = match data.roles {
            Some(roles) => roles,
            None => self.default_roles().await?,
        };
        self.ensure_roles_exist(&roles).await?;
        self.ensure_permissions_exist(&data.permissions).await?;

        let user = self
            .store
            .create(&CreateUser {
                username,
                nickname: data.nickname,
                email: data.email,
                password_hash: self.hasher.hash(&data.password)?,
                actived: data.actived.unwrap_or(true),
                is_creator: false,
            })
            .await?;
        self.store.set_roles(user.id, &roles).await?;
        self.store.set_permissions(user.id, &data.permissions).await?;

        info!(user_id = %user.id, username = %user.username, "User created by administrator");
        self.account(user).await
    }

    pub async fn update(&self, id: Uuid, data: AccountPatch) -> AppResult<UserAccount> {
        let user = self.find(id, TrashMode::None).await?;
        if user.is_creator && data.actived == Some(false) {
            return Err(AppError::policy("The founding account cannot be disabled"));
        }

        let username = match &data.username {
            Some(raw) => {
                let name = normalize_username(raw)?;
                let taken = self
                    .store
                    .find_by_username(&name)
                    .await?
                    .is_some_and(|other| other.id != id);
                if taken {
                    return Err(AppError::conflict(format!("Username '{name}' is taken")));
                }
                Some(name)
            }
            None => None,
        };
        let password_hash = match &data.password {
            Some(password) => {
                check_password(password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };
        if let Some(roles) = &data.roles {
            self.ensure_roles_exist(roles).await?;
        }
        if let Some(permissions) = &data.permissions {
            self.ensure_permissions_exist(permissions).await?;
        }

        self.store
            .update(
                id,
                &UpdateUser {
                    username,
                    nickname: data.nickname,
                    email: data.email,
                    password_hash,
                    actived: data.actived,
                },
            )
            .await?;
        if let Some(roles) = &data.roles {
            self.store.set_roles(id, roles).await?;
        }
        if let Some(permissions) = &data.permissions {
            self.store.set_permissions(id, permissions).await?;
        }

        info!(user_id = %id, "User updated by administrator");
        self.detail(id, TrashMode::None).await
    }

    /// Trash accounts, or purge them (trashed included) when `trash` is false.
    pub async fn delete(&self, ids: &[Uuid], trash: bool) -> AppResult<Vec<User>> {
        let mode = if trash { TrashMode::None } else { TrashMode::All };
        let users = self.store.find_by_ids(ids, mode).await?;
        if users.is_empty() {
            return Err(AppError::not_found("User not found"));
        }
        if let Some(creator) = users.iter().find(|u| u.is_creator) {
            return Err(AppError::policy(format!(
                "The founding account '{}' cannot be deleted",
                creator.username
            )));
        }

        let targets: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let affected = if trash {
            self.store.soft_delete(&targets).await?
        } else {
            self.store.hard_delete(&targets).await?
        };
        info!(count = affected, trash, "Users deleted");
        Ok(users)
    }

    pub async fn restore(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let trashed = self.store.find_by_ids(ids, TrashMode::Only).await?;
        if trashed.is_empty() {
            return Err(AppError::not_found("User not found"));
        }
        let targets: Vec<Uuid> = trashed.iter().map(|u| u.id).collect();
        let affected = self.store.restore(&targets).await?;
        info!(count = affected, "Users restored");
        self.store.find_by_ids(&targets, TrashMode::None).await
    }

    async fn find(&self, id: Uuid, trash: TrashMode) -> AppResult<User> {
        self.store
            .find_by_ids(&[id], trash)
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn account(&self, user: User) -> AppResult<UserAccount> {
        let roles = self.store.roles_of(user.id).await?;
        let permissions = self.store.permissions_of(user.id).await?;
        Ok(UserAccount {
            user,
            roles,
            permissions,
        })
    }

    async fn default_roles(&self) -> AppResult<Vec<Uuid>> {
        Ok(self
            .store
            .role_by_name(&self.default_role)
            .await?
            .map(|role| vec![role.id])
            .unwrap_or_default())
    }

    async fn ensure_roles_exist(&self, ids: &[Uuid]) -> AppResult<()> {
        let found = self.store.existing_roles(ids).await?;
        ensure_all(ids, &found, "Unknown roles")
    }

    async fn ensure_permissions_exist(&self, ids: &[Uuid]) -> AppResult<()> {
        let found = self.store.existing_permissions(ids).await?;
        ensure_all(ids, &found, "Unknown permissions")
    }
}

fn ensure_all(wanted: &[Uuid], found: &[Uuid], label: &str) -> AppResult<()> {
    let found: HashSet<&Uuid> = found.iter().collect();
    let missing: Vec<String> = wanted
        .iter()
        .filter(|id| !found.contains(id))
        .map(ToString::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!("{label}: {}", missing.join(", "))))
    }
}
