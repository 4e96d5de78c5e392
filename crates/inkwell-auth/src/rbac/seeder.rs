//! Boot-time persistence of registered permissions and system roles.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use inkwell_core::config::SeedPolicy;
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_entity::rbac::{CreateRole, PermissionRecord};

use super::registry::{PermissionDefinition, RbacRegistry};
use super::store::RbacStore;

/// What a seeding pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted_permissions: Vec<String>,
    pub updated_permissions: Vec<String>,
    pub created_roles: Vec<String>,
    pub synced_roles: Vec<String>,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.inserted_permissions.is_empty()
            && self.updated_permissions.is_empty()
            && self.created_roles.is_empty()
            && self.synced_roles.is_empty()
    }
}

/// Writes a registry into an [`RbacStore`].
///
/// Under [`SeedPolicy::InsertOnly`] missing permissions and roles are
/// created and existing rows are left alone. [`SeedPolicy::Sync`] also
/// rewrites stored permission rules and resets each declared role's
/// permission set to the declared one. Stored permissions the registry no
/// longer knows are never deleted.
pub struct RbacSeeder<'a> {
    registry: &'a RbacRegistry,
    store: &'a dyn RbacStore,
}

impl<'a> RbacSeeder<'a> {
    pub fn new(registry: &'a RbacRegistry, store: &'a dyn RbacStore) -> Self {
        Self { registry, store }
    }

    pub async fn seed(&self, policy: SeedPolicy) -> AppResult<SeedReport> {
        self.registry.validate()?;

        let mut report = SeedReport::default();
        let ids = self.seed_permissions(policy, &mut report).await?;
        self.seed_roles(policy, &ids, &mut report).await?;

        info!(
            policy = %policy,
            inserted_permissions = report.inserted_permissions.len(),
            updated_permissions = report.updated_permissions.len(),
            created_roles = report.created_roles.len(),
            synced_roles = report.synced_roles.len(),
            "RBAC seeding finished"
        );
        Ok(report)
    }

    /// Returns the id of every registered permission.
    async fn seed_permissions(
        &self,
        policy: SeedPolicy,
        report: &mut SeedReport,
    ) -> AppResult<HashMap<String, Uuid>> {
        let stored: HashMap<String, PermissionRecord> = self
            .store
            .permissions()
            .await?
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        let mut ids = HashMap::new();
        for definition in self.registry.permissions() {
            let rule = definition.rule.stored();
            match stored.get(&definition.name) {
                None => {
                    let record = self
                        .store
                        .insert_permission(
                            &definition.name,
                            definition.label.as_deref(),
                            definition.description.as_deref(),
                            &rule,
                        )
                        .await?;
                    info!(permission = %definition.name, "Inserted permission");
                    report.inserted_permissions.push(definition.name.clone());
                    ids.insert(definition.name.clone(), record.id);
                }
                Some(record) => {
                    if policy == SeedPolicy::Sync && differs(record, definition) {
                        self.store
                            .update_permission(
                                record.id,
                                definition.label.as_deref(),
                                definition.description.as_deref(),
                                &rule,
                            )
                            .await?;
                        info!(permission = %definition.name, "Updated permission");
                        report.updated_permissions.push(definition.name.clone());
                    }
                    ids.insert(definition.name.clone(), record.id);
                }
            }
        }

        let orphans = stored
            .keys()
            .filter(|name| self.registry.permission(name).is_none())
            .count();
        if orphans > 0 {
            debug!(orphans, "Stored permissions without a registration were left in place");
        }
        Ok(ids)
    }

    async fn seed_roles(
        &self,
        policy: SeedPolicy,
        ids: &HashMap<String, Uuid>,
        report: &mut SeedReport,
    ) -> AppResult<()> {
        for definition in self.registry.roles() {
            let declared = definition
                .permissions
                .iter()
                .map(|name| {
                    ids.get(name).copied().ok_or_else(|| {
                        AppError::configuration(format!(
                            "Role '{}' references unregistered permission '{name}'",
                            definition.name
                        ))
                    })
                })
                .collect::<AppResult<Vec<Uuid>>>()?;

            match self.store.role_by_name(&definition.name).await? {
                None => {
                    self.store
                        .create_role(&CreateRole {
                            name: definition.name.clone(),
                            label: definition.label.clone(),
                            description: definition.description.clone(),
                            parent_id: None,
                            systemed: true,
                            permissions: declared,
                        })
                        .await?;
                    info!(role = %definition.name, "Created system role");
                    report.created_roles.push(definition.name.clone());
                }
                Some(role) if policy == SeedPolicy::Sync => {
                    if !role.systemed {
                        warn!(role = %role.name, "Syncing a role that is not marked as system role");
                    }
                    let current: HashSet<Uuid> = role.permissions.iter().map(|p| p.id).collect();
                    let wanted: HashSet<Uuid> = declared.iter().copied().collect();
                    if current != wanted {
                        self.store.set_role_permissions(role.id, &declared).await?;
                        info!(role = %definition.name, "Synced role permissions");
                        report.synced_roles.push(definition.name.clone());
                    }
                }
                Some(_) => debug!(role = %definition.name, "System role exists; leaving it as stored"),
            }
        }
        Ok(())
    }
}

fn differs(record: &PermissionRecord, definition: &PermissionDefinition) -> bool {
    record.rule_differs(&definition.rule.stored())
        || record.label != definition.label
        || record.description != definition.description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::action::PermissionAction;
    use crate::rbac::memory::MemoryRbacStore;
    use crate::rbac::registry::{RoleDefinition, Rule, SUPER_ADMIN, SYSTEM_MANAGE};

    fn registry() -> RbacRegistry {
        let mut registry = RbacRegistry::new();
        registry.add_permissions([
            PermissionDefinition::new("post.create", Rule::new(PermissionAction::Create, "Post")),
            PermissionDefinition::new("comment.create", Rule::new(PermissionAction::Create, "Comment")),
        ]);
        registry.add_roles([RoleDefinition::new("user", ["post.create"])]);
        registry
    }

    fn names(role: &inkwell_entity::rbac::Role) -> Vec<String> {
        let mut names: Vec<String> = role.permission_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_first_boot_inserts_everything() {
        let store = MemoryRbacStore::new();
        let report = RbacSeeder::new(&registry(), &store)
            .seed(SeedPolicy::InsertOnly)
            .await
            .unwrap();

        assert_eq!(
            report.inserted_permissions,
            vec![SYSTEM_MANAGE, "post.create", "comment.create"]
        );
        assert_eq!(report.created_roles, vec![SUPER_ADMIN, "user"]);

        let user = store.role_by_name("user").await.unwrap().unwrap();
        assert!(user.systemed);
        assert_eq!(names(&user), vec!["post.create"]);
        let admin = store.role_by_name(SUPER_ADMIN).await.unwrap().unwrap();
        assert_eq!(names(&admin), vec![SYSTEM_MANAGE]);
    }

    #[tokio::test]
    async fn test_second_boot_is_a_noop() {
        let store = MemoryRbacStore::new();
        let registry = registry();
        let seeder = RbacSeeder::new(&registry, &store);
        seeder.seed(SeedPolicy::InsertOnly).await.unwrap();
        let report = seeder.seed(SeedPolicy::InsertOnly).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(store.roles().await.len(), 2);
        assert_eq!(store.permissions().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insert_only_keeps_existing_role_permissions() {
        let store = MemoryRbacStore::new();
        RbacSeeder::new(&registry(), &store)
            .seed(SeedPolicy::InsertOnly)
            .await
            .unwrap();

        let mut grown = registry();
        grown.add_roles([RoleDefinition::new("user", ["comment.create"])]);
        let report = RbacSeeder::new(&grown, &store)
            .seed(SeedPolicy::InsertOnly)
            .await
            .unwrap();
        assert!(report.synced_roles.is_empty());
        let user = store.role_by_name("user").await.unwrap().unwrap();
        assert_eq!(names(&user), vec!["post.create"]);

        let report = RbacSeeder::new(&grown, &store).seed(SeedPolicy::Sync).await.unwrap();
        assert_eq!(report.synced_roles, vec!["user"]);
        let user = store.role_by_name("user").await.unwrap().unwrap();
        assert_eq!(names(&user), vec!["comment.create", "post.create"]);
    }

    #[tokio::test]
    async fn test_sync_rewrites_changed_rules() {
        let store = MemoryRbacStore::new();
        RbacSeeder::new(&registry(), &store)
            .seed(SeedPolicy::InsertOnly)
            .await
            .unwrap();

        let mut changed = registry();
        changed.add_permissions([PermissionDefinition::new(
            "post.create",
            Rule::new(PermissionAction::Manage, "Post"),
        )]);

        let report = RbacSeeder::new(&changed, &store)
            .seed(SeedPolicy::InsertOnly)
            .await
            .unwrap();
        assert!(report.updated_permissions.is_empty());

        let report = RbacSeeder::new(&changed, &store).seed(SeedPolicy::Sync).await.unwrap();
        assert_eq!(report.updated_permissions, vec!["post.create"]);
        let stored = store.permissions().await.unwrap();
        let post = stored.iter().find(|p| p.name == "post.create").unwrap();
        assert_eq!(post.rule.action, "manage");
    }

    #[tokio::test]
    async fn test_unregistered_permission_aborts_before_writing() {
        let store = MemoryRbacStore::new();
        let mut broken = registry();
        broken.add_roles([RoleDefinition::new("editor", ["post.publish"])]);
        let err = RbacSeeder::new(&broken, &store)
            .seed(SeedPolicy::InsertOnly)
            .await
            .unwrap_err();
        assert!(err.is(inkwell_core::error::ErrorKind::Configuration));
        assert!(store.permissions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orphaned_rows_survive() {
        let store = MemoryRbacStore::new();
        let rule = Rule::new(PermissionAction::Read, "Legacy").stored();
        store
            .insert_permission("legacy.read", None, None, &rule)
            .await
            .unwrap();
        RbacSeeder::new(&registry(), &store)
            .seed(SeedPolicy::Sync)
            .await
            .unwrap();
        let stored = store.permissions().await.unwrap();
        assert!(stored.iter().any(|p| p.name == "legacy.read"));
    }
}
