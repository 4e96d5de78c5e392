//! Role-based access control.
//!
//! Boot: feature modules fill an [`RbacRegistry`], the [`RbacSeeder`]
//! writes it to storage. Per request: the actor is loaded through an
//! [`RbacStore`], the [`PermissionGuard`] compiles an [`Ability`] for it
//! and runs the route's [`PermissionChecker`]s.

pub mod ability;
pub mod action;
pub mod actor;
pub mod checker;
pub mod condition;
pub mod guard;
pub mod memory;
pub mod registry;
pub mod seeder;
pub mod store;
pub mod subject;
pub mod tree;

pub use ability::Ability;
pub use action::PermissionAction;
pub use actor::{Actor, ActorRole, GrantedPermission};
pub use checker::{CheckContext, PermissionChecker, RequestItems, check_owner};
pub use condition::{Conditions, FieldPath, Operand, Predicate};
pub use guard::{Decision, FORBIDDEN_MESSAGE, PermissionGuard, RoutePolicy};
pub use memory::MemoryRbacStore;
pub use registry::{
    PermissionDefinition, RbacRegistry, RoleDefinition, Rule, SUPER_ADMIN, SYSTEM_MANAGE,
};
pub use seeder::{RbacSeeder, SeedReport};
pub use store::{PgRbacStore, RbacStore};
pub use subject::{ALL_SUBJECTS, Subject};
