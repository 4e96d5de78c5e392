//! # inkwell-auth
//!
//! Authentication and authorization for Inkwell.
//!
//! ## Modules
//!
//! - `jwt`: access/refresh token issuing and validation
//! - `password`: Argon2id hashing
//! - `rbac`: the permission registry, ability compiler, permission
//!   checkers, request guard and boot-time seeder

pub mod jwt;
pub mod password;
pub mod rbac;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
pub use rbac::{Ability, Actor, PermissionAction, PermissionChecker, PermissionGuard, RbacRegistry};
