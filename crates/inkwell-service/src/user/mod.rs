//! Accounts: sign-in, registration and administration.

pub mod manage;
pub mod rbac;
pub mod service;
pub mod store;

pub use manage::{AccountPatch, ManagedAccount, UserManageService};
pub use service::{NewAccount, UserService};
pub use store::{MemoryUserStore, PgUserStore, UserStore};
