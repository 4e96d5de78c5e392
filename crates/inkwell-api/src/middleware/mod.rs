//! Axum middleware stack.

pub mod actor;
pub mod compression;
pub mod cors;
pub mod guard;
pub mod logging;

pub use actor::{ActorResolver, CurrentActor, resolve_actor};
pub use guard::{GuardContext, RouteGate, permission_guard};
