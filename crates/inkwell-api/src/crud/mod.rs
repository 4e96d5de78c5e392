//! Declarative CRUD registration.
//!
//! A [`Controller`] binds the enabled [`CrudAction`]s of a
//! [`CrudService`] to generic handlers, each behind the permission guard
//! with the checkers given in its [`CrudMethodOption`]. Every bound
//! endpoint is described by a [`RouteEntry`].

pub mod action;
pub mod controller;
mod handlers;
pub mod options;
pub mod service;
pub mod table;

pub use action::CrudAction;
pub use controller::{Controller, Endpoint};
pub use options::{CrudItem, CrudMethodOption, CrudOptions, Serialization, hook_option};
pub use service::{CrudService, DeleteInput, DetailQuery, NoInput, RestoreInput, UpdateInput};
pub use table::{RouteEntry, RouteTable};

/// Join path pieces, dropping empty segments and stray slashes.
pub(crate) fn join_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let segments: Vec<&str> = parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
