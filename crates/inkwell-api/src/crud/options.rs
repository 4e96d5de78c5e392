//! Per-controller CRUD configuration.

use axum::routing::MethodRouter;

use inkwell_auth::rbac::PermissionChecker;

use super::action::CrudAction;

/// Which serialization group a response goes through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Serialization {
    /// `{id}-list` for list, `{id}-detail` for everything else.
    #[default]
    Default,
    Group(String),
    /// Skip grouping; the item is returned as serialized.
    NoGroup,
}

/// Overrides for one enabled action.
pub struct CrudMethodOption<S> {
    /// Checkers run in order; all must pass.
    pub permissions: Vec<PermissionChecker<S>>,
    pub allow_guest: bool,
    pub summary: Option<String>,
    pub serialize: Serialization,
    /// Replaces the generic handler for this action.
    pub handler: Option<MethodRouter<S>>,
}

impl<S> Default for CrudMethodOption<S> {
    fn default() -> Self {
        Self {
            permissions: Vec::new(),
            allow_guest: false,
            summary: None,
            serialize: Serialization::Default,
            handler: None,
        }
    }
}

impl<S> CrudMethodOption<S> {
    pub fn with_permissions(mut self, checkers: Vec<PermissionChecker<S>>) -> Self {
        self.permissions = checkers;
        self
    }

    pub fn guest(mut self) -> Self {
        self.allow_guest = true;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn serialize(mut self, serialize: Serialization) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn handler(mut self, handler: MethodRouter<S>) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// Shorthand for the common summary + guest flag + checkers option.
pub fn hook_option<S>(
    summary: impl Into<String>,
    allow_guest: bool,
    permissions: Vec<PermissionChecker<S>>,
) -> CrudMethodOption<S> {
    CrudMethodOption {
        permissions,
        allow_guest,
        summary: Some(summary.into()),
        ..CrudMethodOption::default()
    }
}

/// One enabled action.
pub struct CrudItem<S> {
    pub action: CrudAction,
    pub option: CrudMethodOption<S>,
}

impl<S> CrudItem<S> {
    pub fn new(action: CrudAction, option: CrudMethodOption<S>) -> Self {
        Self { action, option }
    }
}

impl<S> From<CrudAction> for CrudItem<S> {
    fn from(action: CrudAction) -> Self {
        Self::new(action, CrudMethodOption::default())
    }
}

/// The actions a controller enables, in registration order.
pub struct CrudOptions<S> {
    /// Prefix of the default serialization groups.
    pub id: String,
    pub enabled: Vec<CrudItem<S>>,
}

impl<S> CrudOptions<S> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: Vec::new(),
        }
    }

    pub fn enable(mut self, item: impl Into<CrudItem<S>>) -> Self {
        self.enabled.push(item.into());
        self
    }

    pub fn action(self, action: CrudAction, option: CrudMethodOption<S>) -> Self {
        self.enable(CrudItem::new(action, option))
    }

    /// Group name used for `action` when no override is given.
    pub fn default_group(&self, action: CrudAction) -> String {
        default_group(&self.id, action)
    }
}

fn default_group(id: &str, action: CrudAction) -> String {
    match action {
        CrudAction::List => format!("{id}-list"),
        _ => format!("{id}-detail"),
    }
}

/// Group a response of `action` goes through, if any.
pub(crate) fn resolve_group(id: &str, action: CrudAction, serialize: &Serialization) -> Option<String> {
    match serialize {
        Serialization::Default => Some(default_group(id, action)),
        Serialization::Group(group) => Some(group.clone()),
        Serialization::NoGroup => None,
    }
}
