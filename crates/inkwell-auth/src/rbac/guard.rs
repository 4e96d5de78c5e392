//! Request-time authorization.

use std::sync::Arc;

use tracing::debug;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;

use super::ability::Ability;
use super::actor::Actor;
use super::checker::{CheckContext, PermissionChecker, RequestItems};
use super::registry::RbacRegistry;

/// Message of every authorization rejection. Which rule failed is never
/// reported to the caller.
pub const FORBIDDEN_MESSAGE: &str = "Forbidden resource";

/// Outcome of running a route's checkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Authorization requirements of one route.
pub struct RoutePolicy<S> {
    pub allow_guest: bool,
    pub checkers: Vec<PermissionChecker<S>>,
}

impl<S> Clone for RoutePolicy<S> {
    fn clone(&self) -> Self {
        Self {
            allow_guest: self.allow_guest,
            checkers: self.checkers.clone(),
        }
    }
}

impl<S> std::fmt::Debug for RoutePolicy<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutePolicy")
            .field("allow_guest", &self.allow_guest)
            .field("checkers", &self.checkers)
            .finish()
    }
}

/// Compiles abilities and runs route checkers.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    registry: Arc<RbacRegistry>,
}

impl PermissionGuard {
    pub fn new(registry: Arc<RbacRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RbacRegistry {
        &self.registry
    }

    pub fn ability_for(&self, actor: Option<Arc<Actor>>) -> Ability {
        Ability::compile(&self.registry, actor)
    }

    /// Run the checkers in declaration order, stopping at the first
    /// `false`. Errors from checkers are returned untouched.
    pub async fn evaluate<S: Clone + Send + 'static>(
        &self,
        ability: Arc<Ability>,
        checkers: &[PermissionChecker<S>],
        state: &S,
        items: RequestItems,
    ) -> AppResult<Decision> {
        let items = Arc::new(items);
        for (index, checker) in checkers.iter().enumerate() {
            let ctx = CheckContext {
                ability: Arc::clone(&ability),
                state: state.clone(),
                items: Arc::clone(&items),
            };
            if !checker.check(ctx).await? {
                debug!(
                    actor = ?ability.actor().map(|a| a.id),
                    checker = index,
                    label = checker.label(),
                    "Permission checker denied"
                );
                return Ok(Decision::Deny);
            }
        }
        Ok(Decision::Allow)
    }

    /// Gate a request.
    ///
    /// Guests are turned away with 401 unless the route allows them. A
    /// denying checker, or a checker failing with anything but
    /// `NotFound`, becomes a 403 carrying [`FORBIDDEN_MESSAGE`].
    /// `NotFound` passes through so a missing record still reads as 404.
    pub async fn authorize<S: Clone + Send + 'static>(
        &self,
        actor: Option<Arc<Actor>>,
        policy: &RoutePolicy<S>,
        state: &S,
        items: RequestItems,
    ) -> AppResult<Arc<Ability>> {
        if actor.is_none() && !policy.allow_guest {
            return Err(AppError::unauthorized("Authentication required"));
        }

        let ability = Arc::new(self.ability_for(actor));
        match self.evaluate(Arc::clone(&ability), &policy.checkers, state, items).await {
            Ok(Decision::Allow) => Ok(ability),
            Ok(Decision::Deny) => Err(AppError::forbidden(FORBIDDEN_MESSAGE)),
            Err(e) if e.is(ErrorKind::NotFound) => Err(e),
            Err(e) => {
                debug!(error = %e, "Permission checker failed");
                Err(AppError::forbidden(FORBIDDEN_MESSAGE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use uuid::Uuid;

    use super::*;
    use crate::rbac::action::PermissionAction;

    fn actor() -> Option<Arc<Actor>> {
        Some(Arc::new(Actor {
            id: Uuid::new_v4(),
            username: "u".into(),
            roles: vec![],
            permissions: vec![],
        }))
    }

    fn fixed(result: bool) -> PermissionChecker<()> {
        PermissionChecker::new("fixed", move |_| async move { Ok(result) })
    }

    fn policy(checkers: Vec<PermissionChecker<()>>) -> RoutePolicy<()> {
        RoutePolicy {
            allow_guest: false,
            checkers,
        }
    }

    fn guard() -> PermissionGuard {
        PermissionGuard::new(Arc::new(RbacRegistry::new()))
    }

    #[tokio::test]
    async fn test_all_checkers_must_pass() {
        let g = guard();
        let both = policy(vec![fixed(true), fixed(true)]);
        assert!(g.authorize(actor(), &both, &(), RequestItems::default()).await.is_ok());

        let mixed = policy(vec![fixed(true), fixed(false)]);
        let err = g
            .authorize(actor(), &mixed, &(), RequestItems::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
        assert_eq!(err.message, FORBIDDEN_MESSAGE);
    }

    #[tokio::test]
    async fn test_checkers_run_in_order_and_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counted = PermissionChecker::new("counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(true) }
        });
        let decision = guard()
            .evaluate(
                Arc::new(Ability::guest()),
                &[fixed(false), counted],
                &(),
                RequestItems::default(),
            )
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_guest_rejected_unless_allowed() {
        let g = guard();
        let err = g
            .authorize(None, &policy(vec![]), &(), RequestItems::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authentication));

        let open = RoutePolicy {
            allow_guest: true,
            checkers: vec![],
        };
        assert!(g.authorize(None, &open, &(), RequestItems::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_checker_errors() {
        let g = guard();
        let missing = PermissionChecker::new("missing", |_| async {
            Err(AppError::not_found("Post not found"))
        });
        let err = g
            .authorize(actor(), &policy(vec![missing]), &(), RequestItems::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));

        let broken = PermissionChecker::new("broken", |_| async {
            Err(AppError::database("connection reset"))
        });
        let err = g
            .authorize(actor(), &policy(vec![broken]), &(), RequestItems::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
        assert_eq!(err.message, FORBIDDEN_MESSAGE);
    }

    #[tokio::test]
    async fn test_owner_checker_fails_closed_on_empty_targets() {
        let g = guard();
        let fetched = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetched);
        let owner = PermissionChecker::<()>::owner(PermissionAction::Owner, move |_, _ids| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Vec::<inkwell_entity::content::Post>::new()) }
        });
        let err = g
            .authorize(actor(), &policy(vec![owner.clone()]), &(), RequestItems::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
        assert_eq!(fetched.load(Ordering::SeqCst), 0);

        let err = g
            .authorize(
                actor(),
                &policy(vec![owner]),
                &(),
                RequestItems::new(vec![Uuid::new_v4()]),
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Authorization));
        assert_eq!(fetched.load(Ordering::SeqCst), 1);
    }
}
