//! Permission checkers: async predicates attached to routes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use inkwell_core::result::AppResult;

use super::ability::Ability;
use super::action::PermissionAction;
use super::subject::Subject;

/// Target record ids pulled out of a request.
///
/// Sources follow the CRUD conventions: `id` or `item` from the path,
/// `id` or `item` from the body, or the body's `items` array. A request
/// naming its targets in more than one place yields no targets, so the
/// ids checked are always the ids the handler acts on. A malformed id
/// anywhere in the chosen source yields no targets at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestItems(Vec<Uuid>);

impl RequestItems {
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self(ids)
    }

    pub fn extract<'a>(
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
        body: Option<&Value>,
    ) -> Self {
        let params: Vec<(&str, &str)> = params.into_iter().collect();
        let param = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| Value::String(v.to_string()))
        };
        let field = |key: &str| body.and_then(|b| b.get(key)).filter(|v| !v.is_null()).cloned();

        let mut sources: Vec<(bool, Value)> = Vec::new();
        for key in ["id", "item"] {
            sources.extend(param(key).map(|v| (false, v)));
            sources.extend(field(key).map(|v| (false, v)));
        }
        sources.extend(field("items").map(|v| (true, v)));

        match sources.as_slice() {
            [(false, value)] => Self(parse_id(value).into_iter().collect()),
            [(true, Value::Array(values))] => values
                .iter()
                .map(parse_id)
                .collect::<Option<Vec<Uuid>>>()
                .map(Self)
                .unwrap_or_default(),
            _ => Self::default(),
        }
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_id(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

/// What a checker gets to look at.
pub struct CheckContext<S> {
    pub ability: Arc<Ability>,
    /// Handle used to reach repositories.
    pub state: S,
    pub items: Arc<RequestItems>,
}

type CheckFn<S> = dyn Fn(CheckContext<S>) -> BoxFuture<'static, AppResult<bool>> + Send + Sync;

/// One async permission predicate. Several on a route are ANDed.
pub struct PermissionChecker<S> {
    label: String,
    run: Arc<CheckFn<S>>,
}

impl<S> Clone for PermissionChecker<S> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            run: Arc::clone(&self.run),
        }
    }
}

impl<S> fmt::Debug for PermissionChecker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PermissionChecker").field(&self.label).finish()
    }
}

impl<S: Send + 'static> PermissionChecker<S> {
    /// Wrap an arbitrary async predicate.
    pub fn new<F, Fut>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(CheckContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<bool>> + Send + 'static,
    {
        Self {
            label: label.into(),
            run: Arc::new(move |ctx| check(ctx).boxed()),
        }
    }

    /// Static check: does the ability allow `action` on the subject type?
    pub fn can(action: PermissionAction, subject: &'static str) -> Self {
        let label = format!("can({action}, {subject})");
        Self::new(label, move |ctx: CheckContext<S>| {
            let allowed = ctx.ability.can(&action, subject);
            async move { Ok(allowed) }
        })
    }

    /// Ownership check: fetch the target records and require the ability
    /// to allow `action` on every one of them.
    pub fn owner<T, F, Fut>(action: PermissionAction, fetch: F) -> Self
    where
        T: Subject + Send + 'static,
        F: Fn(S, Vec<Uuid>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Vec<T>>> + Send + 'static,
    {
        let label = format!("owner({action}, {})", T::NAME);
        let action = Arc::new(action);
        let fetch = Arc::new(fetch);
        Self::new(label, move |ctx: CheckContext<S>| {
            let action = Arc::clone(&action);
            let fetch = Arc::clone(&fetch);
            async move {
                if ctx.items.is_empty() {
                    return Ok(false);
                }
                let records = fetch(ctx.state, ctx.items.ids().to_vec()).await?;
                Ok(check_owner(&ctx.ability, &action, &records))
            }
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn check(&self, ctx: CheckContext<S>) -> AppResult<bool> {
        (self.run)(ctx).await
    }
}

/// True when `records` is non-empty and the ability allows `action` on
/// each record. An empty batch never passes.
pub fn check_owner<T: Subject>(ability: &Ability, action: &PermissionAction, records: &[T]) -> bool {
    !records.is_empty() && records.iter().all(|record| ability.can_on(action, record))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_single_sources() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let items = RequestItems::extract([("id", a.to_string().as_str())], None);
        assert_eq!(items.ids(), &[a]);

        let items = RequestItems::extract([], Some(&json!({ "id": b.to_string(), "title": "x" })));
        assert_eq!(items.ids(), &[b]);

        let items = RequestItems::extract([("item", a.to_string().as_str())], Some(&json!({})));
        assert_eq!(items.ids(), &[a]);

        let items = RequestItems::extract([], Some(&json!({ "item": b.to_string() })));
        assert_eq!(items.ids(), &[b]);
    }

    #[test]
    fn test_ambiguous_targets_yield_nothing() {
        let mine = Uuid::new_v4().to_string();
        let theirs = Uuid::new_v4().to_string();

        let body = json!({ "id": mine, "items": [theirs] });
        assert!(RequestItems::extract([], Some(&body)).is_empty());

        let body = json!({ "items": [theirs] });
        assert!(RequestItems::extract([("id", mine.as_str())], Some(&body)).is_empty());

        let body = json!({ "id": theirs });
        assert!(RequestItems::extract([("id", mine.as_str())], Some(&body)).is_empty());

        let body = json!({ "item": mine, "items": [theirs] });
        assert!(RequestItems::extract([], Some(&body)).is_empty());
    }

    #[test]
    fn test_extract_items_array() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let body = json!({ "items": [ids[0].to_string(), ids[1].to_string()] });
        assert_eq!(RequestItems::extract([], Some(&body)).ids(), &ids);
    }

    #[test]
    fn test_malformed_ids_yield_no_targets() {
        let body = json!({ "items": [Uuid::new_v4().to_string(), "nope"] });
        assert!(RequestItems::extract([], Some(&body)).is_empty());
        assert!(RequestItems::extract([("id", "42")], None).is_empty());
        assert!(RequestItems::extract([], Some(&json!({ "id": 7 }))).is_empty());
        assert!(RequestItems::extract([], Some(&json!({ "items": "x" }))).is_empty());
        assert!(RequestItems::extract([], None).is_empty());
    }

    #[test]
    fn test_null_body_id_falls_through() {
        let id = Uuid::new_v4();
        let body = json!({ "id": null, "items": [id.to_string()] });
        assert_eq!(RequestItems::extract([], Some(&body)).ids(), &[id]);
    }

    #[derive(serde::Serialize)]
    struct Draft {
        owner: Uuid,
    }

    impl Subject for Draft {
        const NAME: &'static str = "Draft";
    }

    fn owner_ability(me: Uuid) -> Ability {
        use super::super::actor::{Actor, GrantedPermission};
        use super::super::condition::Conditions;
        use super::super::registry::{PermissionDefinition, RbacRegistry, Rule};

        let mut registry = RbacRegistry::new();
        let definition = PermissionDefinition::new(
            "draft.owner",
            Rule::new(PermissionAction::Owner, "Draft")
                .with_conditions(Conditions::owned_via("owner").unwrap()),
        );
        let rule = definition.rule.stored();
        registry.add_permissions([definition]);
        let actor = Actor {
            id: me,
            username: "writer".into(),
            roles: Vec::new(),
            permissions: vec![GrantedPermission {
                name: "draft.owner".into(),
                rule,
            }],
        };
        Ability::compile(&registry, Some(Arc::new(actor)))
    }

    #[test]
    fn test_owner_batch_requires_every_record() {
        let me = Uuid::new_v4();
        let ability = owner_ability(me);
        let mine = Draft { owner: me };
        let theirs = Draft { owner: Uuid::new_v4() };

        assert!(check_owner(&ability, &PermissionAction::Owner, &[Draft { owner: me }]));
        assert!(!check_owner(&ability, &PermissionAction::Owner, &[mine, theirs]));
        assert!(!check_owner::<Draft>(&ability, &PermissionAction::Owner, &[]));
    }

    #[tokio::test]
    async fn test_owner_checker_rejects_mixed_batch() {
        let me = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let ability = Arc::new(owner_ability(me));
        let checker = PermissionChecker::<()>::owner(PermissionAction::Owner, move |_, ids: Vec<Uuid>| async move {
            Ok(ids
                .iter()
                .enumerate()
                .map(|(i, _)| Draft { owner: if i == 0 { me } else { stranger } })
                .collect::<Vec<_>>())
        });
        let context = |ids: Vec<Uuid>| CheckContext {
            ability: Arc::clone(&ability),
            state: (),
            items: Arc::new(RequestItems::new(ids)),
        };

        assert!(checker.check(context(vec![Uuid::new_v4()])).await.unwrap());
        assert!(!checker.check(context(vec![Uuid::new_v4(), Uuid::new_v4()])).await.unwrap());
        assert!(!checker.check(context(Vec::new())).await.unwrap());
    }
}
