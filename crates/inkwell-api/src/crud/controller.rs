//! Controllers: a path plus the guarded endpoints registered on it.

use std::sync::Arc;

use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;
use tracing::debug;

use inkwell_auth::rbac::RoutePolicy;
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;

use super::action::CrudAction;
use super::handlers::base_route;
use super::join_path;
use super::options::{CrudMethodOption, CrudOptions, resolve_group};
use super::service::{CrudService, DeleteInput, RestoreInput, dto_name};
use super::table::RouteEntry;
use crate::middleware::guard::{GuardContext, RouteGate, permission_guard};

/// A bound endpoint waiting to be mounted.
pub struct Endpoint<S> {
    pub entry: RouteEntry,
    pub route: MethodRouter<S>,
}

/// A named group of endpoints under one path.
///
/// Every endpoint is wrapped in the permission guard with its own
/// [`RoutePolicy`]. Registering an action name that is already taken
/// leaves the first registration in place.
pub struct Controller<S> {
    name: String,
    path: String,
    context: GuardContext<S>,
    endpoints: Vec<Endpoint<S>>,
}

impl<S> Controller<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, path: impl Into<String>, context: GuardContext<S>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            context,
            endpoints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_registered(&self, action: &str) -> bool {
        self.endpoints.iter().any(|e| e.entry.action == action)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.endpoints.iter().map(|e| &e.entry)
    }

    /// Register a hand-written endpoint. `option.handler`, when set,
    /// replaces `route`.
    pub fn endpoint(
        self,
        action: &str,
        method: Method,
        suffix: &str,
        option: CrudMethodOption<S>,
        route: MethodRouter<S>,
    ) -> Self {
        self.register(action, method, suffix, option, route, None, None)
    }

    /// Bind the standard actions in `options` to `service`.
    ///
    /// Fails when an enabled action is neither implemented by the service
    /// nor given a handler override.
    pub fn crud<C: CrudService>(mut self, service: Arc<C>, options: CrudOptions<S>) -> AppResult<Self> {
        let CrudOptions { id, enabled } = options;
        for item in enabled {
            let action = item.action;
            if self.is_registered(action.as_str()) {
                debug!(controller = %self.name, %action, "Action already registered");
                continue;
            }

            let mut option = item.option;
            let group = resolve_group(&id, action, &option.serialize);
            let (route, dto) = match option.handler.take() {
                Some(handler) => (handler, None),
                None if C::ACTIONS.contains(&action) => (
                    base_route::<C, S>(action, Arc::clone(&service), group.clone()),
                    dto_for::<C>(action),
                ),
                None => {
                    return Err(AppError::configuration(format!(
                        "Controller '{}' enables '{action}' but has no handler for it",
                        self.name
                    )));
                }
            };

            self = self.register(
                action.as_str(),
                action.method(),
                action.suffix(),
                option,
                route,
                group,
                dto,
            );
        }
        Ok(self)
    }

    #[allow(clippy::too_many_arguments)]
    fn register(
        mut self,
        action: &str,
        method: Method,
        suffix: &str,
        mut option: CrudMethodOption<S>,
        route: MethodRouter<S>,
        group: Option<String>,
        dto: Option<&'static str>,
    ) -> Self {
        if self.is_registered(action) {
            debug!(controller = %self.name, action, "Action already registered");
            return self;
        }

        let route = option.handler.take().unwrap_or(route);
        let entry = RouteEntry {
            controller: self.name.clone(),
            action: action.to_string(),
            method: method.to_string(),
            path: join_path([self.path.as_str(), suffix]),
            summary: option.summary.take(),
            guest: option.allow_guest,
            checkers: option
                .permissions
                .iter()
                .map(|c| c.label().to_string())
                .collect(),
            group,
            dto,
        };

        let gate = RouteGate {
            context: self.context.clone(),
            policy: Arc::new(RoutePolicy {
                allow_guest: option.allow_guest,
                checkers: option.permissions,
            }),
        };
        let route = route.route_layer(from_fn_with_state(gate, permission_guard::<S>));

        self.endpoints.push(Endpoint { entry, route });
        self
    }

    pub fn into_endpoints(self) -> Vec<Endpoint<S>> {
        self.endpoints
    }
}

fn dto_for<C: CrudService>(action: CrudAction) -> Option<&'static str> {
    match action {
        CrudAction::List => Some(dto_name::<C::ListQuery>()),
        CrudAction::Detail => None,
        CrudAction::Store => Some(dto_name::<C::StoreDto>()),
        CrudAction::Update => Some(dto_name::<C::UpdateDto>()),
        CrudAction::Delete => Some(dto_name::<DeleteInput>()),
        CrudAction::Restore => Some(dto_name::<RestoreInput>()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::routing::patch;
    use axum::{Extension, Router};
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tower_http::limit::RequestBodyLimitLayer;
    use uuid::Uuid;
    use validator::Validate;

    use inkwell_auth::rbac::{Actor, CheckContext, PermissionChecker, PermissionGuard, RbacRegistry};
    use inkwell_core::types::{PageResponse, TrashMode};

    use super::*;
    use crate::crud::{CrudItem, hook_option};
    use crate::extractors::{Caller, ListQuery};
    use crate::middleware::actor::CurrentActor;

    #[derive(Debug, Clone, Serialize)]
    struct Note {
        id: Uuid,
        title: String,
        owner: Uuid,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct NewNote {
        #[validate(length(min = 1))]
        title: String,
    }

    #[derive(Default)]
    struct Notes {
        rows: Mutex<Vec<Note>>,
    }

    #[async_trait]
    impl CrudService for Notes {
        type Item = Note;
        type ListQuery = ListQuery;
        type StoreDto = NewNote;
        type UpdateDto = NewNote;

        const ACTIONS: &'static [CrudAction] = &[
            CrudAction::List,
            CrudAction::Detail,
            CrudAction::Store,
            CrudAction::Delete,
        ];

        async fn list(&self, _caller: &Caller, query: ListQuery) -> AppResult<PageResponse<Note>> {
            let rows = self.rows.lock().unwrap().clone();
            Ok(PageResponse::from_vec(rows, &query.page_request()))
        }

        async fn detail(&self, _caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<Note> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|n| n.id == id)
                .cloned()
                .ok_or_else(|| AppError::not_found("Note not found"))
        }

        async fn store(&self, caller: &Caller, data: NewNote) -> AppResult<Note> {
            let note = Note {
                id: Uuid::new_v4(),
                title: data.title,
                owner: caller.user_id()?,
            };
            self.rows.lock().unwrap().push(note.clone());
            Ok(note)
        }

        async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Note>> {
            let mut rows = self.rows.lock().unwrap();
            let (gone, kept): (Vec<Note>, Vec<Note>) =
                rows.drain(..).partition(|n| input.items.contains(&n.id));
            *rows = kept;
            Ok(gone)
        }

        fn shape(&self, mut item: Value, group: Option<&str>) -> Value {
            if group != Some("note-detail") {
                if let Some(map) = item.as_object_mut() {
                    map.remove("owner");
                }
            }
            item
        }
    }

    fn context() -> GuardContext<()> {
        let guard = PermissionGuard::new(Arc::new(RbacRegistry::new()));
        GuardContext::new(Arc::new(guard), ())
    }

    fn fixed(answer: bool) -> PermissionChecker<()> {
        PermissionChecker::new(format!("fixed({answer})"), move |_| async move { Ok(answer) })
    }

    fn actor() -> Arc<Actor> {
        Arc::new(Actor {
            id: Uuid::new_v4(),
            username: "writer".into(),
            roles: Vec::new(),
            permissions: Vec::new(),
        })
    }

    fn router(controller: Controller<()>, actor: Option<Arc<Actor>>) -> Router {
        let mut router = Router::new();
        for endpoint in controller.into_endpoints() {
            router = router.route(&endpoint.entry.path, endpoint.route);
        }
        router.layer(Extension(CurrentActor(actor)))
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[test]
    fn test_registration_is_idempotent() {
        let service = Arc::new(Notes::default());
        let options = CrudOptions::new("note")
            .action(CrudAction::List, hook_option("List notes", true, vec![]))
            .action(CrudAction::List, hook_option("List notes again", false, vec![fixed(false)]))
            .enable(CrudAction::Detail);
        let controller = Controller::new("notes", "/notes", context())
            .crud(service, options)
            .unwrap()
            .endpoint(
                "detail",
                Method::GET,
                "/{id}",
                CrudMethodOption::default(),
                axum::routing::get(|| async { "shadowed" }),
            );

        let entries: Vec<&RouteEntry> = controller.entries().collect();
        assert_eq!(entries.len(), 2);
        let list = entries.iter().find(|e| e.action == "list").unwrap();
        assert_eq!(list.summary.as_deref(), Some("List notes"));
        assert!(list.guest);
        assert_eq!(list.path, "/notes");
        assert_eq!(list.group.as_deref(), Some("note-list"));
        assert_eq!(list.dto, Some("ListQuery"));
        let detail = entries.iter().find(|e| e.action == "detail").unwrap();
        assert_eq!(detail.path, "/notes/{id}");
        assert_eq!(detail.group.as_deref(), Some("note-detail"));
    }

    #[test]
    fn test_unimplemented_action_fails_registration() {
        let options = CrudOptions::new("note").enable(CrudAction::Restore);
        let err = Controller::new("notes", "/notes", context())
            .crud(Arc::new(Notes::default()), options)
            .err()
            .unwrap();
        assert!(err.is(inkwell_core::error::ErrorKind::Configuration));

        let options = CrudOptions::new("note").enable(CrudItem::new(
            CrudAction::Restore,
            CrudMethodOption::default().handler(patch(|| async { "restored" })),
        ));
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::new(Notes::default()), options)
            .unwrap();
        let entry = controller.entries().next().unwrap();
        assert_eq!(entry.path, "/notes/restore");
        assert_eq!(entry.dto, None);
    }

    #[tokio::test]
    async fn test_guest_needs_allow_guest() {
        let options = CrudOptions::new("note")
            .action(CrudAction::List, hook_option("List", true, vec![]))
            .action(CrudAction::Store, hook_option("Create", false, vec![]));
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::new(Notes::default()), options)
            .unwrap();
        let app = router(controller, None);

        let (status, body) = send(app.clone(), "GET", "/notes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["totalItems"], 0);

        let (status, _) = send(app, "POST", "/notes", Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_checkers_are_anded() {
        let denied = CrudOptions::new("note").action(
            CrudAction::Store,
            hook_option("Create", false, vec![fixed(true), fixed(false)]),
        );
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::new(Notes::default()), denied)
            .unwrap();
        let (status, body) = send(
            router(controller, Some(actor())),
            "POST",
            "/notes",
            Some(json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["statusCode"], 403);
        assert_eq!(body["message"], "Forbidden resource");

        let allowed = CrudOptions::new("note").action(
            CrudAction::Store,
            hook_option("Create", false, vec![fixed(true), fixed(true)]),
        );
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::new(Notes::default()), allowed)
            .unwrap();
        let (status, body) = send(
            router(controller, Some(actor())),
            "POST",
            "/notes",
            Some(json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "x");
    }

    #[tokio::test]
    async fn test_checker_receives_body_items() {
        let target = Uuid::new_v4();
        let sees_target = PermissionChecker::new("sees-target", move |ctx| async move {
            Ok(ctx.items.ids() == [target])
        });
        let options = CrudOptions::new("note")
            .action(CrudAction::Delete, hook_option("Delete", false, vec![sees_target]));
        let service = Arc::new(Notes::default());
        service.rows.lock().unwrap().push(Note {
            id: target,
            title: "gone".into(),
            owner: Uuid::new_v4(),
        });
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::clone(&service), options)
            .unwrap();
        let app = router(controller, Some(actor()));

        let (status, _) = send(app.clone(), "DELETE", "/notes", Some(json!({ "items": [Uuid::new_v4()] }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(app, "DELETE", "/notes", Some(json!({ "items": [target] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], json!(target));
        assert!(service.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_acts_only_on_checked_ids() {
        let writer = actor();
        let me = writer.id;
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let service = Arc::new(Notes::default());
        service.rows.lock().unwrap().extend([
            Note { id: mine, title: "mine".into(), owner: me },
            Note { id: theirs, title: "theirs".into(), owner: Uuid::new_v4() },
        ]);
        let rows = Arc::clone(&service);
        let owns_all = PermissionChecker::new("owns-all", move |ctx: CheckContext<()>| {
            let notes = rows.rows.lock().unwrap();
            let allowed = !ctx.items.is_empty()
                && ctx
                    .items
                    .ids()
                    .iter()
                    .all(|id| notes.iter().any(|n| n.id == *id && n.owner == me));
            async move { Ok(allowed) }
        });
        let options = CrudOptions::new("note")
            .action(CrudAction::Delete, hook_option("Delete", false, vec![owns_all]));
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::clone(&service), options)
            .unwrap();
        let app = router(controller, Some(writer));

        let (status, _) = send(
            app.clone(),
            "DELETE",
            "/notes",
            Some(json!({ "id": mine, "items": [theirs] })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(service.rows.lock().unwrap().len(), 2);

        let (status, _) = send(
            app.clone(),
            "DELETE",
            "/notes",
            Some(json!({ "items": [mine, theirs] })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(service.rows.lock().unwrap().len(), 2);

        let (status, body) = send(app, "DELETE", "/notes", Some(json!({ "items": [mine] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], json!(mine));
        let left = service.rows.lock().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, theirs);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let options = CrudOptions::new("note").action(CrudAction::Store, hook_option("Create", false, vec![]));
        let controller = Controller::new("notes", "/notes", context())
            .crud(Arc::new(Notes::default()), options)
            .unwrap();
        let app = router(controller, Some(actor())).layer(RequestBodyLimitLayer::new(16));

        let (status, body) = send(app, "POST", "/notes", Some(json!({ "title": "x".repeat(64) }))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_serialization_groups() {
        let service = Arc::new(Notes::default());
        let id = Uuid::new_v4();
        service.rows.lock().unwrap().push(Note {
            id,
            title: "hello".into(),
            owner: Uuid::new_v4(),
        });
        let options = CrudOptions::new("note")
            .action(CrudAction::List, hook_option("List", true, vec![]))
            .action(CrudAction::Detail, hook_option("Detail", true, vec![]));
        let controller = Controller::new("notes", "/notes", context())
            .crud(service, options)
            .unwrap();
        let app = router(controller, None);

        let (_, list) = send(app.clone(), "GET", "/notes", None).await;
        assert!(list["items"][0].get("owner").is_none());

        let (status, detail) = send(app, "GET", &format!("/notes/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(detail.get("owner").is_some());
    }
}
