//! Versioned route tree.
//!
//! Each version is a tree of [`RouteOption`]s holding controllers. The
//! tree is flattened at mount time: every endpoint lands under
//! `/{prefix}/{version}/...`, and the default version is mounted a second
//! time under `/{prefix}/...`. Top-level groups with a [`DocOption`] get
//! their own OpenAPI document; everything else in a version shares one.

pub mod docs;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::routing::get;
use serde_json::{Value, json};
use tracing::info;
use utoipa::openapi::OpenApi;

use inkwell_core::config::ApiConfig;
use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;

use crate::crud::{Controller, Endpoint, RouteEntry, RouteTable, join_path};

pub use docs::{DocOption, build_document};

/// One node of the route tree.
pub struct RouteOption<S> {
    /// Unique among its siblings.
    pub name: String,
    pub path: String,
    pub controllers: Vec<Controller<S>>,
    /// Only honored on top-level nodes.
    pub doc: Option<DocOption>,
    pub children: Vec<RouteOption<S>>,
}

impl<S> RouteOption<S> {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            controllers: Vec::new(),
            doc: None,
            children: Vec::new(),
        }
    }

    pub fn controller(mut self, controller: Controller<S>) -> Self {
        self.controllers.push(controller);
        self
    }

    pub fn doc(mut self, doc: DocOption) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn child(mut self, child: RouteOption<S>) -> Self {
        self.children.push(child);
        self
    }
}

/// The route tree of one API version.
pub struct ApiVersion<S> {
    pub version: String,
    pub routes: Vec<RouteOption<S>>,
}

impl<S> ApiVersion<S> {
    pub fn new(version: impl Into<String>, routes: Vec<RouteOption<S>>) -> Self {
        Self {
            version: version.into(),
            routes,
        }
    }
}

/// Result of mounting: the router, what is on it, and the documents.
pub struct MountedApi<S> {
    pub router: Router<S>,
    pub table: RouteTable,
    /// Keyed by `{version}` or `{version}/{group}`.
    pub documents: BTreeMap<String, OpenApi>,
}

struct Flattened<S> {
    group: Option<String>,
    endpoint: Endpoint<S>,
}

/// Mount the enabled versions.
///
/// Fails on duplicate sibling names, on two endpoints answering the same
/// method and path, and when the default version has no tree.
pub fn mount<S>(config: &ApiConfig, versions: Vec<ApiVersion<S>>) -> AppResult<MountedApi<S>>
where
    S: Clone + Send + Sync + 'static,
{
    if !versions.iter().any(|v| v.version == config.default_version) {
        return Err(AppError::configuration(format!(
            "Default API version '{}' has no routes",
            config.default_version
        )));
    }

    let mut router = Router::new();
    let mut table = RouteTable::new();
    let mut documents = BTreeMap::new();
    let mut taken: HashSet<(String, String)> = HashSet::new();
    let mut versions_seen = HashSet::new();

    for api in versions {
        let is_default = api.version == config.default_version;
        if !is_default && !config.enabled_versions.contains(&api.version) {
            info!(version = %api.version, "API version disabled, skipping");
            continue;
        }
        if !versions_seen.insert(api.version.clone()) {
            return Err(AppError::configuration(format!(
                "API version '{}' declared twice",
                api.version
            )));
        }

        let mut docs: Vec<(String, Option<DocOption>)> = Vec::new();
        let mut flattened = Vec::new();
        flatten(api.routes, "/", None, &mut docs, &mut flattened)?;

        let version_prefix = join_path([config.prefix.as_str(), api.version.as_str()]);
        let mut grouped: BTreeMap<Option<String>, Vec<RouteEntry>> = BTreeMap::new();

        for Flattened { group, endpoint } in flattened {
            let Endpoint { mut entry, route } = endpoint;
            let relative = entry.path.clone();

            let mut paths = vec![join_path([version_prefix.as_str(), relative.as_str()])];
            if is_default {
                paths.push(join_path([config.prefix.as_str(), relative.as_str()]));
            }
            for path in &paths {
                if !taken.insert((entry.method.clone(), path.clone())) {
                    return Err(AppError::configuration(format!(
                        "Route {} {path} is registered twice",
                        entry.method
                    )));
                }
                router = router.route(path, route.clone());
            }

            entry.path = paths.swap_remove(0);
            grouped.entry(group).or_default().push(entry.clone());
            table.push(entry);
        }

        for (group, entries) in grouped {
            let doc = group
                .as_ref()
                .and_then(|name| docs.iter().find(|(n, _)| n == name))
                .and_then(|(_, doc)| doc.as_ref());
            let key = match &group {
                Some(name) => format!("{}/{name}", api.version),
                None => api.version.clone(),
            };
            documents.insert(key, build_document(config, &api.version, doc, &entries));
        }
    }

    router = serve_documents(router, config, &documents)?;
    info!(routes = table.len(), documents = documents.len(), "API mounted");

    Ok(MountedApi {
        router,
        table,
        documents,
    })
}

fn flatten<S>(
    routes: Vec<RouteOption<S>>,
    base: &str,
    group: Option<&str>,
    docs: &mut Vec<(String, Option<DocOption>)>,
    out: &mut Vec<Flattened<S>>,
) -> AppResult<()>
where
    S: Clone + Send + Sync + 'static,
{
    let mut names = HashSet::new();
    for route in routes {
        if !names.insert(route.name.clone()) {
            return Err(AppError::configuration(format!(
                "Route name '{}' is used twice under '{base}'",
                route.name
            )));
        }

        let path = join_path([base, route.path.as_str()]);
        let group = match group {
            Some(parent) => Some(parent.to_string()),
            None if route.doc.is_some() => {
                docs.push((route.name.clone(), route.doc.clone()));
                Some(route.name.clone())
            }
            None => None,
        };

        for controller in route.controllers {
            for mut endpoint in controller.into_endpoints() {
                endpoint.entry.path = join_path([path.as_str(), endpoint.entry.path.as_str()]);
                out.push(Flattened {
                    group: group.clone(),
                    endpoint,
                });
            }
        }
        flatten(route.children, &path, group.as_deref(), docs, out)?;
    }
    Ok(())
}

fn serve_documents<S>(
    mut router: Router<S>,
    config: &ApiConfig,
    documents: &BTreeMap<String, OpenApi>,
) -> AppResult<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let mut index = Vec::new();
    let default_prefix = format!("{}/", config.default_version);

    for (key, document) in documents {
        let body = Arc::new(serde_json::to_value(document)?);
        let mut urls = vec![join_path([config.doc_prefix.as_str(), key, "openapi.json"])];
        if key == &config.default_version {
            urls.push(join_path([config.doc_prefix.as_str(), "openapi.json"]));
        } else if let Some(group) = key.strip_prefix(&default_prefix) {
            urls.push(join_path([config.doc_prefix.as_str(), group, "openapi.json"]));
        }

        for url in &urls {
            let body = Arc::clone(&body);
            router = router.route(url, get(move || async move { Json(Value::clone(&body)) }));
        }
        index.push(json!({ "name": key, "url": urls[0] }));
    }

    let index = Arc::new(Value::Array(index));
    router = router.route(
        &join_path([config.doc_prefix.as_str()]),
        get(move || async move { Json(Value::clone(&index)) }),
    );
    Ok(router)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use inkwell_auth::rbac::{PermissionGuard, RbacRegistry};

    use super::*;
    use crate::crud::CrudMethodOption;
    use crate::middleware::guard::GuardContext;

    fn context() -> GuardContext<()> {
        GuardContext::new(Arc::new(PermissionGuard::new(Arc::new(RbacRegistry::new()))), ())
    }

    fn ping(name: &str, path: &str) -> Controller<()> {
        Controller::new(name, path, context()).endpoint(
            "ping",
            Method::GET,
            "/",
            CrudMethodOption::default().guest().summary("Ping"),
            get(|| async { "pong" }),
        )
    }

    fn tree() -> Vec<ApiVersion<()>> {
        vec![ApiVersion::new(
            "v1",
            vec![
                RouteOption::new("app", "/")
                    .controller(ping("posts", "posts"))
                    .doc(DocOption::new("App API")),
                RouteOption::new("manage", "manage")
                    .child(RouteOption::new("roles", "/roles/").controller(ping("roles", "/"))),
            ],
        )]
    }

    async fn status(router: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_default_version_mounted_twice() {
        let mounted = mount(&ApiConfig::default(), tree()).unwrap();
        assert_eq!(mounted.table.len(), 2);
        assert!(mounted.table.lookup("GET", "/api/v1/posts").is_some());
        assert!(mounted.table.lookup("GET", "/api/v1/manage/roles").is_some());

        let router = mounted.router;
        assert_eq!(status(router.clone(), "/api/v1/posts").await, StatusCode::OK);
        assert_eq!(status(router.clone(), "/api/posts").await, StatusCode::OK);
        assert_eq!(status(router, "/api/manage/roles").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_documents_split_by_group() {
        let mounted = mount(&ApiConfig::default(), tree()).unwrap();
        assert!(mounted.documents.contains_key("v1"));
        assert!(mounted.documents.contains_key("v1/app"));

        let router = mounted.router;
        assert_eq!(status(router.clone(), "/docs/v1/app/openapi.json").await, StatusCode::OK);
        assert_eq!(status(router.clone(), "/docs/app/openapi.json").await, StatusCode::OK);
        assert_eq!(status(router.clone(), "/docs/openapi.json").await, StatusCode::OK);

        let request = Request::builder().uri("/docs").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let index: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(index.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_sibling_names_rejected() {
        let versions = vec![ApiVersion::new(
            "v1",
            vec![
                RouteOption::new("app", "a").controller(ping("a", "/")),
                RouteOption::new("app", "b").controller(ping("b", "/")),
            ],
        )];
        assert!(mount(&ApiConfig::default(), versions).is_err());
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let versions = vec![ApiVersion::new(
            "v1",
            vec![
                RouteOption::new("one", "x").controller(ping("a", "/")),
                RouteOption::new("two", "/x/").controller(ping("b", "/")),
            ],
        )];
        let err = mount(&ApiConfig::default(), versions).err().unwrap();
        assert!(err.message.contains("registered twice"));
    }

    #[test]
    fn test_disabled_versions_skipped() {
        let mut versions = tree();
        versions.push(ApiVersion::new(
            "v2",
            vec![RouteOption::new("app", "/").controller(ping("posts", "posts"))],
        ));
        let mounted = mount(&ApiConfig::default(), versions).unwrap();
        assert!(mounted.table.lookup("GET", "/api/v2/posts").is_none());

        let config = ApiConfig {
            enabled_versions: vec!["v2".into()],
            ..ApiConfig::default()
        };
        let mut versions = tree();
        versions.push(ApiVersion::new(
            "v2",
            vec![RouteOption::new("app", "/").controller(ping("posts", "posts"))],
        ));
        let mounted = mount(&config, versions).unwrap();
        assert!(mounted.table.lookup("GET", "/api/v2/posts").is_some());
        assert!(mounted.documents.contains_key("v2"));
    }
}
