//! OpenAPI documents built from the route table.

use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityRequirement, SecurityScheme};
use utoipa::openapi::{
    ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, Paths, Required, ResponseBuilder,
};

use inkwell_core::config::ApiConfig;

use crate::crud::RouteEntry;

/// Security scheme name used by every guarded operation.
pub const BEARER_SCHEME: &str = "bearer";

/// Title and description of a separately documented route group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocOption {
    pub title: String,
    pub description: Option<String>,
}

impl DocOption {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Build the document for one version or one group of a version.
pub fn build_document(
    config: &ApiConfig,
    version: &str,
    doc: Option<&DocOption>,
    entries: &[RouteEntry],
) -> OpenApi {
    let title = doc.map_or_else(|| config.title.clone(), |d| d.title.clone());
    let description = doc
        .and_then(|d| d.description.clone())
        .or_else(|| Some(config.description.clone()).filter(|d| !d.is_empty()));

    let mut paths = Paths::new();
    for entry in entries {
        let Some(method) = http_method(&entry.method) else {
            continue;
        };
        paths.add_path_operation(entry.path.as_str(), vec![method], operation(entry));
    }

    let components = ComponentsBuilder::new()
        .security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        )
        .build();

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(title)
                .version(version)
                .description(description)
                .build(),
        )
        .paths(paths)
        .components(Some(components))
        .build()
}

fn operation(entry: &RouteEntry) -> utoipa::openapi::path::Operation {
    let mut builder = OperationBuilder::new()
        .operation_id(Some(format!("{}_{}", entry.controller, entry.action)))
        .summary(entry.summary.clone())
        .tag(entry.controller.clone())
        .response("200", ResponseBuilder::new().description("Success").build());

    if !entry.checkers.is_empty() {
        builder = builder.description(Some(format!("Requires: {}", entry.checkers.join(", "))));
    }
    for name in path_params(&entry.path) {
        builder = builder.parameter(
            ParameterBuilder::new()
                .name(name)
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .build(),
        );
    }
    if !entry.guest {
        builder = builder
            .security(SecurityRequirement::new(BEARER_SCHEME, Vec::<String>::new()))
            .response("401", ResponseBuilder::new().description("Unauthorized").build());
    }
    if !entry.checkers.is_empty() {
        builder = builder.response("403", ResponseBuilder::new().description("Forbidden").build());
    }
    builder.build()
}

fn http_method(method: &str) -> Option<HttpMethod> {
    match method {
        "GET" => Some(HttpMethod::Get),
        "POST" => Some(HttpMethod::Post),
        "PUT" => Some(HttpMethod::Put),
        "PATCH" => Some(HttpMethod::Patch),
        "DELETE" => Some(HttpMethod::Delete),
        _ => None,
    }
}

fn path_params(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, guest: bool) -> RouteEntry {
        RouteEntry {
            controller: "posts".into(),
            action: "detail".into(),
            method: "GET".into(),
            path: path.into(),
            summary: Some("Post detail".into()),
            guest,
            checkers: vec![],
            group: Some("post-detail".into()),
            dto: None,
        }
    }

    #[test]
    fn test_document_paths_and_security() {
        let config = ApiConfig::default();
        let doc = build_document(
            &config,
            "v1",
            Some(&DocOption::new("App API")),
            &[entry("/api/v1/posts/{id}", true), entry("/api/v1/me", false)],
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["info"]["title"], "App API");
        assert_eq!(json["info"]["version"], "v1");

        let detail = &json["paths"]["/api/v1/posts/{id}"]["get"];
        assert_eq!(detail["parameters"][0]["name"], "id");
        assert!(detail.get("security").is_none());
        assert!(json["paths"]["/api/v1/me"]["get"]["security"].is_array());
    }
}
