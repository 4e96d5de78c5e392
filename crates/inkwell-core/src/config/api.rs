//! Route prefix, version and API document configuration.

use serde::{Deserialize, Serialize};

/// API routing and documentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Path prefix for every API route (`/api`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Path prefix for the generated OpenAPI documents (`/docs`).
    #[serde(default = "default_doc_prefix")]
    pub doc_prefix: String,
    /// Version mounted additionally without a version segment.
    #[serde(default = "default_version")]
    pub default_version: String,
    /// Versions mounted besides the default one.
    #[serde(default)]
    pub enabled_versions: Vec<String>,
    /// Title used in API documents.
    #[serde(default = "default_title")]
    pub title: String,
    /// Description used in API documents.
    #[serde(default)]
    pub description: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            doc_prefix: default_doc_prefix(),
            default_version: default_version(),
            enabled_versions: Vec::new(),
            title: default_title(),
            description: String::new(),
        }
    }
}

fn default_prefix() -> String {
    "api".to_string()
}

fn default_doc_prefix() -> String {
    "docs".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_title() -> String {
    "Inkwell API".to_string()
}
