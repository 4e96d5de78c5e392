//! Inspectable record of every registered endpoint.

use serde::Serialize;

/// One registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    /// Controller the endpoint belongs to.
    pub controller: String,
    pub action: String,
    pub method: String,
    /// Full path once mounted; relative to the controller before that.
    pub path: String,
    pub summary: Option<String>,
    pub guest: bool,
    pub checkers: Vec<String>,
    pub group: Option<String>,
    pub dto: Option<&'static str>,
}

/// All endpoints, in registration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one controller action.
    pub fn find<'a>(
        &'a self,
        controller: &'a str,
        action: &'a str,
    ) -> impl Iterator<Item = &'a RouteEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.controller == controller && e.action == action)
    }

    /// The entry answering `method` on `path`, if any.
    pub fn lookup(&self, method: &str, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|e| e.method == method && e.path == path)
    }
}
