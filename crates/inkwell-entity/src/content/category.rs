//! Category entity model and tree helpers.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A node of the post category tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub custom_order: i32,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
}

/// Category as embedded in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// Data required to create a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub custom_order: i32,
}

/// Partial update of a category. `parent_id: Some(None)` moves it to the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub custom_order: Option<i32>,
}

fn sort_siblings(nodes: &mut [Category]) {
    nodes.sort_by(|a, b| a.custom_order.cmp(&b.custom_order).then_with(|| a.name.cmp(&b.name)));
}

fn attach(mut nodes: Vec<Category>, children: &mut HashMap<Uuid, Vec<Category>>) -> Vec<Category> {
    sort_siblings(&mut nodes);
    for node in nodes.iter_mut() {
        if let Some(kids) = children.remove(&node.id) {
            node.children = attach(kids, children);
        }
    }
    nodes
}

/// Nest a flat list. A category whose parent is not in the list becomes
/// a root; siblings are ordered by `custom_order`, then name.
pub fn build_category_tree(flat: Vec<Category>) -> Vec<Category> {
    let ids: HashSet<Uuid> = flat.iter().map(|c| c.id).collect();
    let mut children: HashMap<Uuid, Vec<Category>> = HashMap::new();
    let mut roots = Vec::new();
    for category in flat {
        match category.parent_id.filter(|p| ids.contains(p) && *p != category.id) {
            Some(parent) => children.entry(parent).or_default().push(category),
            None => roots.push(category),
        }
    }

    let mut tree = attach(roots, &mut children);
    // Whatever is left hangs off a parent cycle; surface it at the root.
    if !children.is_empty() {
        tree.extend(children.into_values().flatten());
        sort_siblings(&mut tree);
    }
    tree
}

/// `root` and every category below it.
pub fn descendant_ids(flat: &[Category], root: Uuid) -> Vec<Uuid> {
    let mut by_parent: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for category in flat {
        if let Some(parent) = category.parent_id {
            by_parent.entry(parent).or_default().push(category.id);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut found = vec![root];
    let mut queue = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        for child in by_parent.get(&id).into_iter().flatten() {
            if seen.insert(*child) {
                found.push(*child);
                queue.push_back(*child);
            }
        }
    }
    found
}

/// New parents for the children of `removed` categories: each moves to
/// its closest ancestor that survives, or to the root.
pub fn lift_children(flat: &[Category], removed: &[Uuid]) -> Vec<(Uuid, Option<Uuid>)> {
    let removed: HashSet<Uuid> = removed.iter().copied().collect();
    let parents: HashMap<Uuid, Option<Uuid>> = flat.iter().map(|c| (c.id, c.parent_id)).collect();

    flat.iter()
        .filter(|c| !removed.contains(&c.id))
        .filter_map(|c| {
            let parent = c.parent_id?;
            if !removed.contains(&parent) {
                return None;
            }
            let mut seen = HashSet::new();
            let mut cursor = Some(parent);
            while let Some(id) = cursor.filter(|id| removed.contains(id)) {
                if !seen.insert(id) {
                    cursor = None;
                    break;
                }
                cursor = parents.get(&id).copied().flatten();
            }
            Some((c.id, cursor))
        })
        .collect()
}
