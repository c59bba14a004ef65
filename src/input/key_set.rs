//! Flattening of JSON object trees into dotted key paths.

use std::collections::{
    BTreeMap,
    BTreeSet,
};

use serde_json::Value;

/// Joins path segments.
pub const KEY_SEPARATOR: char = '.';

/// Flat key paths of one JSON document, with their parent/child links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    /// Every flat path.
    paths: BTreeSet<String>,
    /// Parent path (empty for the root) to the segment names directly under it.
    children: BTreeMap<String, BTreeSet<String>>,
}

impl KeySet {
    /// True if `key` is a path of the document.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.paths.contains(key)
    }

    /// Number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All paths in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Property names of the root object.
    pub fn top_level(&self) -> impl Iterator<Item = &str> {
        self.direct_children("")
    }

    /// Property names of the object at `parent`. Empty when `parent` is not an object.
    pub fn direct_children(&self, parent: &str) -> impl Iterator<Item = &str> {
        self.children.get(parent).into_iter().flatten().map(String::as_str)
    }

    /// Adds every path of `other`.
    pub fn merge(&mut self, other: &Self) {
        self.paths.extend(other.paths.iter().cloned());
        for (parent, names) in &other.children {
            self.children.entry(parent.clone()).or_default().extend(names.iter().cloned());
        }
    }

    /// Adds `name` under `parent` and returns the joined path.
    fn insert(&mut self, parent: &str, name: &str) -> String {
        let path = join_key(parent, name);
        self.children.entry(parent.to_string()).or_default().insert(name.to_string());
        self.paths.insert(path.clone());
        path
    }
}

/// Flattens a parsed JSON value.
///
/// Objects contribute their own path (except the root) and recurse. Every
/// other value, arrays included, is a leaf. A non-object root yields nothing.
///
/// # Example
/// ```
/// use json_key_checker::input::key_set::flatten_keys;
/// use serde_json::json;
///
/// let keys = flatten_keys(&json!({"a": {"b": {"c": 1}}}));
/// assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["a", "a.b", "a.b.c"]);
/// ```
#[must_use]
pub fn flatten_keys(json: &Value) -> KeySet {
    let mut keys = KeySet::default();
    if let Value::Object(map) = json {
        flatten_object(map, "", &mut keys);
    }
    keys
}

/// Adds the members of `map` under `parent`, recursing into objects.
fn flatten_object(map: &serde_json::Map<String, Value>, parent: &str, keys: &mut KeySet) {
    for (name, value) in map {
        let path = keys.insert(parent, name);
        if let Value::Object(child) = value {
            flatten_object(child, &path, keys);
        }
    }
}

/// Joins a parent path and a segment name. An empty parent is the root.
#[must_use]
pub fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() { name.to_string() } else { format!("{parent}{KEY_SEPARATOR}{name}") }
}

/// Proper ancestor paths of `key`, shortest first (`a.b.c` gives `a`, `a.b`).
pub fn ancestor_paths(key: &str) -> impl Iterator<Item = &str> {
    key.match_indices(KEY_SEPARATOR).filter_map(|(index, _)| key.get(..index))
}

/// Final segment of `key`.
#[must_use]
pub fn leaf_segment(key: &str) -> &str {
    key.rsplit(KEY_SEPARATOR).next().unwrap_or(key)
}
