//! Byte ranges of JSON property names, keyed by their flat path.

use std::collections::HashMap;
use std::ops::Range;

use tree_sitter::{
    Node,
    Parser,
};

use super::key_set::join_key;

/// Where each property name of a JSON text sits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonKeyRanges {
    /// Flat path to the byte range of its property name, quotes included.
    ranges: HashMap<String, Range<usize>>,
}

impl JsonKeyRanges {
    /// Parses `json_text` with tree-sitter-json.
    ///
    /// Parsing is error tolerant: pairs that still form a well-shaped subtree
    /// are recorded even if the text as a whole is invalid. Arrays are not
    /// descended into.
    #[must_use]
    pub fn extract(json_text: &str) -> Self {
        let mut ranges = HashMap::new();

        let mut parser = Parser::new();
        let Ok(()) = parser.set_language(&tree_sitter_json::LANGUAGE.into()) else {
            tracing::warn!("Failed to set tree-sitter-json language");
            return Self { ranges };
        };

        let Some(tree) = parser.parse(json_text, None) else {
            tracing::warn!("Failed to parse JSON with tree-sitter");
            return Self { ranges };
        };

        collect_keys(tree.root_node(), json_text.as_bytes(), "", &mut ranges);

        Self { ranges }
    }

    /// Range of the property name for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Range<usize>> {
        self.ranges.get(key).cloned()
    }

    /// Flat path of the property name containing `offset` (quotes inclusive).
    #[must_use]
    pub fn key_at(&self, offset: usize) -> Option<&str> {
        self.ranges
            .iter()
            .find(|(_, range)| range.start <= offset && offset <= range.end)
            .map(|(key, _)| key.as_str())
    }

    /// Number of keys found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True if no key was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// object の各 pair を `prefix` の下のキーとして集める
fn collect_keys(
    node: Node<'_>,
    source: &[u8],
    prefix: &str,
    ranges: &mut HashMap<String, Range<usize>>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            // 最上位の object は document の子
            "object" if node.kind() == "document" => collect_keys(child, source, prefix, ranges),
            "pair" => collect_pair(child, source, prefix, ranges),
            _ => {}
        }
    }
}

/// pair のキー範囲を記録し、値が object なら再帰する
fn collect_pair(
    node: Node<'_>,
    source: &[u8],
    prefix: &str,
    ranges: &mut HashMap<String, Range<usize>>,
) {
    let Some(key_node) = node.child_by_field_name("key") else {
        return;
    };

    let Ok(raw) = key_node.utf8_text(source) else {
        tracing::warn!("Failed to get key text from node");
        return;
    };
    let Some(name) = decode_string(raw) else {
        return;
    };

    let path = join_key(prefix, &name);
    ranges.entry(path.clone()).or_insert_with(|| key_node.byte_range());

    if let Some(value_node) = node.child_by_field_name("value") {
        if value_node.kind() == "object" {
            collect_keys(value_node, source, &path, ranges);
        }
    }
}

/// Decodes a quoted JSON string literal, escapes included.
fn decode_string(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(raw).ok()
}
