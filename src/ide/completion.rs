//! Completion for key literals opened inside a method call.

use std::path::Path;

use tower_lsp::lsp_types::{
    CompletionItem,
    CompletionItemKind,
    Documentation,
};

use crate::config::RuleSet;
use crate::ide::position::line_at;
use crate::indexer::{
    KeyIndex,
    WorkspaceFiles,
};
use crate::input::key_set::{
    KEY_SEPARATOR,
    KeySet,
};
use crate::types::{
    LineIndex,
    SourcePosition,
};

/// Characters that re-trigger completion inside a key literal.
pub const TRIGGER_CHARACTERS: [&str; 3] = ["\"", "'", "."];

/// Completion items for the key literal being typed at `position`.
///
/// Returns `None` when the cursor is not inside an opened literal of a
/// method call handled by a rule for this file's extension.
pub async fn complete(
    workspace: &WorkspaceFiles,
    rules: &RuleSet,
    path: &Path,
    text: &str,
    position: SourcePosition,
) -> Option<Vec<CompletionItem>> {
    let lines = LineIndex::new(text);
    let (line, cursor) = line_at(&lines, position)?;
    let before_cursor = line.get(..cursor)?;

    let candidates = rules.rules_for_source_file(path);
    let (partial, owners) = candidates.iter().find_map(|rule| {
        rule.method_patterns()
            .iter()
            .find_map(|pattern| pattern.partial_key(before_cursor))
            .map(|partial| (partial, vec![*rule]))
    })?;
    tracing::debug!(partial, "Completing key");

    let index = KeyIndex::build(workspace, &owners).await;
    Some(completion_items(index.available_keys(), partial))
}

/// Items for `partial`: top-level keys, or the direct children of the part
/// before the last separator. Prefixes match case-insensitively.
#[must_use]
pub fn completion_items(keys: &KeySet, partial: &str) -> Vec<CompletionItem> {
    let (parent, prefix) = match partial.rfind(KEY_SEPARATOR) {
        Some(index) => (partial.get(..index), partial.get(index + 1..).unwrap_or_default()),
        None => (None, partial),
    };
    let prefix = prefix.to_lowercase();

    let (names, documentation): (Vec<&str>, String) = match parent {
        Some(parent) => {
            (keys.direct_children(parent).collect(), format!("Child key of {parent}"))
        }
        None => (keys.top_level().collect(), "Top-level key from JSON".to_string()),
    };

    names
        .into_iter()
        .filter(|name| name.to_lowercase().starts_with(&prefix))
        .map(|name| CompletionItem {
            label: name.to_string(),
            kind: Some(CompletionItemKind::PROPERTY),
            detail: Some("JSON Key".to_string()),
            documentation: Some(Documentation::String(documentation.clone())),
            insert_text: Some(name.to_string()),
            ..Default::default()
        })
        .collect()
}
