//! One full check of a document against the workspace.

use std::collections::HashSet;
use std::path::Path;

use tower_lsp::lsp_types::Diagnostic;

use crate::config::matcher::is_json_path;
use crate::config::{
    CompiledRule,
    RuleSet,
};
use crate::ide::diagnostics::{
    missing_key_diagnostics,
    unused_key_diagnostics,
};
use crate::indexer::{
    KeyIndex,
    WorkspaceFiles,
};
use crate::input::key_set::flatten_keys;
use crate::syntax::scanner::{
    QuoteStyle,
    scan_usages,
    used_keys,
};

/// What to do with a document's diagnostics after a check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Nothing applies to the document; any previous diagnostics must go.
    Clear,
    /// Replace the document's diagnostics with these.
    Publish(Vec<Diagnostic>),
}

impl CheckOutcome {
    /// Diagnostics to publish; empty for `Clear`.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Clear => Vec::new(),
            Self::Publish(diagnostics) => diagnostics,
        }
    }
}

/// Checks `text`, the live content of the document at `path`.
///
/// JSON documents get unused-key diagnostics, other documents get
/// missing-key diagnostics. Every other file is read from disk.
pub async fn check_document(
    workspace: &WorkspaceFiles,
    rules: &RuleSet,
    path: &Path,
    text: &str,
) -> CheckOutcome {
    if rules.is_empty() {
        return CheckOutcome::Clear;
    }

    let matched = rules.match_rules(path, text);
    if matched.is_empty() {
        tracing::debug!(path = %path.display(), "No rule applies");
        return CheckOutcome::Clear;
    }

    if is_json_path(path) {
        check_json_document(workspace, &matched, path, text).await
    } else {
        check_source_document(workspace, &matched, path, text).await
    }
}

/// Reports keys of the current JSON document that no source file uses.
async fn check_json_document(
    workspace: &WorkspaceFiles,
    rules: &[&CompiledRule],
    path: &Path,
    text: &str,
) -> CheckOutcome {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "Current JSON document does not parse");
            return CheckOutcome::Clear;
        }
    };
    let keys = flatten_keys(&value);

    let sources = WorkspaceFiles::read_many(workspace.find_source_files(rules)).await;
    let used = collect_used_keys(rules, sources.iter().map(|(_, source)| source.as_str()));

    tracing::debug!(
        path = %path.display(),
        keys = keys.len(),
        sources = sources.len(),
        used = used.len(),
        "Checked JSON document"
    );
    CheckOutcome::Publish(unused_key_diagnostics(text, &keys, &used))
}

/// Reports keys used in the current source document that no JSON file defines.
async fn check_source_document(
    workspace: &WorkspaceFiles,
    rules: &[&CompiledRule],
    path: &Path,
    text: &str,
) -> CheckOutcome {
    let relative_path = workspace.relative_path(path);
    let active: Vec<&CompiledRule> = rules
        .iter()
        .copied()
        .filter(|rule| {
            relative_path
                .as_deref()
                .map_or(!rule.has_scan_folders(), |relative| rule.in_scan_folders(relative))
        })
        .collect();
    if active.is_empty() {
        tracing::debug!(path = %path.display(), "Document is outside every scan folder");
        return CheckOutcome::Clear;
    }

    let index = KeyIndex::build(workspace, &active).await;
    let usages = scan_usages(
        text,
        active.iter().flat_map(|rule| rule.method_patterns()),
        QuoteStyle::Any,
    );

    tracing::debug!(
        path = %path.display(),
        json_files = index.files().len(),
        usages = usages.len(),
        "Checked source document"
    );
    CheckOutcome::Publish(missing_key_diagnostics(text, &usages, index.available_keys()))
}

/// Keys used by any method pattern of `rules` in any of `sources`.
pub(crate) fn collect_used_keys<'t>(
    rules: &[&CompiledRule],
    sources: impl IntoIterator<Item = &'t str>,
) -> HashSet<String> {
    sources
        .into_iter()
        .flat_map(|source| {
            let usages = scan_usages(
                source,
                rules.iter().flat_map(|rule| rule.method_patterns()),
                QuoteStyle::Any,
            );
            used_keys(&usages)
        })
        .collect()
}
