//! 診断メッセージ生成モジュール
//!
//! JSON 側の未使用キーと、ソース側の存在しないキーを差分として求める。

use std::collections::HashSet;

use tower_lsp::lsp_types::{
    Diagnostic,
    DiagnosticSeverity,
};

use crate::ide::position::KeyLocator;
use crate::input::key_set::{
    KeySet,
    ancestor_paths,
};
use crate::syntax::scanner::UsageRecord;
use crate::types::{
    LineIndex,
    SourceRange,
};

/// `source` of every diagnostic this server publishes.
pub const DIAGNOSTIC_SOURCE: &str = "json-key-checker";

/// Adds every ancestor path of the used keys: a used `a.b.c` keeps `a` and `a.b` in use.
#[must_use]
pub fn expand_ancestors(used: &HashSet<String>) -> HashSet<String> {
    let mut expanded = used.clone();
    for key in used {
        expanded.extend(ancestor_paths(key).map(str::to_string));
    }
    expanded
}

/// Keys of `keys` absent from the ancestor-expanded `used` set.
#[must_use]
pub fn unused_keys<'k>(keys: &'k KeySet, used: &HashSet<String>) -> Vec<&'k str> {
    let expanded = expand_ancestors(used);
    keys.iter().filter(|key| !expanded.contains(*key)).collect()
}

/// Usages whose key is not in `available`. No ancestor expansion applies.
#[must_use]
pub fn missing_usages<'u>(usages: &'u [UsageRecord], available: &KeySet) -> Vec<&'u UsageRecord> {
    usages.iter().filter(|usage| !available.contains(&usage.key)).collect()
}

/// JSON ドキュメントの未使用キーの診断を生成
///
/// 位置を特定できないキーは報告しない。結果は位置順。
#[must_use]
pub fn unused_key_diagnostics(
    text: &str,
    keys: &KeySet,
    used: &HashSet<String>,
) -> Vec<Diagnostic> {
    let locator = KeyLocator::new(text);

    let mut located: Vec<(SourceRange, &str)> = unused_keys(keys, used)
        .into_iter()
        .filter_map(|key| match locator.locate(key) {
            Some(range) => Some((range, key)),
            None => {
                tracing::debug!(key, "Unused key has no position; skipping");
                None
            }
        })
        .collect();
    located.sort_by_key(|(range, key)| (range.start.line, range.start.character, *key));

    located
        .into_iter()
        .map(|(range, key)| {
            diagnostic(range, DiagnosticSeverity::WARNING, format!("Unused JSON key: \"{key}\""))
        })
        .collect()
}

/// ソースファイルの存在しないキーの診断を生成
///
/// 範囲は使用箇所のキーリテラル（引用符を含む）。結果は出現順。
#[must_use]
pub fn missing_key_diagnostics(
    text: &str,
    usages: &[UsageRecord],
    available: &KeySet,
) -> Vec<Diagnostic> {
    let lines = LineIndex::new(text);

    missing_usages(usages, available)
        .into_iter()
        .map(|usage| {
            diagnostic(
                lines.range(usage.span.clone()),
                DiagnosticSeverity::ERROR,
                format!("Missing JSON key: \"{}\" not found in any JSON file", usage.key),
            )
        })
        .collect()
}

/// `json-key-checker` を source とする診断を作成
fn diagnostic(range: SourceRange, severity: DiagnosticSeverity, message: String) -> Diagnostic {
    Diagnostic {
        range: range.into(),
        severity: Some(severity),
        code: None,
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        related_information: None,
        tags: None,
        data: None,
    }
}
