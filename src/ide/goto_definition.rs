//! Go to Definition implementation

use std::path::Path;

use tower_lsp::lsp_types::{
    Location,
    Url,
};

use crate::config::{
    CompiledRule,
    RuleSet,
};
use crate::ide::position::{
    KeyLocator,
    key_under_cursor,
};
use crate::indexer::{
    KeyIndex,
    WorkspaceFiles,
};
use crate::types::SourcePosition;

/// Find JSON key definitions for the key literal under the cursor
///
/// # Arguments
/// * `workspace` - Workspace to enumerate JSON files in
/// * `rules` - Current rule snapshot
/// * `path` - Path of the source document
/// * `text` - Live text of the source document
/// * `position` - Cursor position
///
/// # Returns
/// All locations where the key is defined (one per defining JSON file)
pub async fn find_definitions(
    workspace: &WorkspaceFiles,
    rules: &RuleSet,
    path: &Path,
    text: &str,
    position: SourcePosition,
) -> Vec<Location> {
    let Some((key, owners)) = key_with_rules(rules.match_rules(path, text), text, position) else {
        return Vec::new();
    };
    tracing::debug!(key, rules = owners.len(), "Looking up definitions");

    let index = KeyIndex::build(workspace, &owners).await;
    definition_locations(&index, &key)
}

/// Locations of `key` in every indexed file defining it.
#[must_use]
pub fn definition_locations(index: &KeyIndex, key: &str) -> Vec<Location> {
    let mut locations = Vec::new();

    for file in index.definers(key) {
        let Some(range) = KeyLocator::new(file.text()).locate(key) else {
            continue;
        };
        let Ok(uri) = Url::from_file_path(file.path()) else {
            tracing::warn!("Failed to create URI from file path: {}", file.path().display());
            continue;
        };

        locations.push(Location { uri, range: range.into() });
    }

    locations
}

/// The key under the cursor, with every rule whose method patterns read that same key.
pub(crate) fn key_with_rules<'r>(
    candidates: Vec<&'r CompiledRule>,
    text: &str,
    position: SourcePosition,
) -> Option<(String, Vec<&'r CompiledRule>)> {
    let mut found: Option<(String, Vec<&'r CompiledRule>)> = None;

    for rule in candidates {
        let Some(key) = key_under_cursor(text, position, rule.method_patterns()) else {
            continue;
        };
        if let Some((first, owners)) = &mut found {
            if *first == key {
                owners.push(rule);
            }
        } else {
            found = Some((key, vec![rule]));
        }
    }

    found
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use tempfile::TempDir;
    use tower_lsp::lsp_types::{
        Position,
        Range,
    };

    use super::*;
    use crate::config::{
        CheckerSettings,
        Rule,
    };

    fn setup(rules: Vec<Rule>) -> (TempDir, WorkspaceFiles, RuleSet) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("locales")).unwrap();
        fs::write(root.join("locales/en.json"), "{\n  \"hello\": \"Hello\",\n  \"user\": {\n    \"name\": \"Name\"\n  }\n}").unwrap();
        fs::write(root.join("locales/ja.json"), "{\n  \"hello\": \"こんにちは\"\n}").unwrap();

        let settings = CheckerSettings { patterns: rules, ..CheckerSettings::default() };
        let (rule_set, _) = RuleSet::compile(&settings);
        let workspace = WorkspaceFiles::new(root, &settings.exclude_patterns).unwrap();
        (temp_dir, workspace, rule_set)
    }

    fn rule(methods: &[&str]) -> Rule {
        Rule {
            json_files: vec!["locales/*.json".to_string()],
            file_extensions: vec!["ts".to_string()],
            method_patterns: methods.iter().copied().map(String::from).collect(),
            scan_folders: None,
        }
    }

    const fn pos(line: u32, character: u32) -> SourcePosition {
        SourcePosition { line, character }
    }

    #[tokio::test]
    async fn find_definitions_in_every_defining_file() {
        let (temp_dir, workspace, rules) = setup(vec![rule(&["t"])]);
        let path = temp_dir.path().join("src/app.ts");

        let locations = find_definitions(&workspace, &rules, &path, r#"t("hello")"#, pos(0, 4)).await;

        assert_that!(locations, len(eq(2)));
        assert!(locations[0].uri.path().ends_with("locales/en.json"));
        assert!(locations[1].uri.path().ends_with("locales/ja.json"));
        assert_eq!(locations[0].range, Range::new(Position::new(1, 2), Position::new(1, 9)));
    }

    #[tokio::test]
    async fn find_definitions_of_nested_key() {
        let (temp_dir, workspace, rules) = setup(vec![rule(&["t"])]);
        let path = temp_dir.path().join("src/app.ts");

        let locations = find_definitions(&workspace, &rules, &path, r#"t('user.name')"#, pos(0, 5)).await;

        assert_that!(locations, len(eq(1)));
        assert_eq!(locations[0].range, Range::new(Position::new(3, 4), Position::new(3, 10)));
    }

    #[tokio::test]
    async fn find_definitions_outside_a_literal() {
        let (temp_dir, workspace, rules) = setup(vec![rule(&["t"])]);
        let path = temp_dir.path().join("src/app.ts");

        let locations = find_definitions(&workspace, &rules, &path, r#"t("hello")"#, pos(0, 0)).await;

        assert_that!(locations, is_empty());
    }

    #[tokio::test]
    async fn find_definitions_of_unknown_key() {
        let (temp_dir, workspace, rules) = setup(vec![rule(&["t"])]);
        let path = temp_dir.path().join("src/app.ts");

        let locations = find_definitions(&workspace, &rules, &path, r#"t("nope")"#, pos(0, 4)).await;

        assert_that!(locations, is_empty());
    }

    #[tokio::test]
    async fn find_definitions_with_other_extension() {
        let (temp_dir, workspace, rules) = setup(vec![rule(&["t"])]);
        let path = temp_dir.path().join("src/app.py");

        let locations = find_definitions(&workspace, &rules, &path, r#"t("hello")"#, pos(0, 4)).await;

        assert_that!(locations, is_empty());
    }
}
