//! References implementation

use std::path::{
    Path,
    PathBuf,
};

use tower_lsp::lsp_types::{
    Location,
    Url,
};

use crate::config::{
    CompiledRule,
    RuleSet,
};
use crate::ide::goto_definition::{
    definition_locations,
    key_with_rules,
};
use crate::ide::position::KeyLocator;
use crate::indexer::{
    KeyIndex,
    WorkspaceFiles,
};
use crate::syntax::scanner::{
    QuoteStyle,
    scan_usages,
};
use crate::types::{
    LineIndex,
    SourcePosition,
};

/// Find all references to the key under the cursor
///
/// From a JSON document named by a rule the cursor must be on a property
/// name; from a source document it must be inside a key literal.
///
/// # Returns
/// Method-call ranges of every usage in the scanned source files, followed by
/// the JSON definitions when `include_declaration` is set
pub async fn find_references(
    workspace: &WorkspaceFiles,
    rules: &RuleSet,
    path: &Path,
    text: &str,
    position: SourcePosition,
    include_declaration: bool,
) -> Vec<Location> {
    let Some((key, owners)) = reference_target(rules, path, text, position) else {
        return Vec::new();
    };
    tracing::debug!(key, rules = owners.len(), "Finding references");

    let sources = WorkspaceFiles::read_many(workspace.find_source_files(&owners)).await;
    let mut locations = usage_locations(&owners, &key, with_live_text(sources, path, text));

    if include_declaration {
        let index = KeyIndex::build(workspace, &owners).await;
        locations.extend(definition_locations(&index, &key));
    }

    locations
}

/// Key under the cursor and the rules whose sources may use it.
fn reference_target<'r>(
    rules: &'r RuleSet,
    path: &Path,
    text: &str,
    position: SourcePosition,
) -> Option<(String, Vec<&'r CompiledRule>)> {
    let json_rules = rules.rules_for_json_file(path);
    if json_rules.is_empty() {
        return key_with_rules(rules.match_rules(path, text), text, position);
    }

    let key = KeyLocator::new(text).key_at(position)?.to_string();
    Some((key, json_rules))
}

/// Replaces the on-disk text of the open document with its live text.
fn with_live_text(
    mut sources: Vec<(PathBuf, String)>,
    path: &Path,
    text: &str,
) -> Vec<(PathBuf, String)> {
    if let Some((_, source)) = sources.iter_mut().find(|(source_path, _)| source_path == path) {
        text.clone_into(source);
    }
    sources
}

/// Call ranges of every single- or double-quoted usage of `key` in `sources`.
pub(crate) fn usage_locations(
    rules: &[&CompiledRule],
    key: &str,
    sources: Vec<(PathBuf, String)>,
) -> Vec<Location> {
    let mut locations = Vec::new();

    for (path, source) in sources {
        let usages = scan_usages(
            &source,
            rules.iter().flat_map(|rule| rule.method_patterns()),
            QuoteStyle::SingleOrDouble,
        );
        let mut matching = usages.into_iter().filter(|usage| usage.key == key).peekable();
        if matching.peek().is_none() {
            continue;
        }

        // URI の作成に失敗した場合はスキップ
        let Ok(uri) = Url::from_file_path(&path) else {
            tracing::warn!("Failed to create URI from file path: {}", path.display());
            continue;
        };

        let lines = LineIndex::new(&source);
        locations.extend(
            matching.map(|usage| Location { uri: uri.clone(), range: lines.range(usage.call).into() }),
        );
    }

    locations
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

    const EN_JSON: &str = "{\n  \"hello\": \"Hello\",\n  \"user\": {\n    \"name\": \"Name\"\n  }\n}";

    fn setup(scan_folders: Option<Vec<String>>) -> (TempDir, WorkspaceFiles, RuleSet) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for (relative_path, content) in [
            ("locales/en.json", EN_JSON),
            ("src/a.ts", "t(\"hello\");\nt('user.name');"),
            ("src/b.ts", "const x = t( 'hello' );\nt(`hello`);"),
            ("lib/c.ts", "t(\"hello\")"),
        ] {
            let path = root.join(relative_path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let settings = CheckerSettings {
            patterns: vec![Rule {
                json_files: vec!["locales/en.json".to_string()],
                file_extensions: vec!["ts".to_string()],
                method_patterns: vec!["t".to_string()],
                scan_folders,
            }],
            ..CheckerSettings::default()
        };
        let (rule_set, _) = RuleSet::compile(&settings);
        let workspace = WorkspaceFiles::new(root, &settings.exclude_patterns).unwrap();
        (temp_dir, workspace, rule_set)
    }

    fn file_names(locations: &[Location]) -> Vec<String> {
        locations
            .iter()
            .map(|location| location.uri.path().rsplit('/').next().unwrap().to_string())
            .collect()
    }

    const fn pos(line: u32, character: u32) -> SourcePosition {
        SourcePosition { line, character }
    }

    #[tokio::test]
    async fn references_from_json_key() {
        let (temp_dir, workspace, rules) = setup(None);
        let path = temp_dir.path().join("locales/en.json");

        let locations = find_references(&workspace, &rules, &path, EN_JSON, pos(1, 4), false).await;

        assert_eq!(file_names(&locations), vec!["c.ts", "a.ts", "b.ts"]);
        assert_eq!(locations[2].range, Range::new(Position::new(0, 10), Position::new(0, 22)));
    }

    #[tokio::test]
    async fn references_from_nested_json_key_use_full_path() {
        let (temp_dir, workspace, rules) = setup(None);
        let path = temp_dir.path().join("locales/en.json");

        let locations = find_references(&workspace, &rules, &path, EN_JSON, pos(3, 6), false).await;

        assert_eq!(file_names(&locations), vec!["a.ts"]);
        assert_eq!(locations[0].range, Range::new(Position::new(1, 0), Position::new(1, 14)));
    }

    #[tokio::test]
    async fn references_respect_scan_folders() {
        let (temp_dir, workspace, rules) = setup(Some(vec!["src/".to_string()]));
        let path = temp_dir.path().join("locales/en.json");

        let locations = find_references(&workspace, &rules, &path, EN_JSON, pos(1, 4), false).await;

        assert_eq!(file_names(&locations), vec!["a.ts", "b.ts"]);
    }

    #[tokio::test]
    async fn references_from_source_include_declaration() {
        let (temp_dir, workspace, rules) = setup(None);
        let path = temp_dir.path().join("src/a.ts");
        let live = "t(\"hello\");\nt(\"hello\");";

        let locations = find_references(&workspace, &rules, &path, live, pos(0, 3), true).await;

        assert_eq!(file_names(&locations), vec!["c.ts", "a.ts", "a.ts", "b.ts", "en.json"]);
        assert_eq!(
            locations.last().unwrap().range,
            Range::new(Position::new(1, 2), Position::new(1, 9))
        );
    }

    #[tokio::test]
    async fn references_off_a_key() {
        let (temp_dir, workspace, rules) = setup(None);
        let path = temp_dir.path().join("locales/en.json");

        let locations = find_references(&workspace, &rules, &path, EN_JSON, pos(1, 12), false).await;

        assert_that!(locations, is_empty());
    }
}
