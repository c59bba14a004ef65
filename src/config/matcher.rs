//! Rule matching for JSON resource files and source files.

use std::collections::HashSet;
use std::path::Path;

use globset::{
    Glob,
    GlobBuilder,
    GlobMatcher,
};
use regex::Regex;

use super::{
    CheckerSettings,
    Rule,
};
use crate::syntax::scanner::MethodPattern;

/// A configured pattern that could not be compiled.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// A `methodPatterns` entry is not a valid regex.
    #[error("Invalid method pattern '{pattern}' in rule #{rule}: {source}")]
    InvalidMethodPattern {
        /// Index of the rule in `patterns`.
        rule: usize,
        /// The pattern as configured.
        pattern: String,
        /// The regex error.
        #[source]
        source: regex::Error,
    },

    /// A wildcard `jsonFiles` entry cannot be read as a glob.
    #[error("Invalid JSON file pattern '{pattern}' in rule #{rule}: {message}")]
    InvalidJsonFilePattern {
        /// Index of the rule in `patterns`.
        rule: usize,
        /// The pattern as configured.
        pattern: String,
        /// Why the glob could not be built.
        message: String,
    },

    /// An `excludePatterns` entry is not a valid glob.
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExcludePattern {
        /// The pattern as configured.
        pattern: String,
        /// The glob error.
        #[source]
        source: globset::Error,
    },
}

/// One `jsonFiles` entry.
#[derive(Debug, Clone)]
pub enum JsonFileSpec {
    /// Contains `*`. Each `*` matches any run of characters anywhere in the path.
    Wildcard {
        /// The pattern as written in `jsonFiles`.
        pattern: String,
        /// The pattern with each `*` turned into `.*`, matched against the whole path.
        regex: Regex,
        /// Same pattern read as a glob relative to the workspace root, for enumeration.
        glob: GlobMatcher,
    },
    /// Matches any path ending with the literal.
    Suffix(String),
}

impl JsonFileSpec {
    /// Compiles one `jsonFiles` entry of rule `rule`.
    fn new(rule: usize, pattern: &str) -> Result<Self, MatcherError> {
        if !pattern.contains('*') {
            return Ok(Self::Suffix(pattern.to_string()));
        }

        let invalid = |message: String| MatcherError::InvalidJsonFilePattern {
            rule,
            pattern: pattern.to_string(),
            message,
        };

        let wildcard = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        let regex = Regex::new(&wildcard).map_err(|e| invalid(e.to_string()))?;
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .map_err(|e| invalid(e.to_string()))?
            .compile_matcher();

        Ok(Self::Wildcard { pattern: pattern.to_string(), regex, glob })
    }

    /// Tests a file path (absolute or relative, `/`-separated) against this entry.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            Self::Wildcard { regex, .. } => regex.is_match(path),
            Self::Suffix(suffix) => path.ends_with(suffix.as_str()),
        }
    }

    /// Tests a workspace-relative path during enumeration.
    ///
    /// Wildcards are read as globs; literals match any file whose relative
    /// path ends with the literal at a path-segment boundary (`**/<literal>`).
    #[must_use]
    pub fn matches_relative(&self, relative_path: &str) -> bool {
        match self {
            Self::Wildcard { glob, .. } => glob.is_match(relative_path),
            Self::Suffix(suffix) => {
                let suffix = suffix.trim_start_matches("./").trim_start_matches('/');
                relative_path
                    .strip_suffix(suffix)
                    .is_some_and(|head| head.is_empty() || head.ends_with('/'))
            }
        }
    }

    /// The entry as configured.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Wildcard { pattern, .. } => pattern,
            Self::Suffix(suffix) => suffix,
        }
    }
}

/// A rule whose patterns all compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Position of the rule in the configured list.
    index: usize,
    /// Compiled `jsonFiles`.
    json_files: Vec<JsonFileSpec>,
    /// Lowercase extensions without the dot.
    file_extensions: HashSet<String>,
    /// Compiled `methodPatterns`.
    method_patterns: Vec<MethodPattern>,
    /// Normalized `scanFolders` prefixes. `None` scans the whole workspace.
    scan_folders: Option<Vec<String>>,
}

impl CompiledRule {
    /// Compiles `rule`, the `index`-th entry of `patterns`.
    ///
    /// # Errors
    /// The first pattern of the rule that does not compile.
    pub fn new(index: usize, rule: &Rule) -> Result<Self, MatcherError> {
        let json_files = rule
            .json_files
            .iter()
            .map(|pattern| JsonFileSpec::new(index, pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let method_patterns = rule
            .method_patterns
            .iter()
            .map(|pattern| {
                MethodPattern::new(pattern).map_err(|source| MatcherError::InvalidMethodPattern {
                    rule: index,
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let file_extensions = rule
            .file_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();

        let scan_folders = rule.scan_folders.as_ref().filter(|folders| !folders.is_empty()).map(
            |folders| folders.iter().map(|folder| normalize_folder(folder)).collect(),
        );

        Ok(Self { index, json_files, file_extensions, method_patterns, scan_folders })
    }

    /// Position of the rule in the configured list.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Compiled `jsonFiles` entries.
    #[must_use]
    pub fn json_files(&self) -> &[JsonFileSpec] {
        &self.json_files
    }

    /// Compiled `methodPatterns` entries.
    #[must_use]
    pub fn method_patterns(&self) -> &[MethodPattern] {
        &self.method_patterns
    }

    /// True if `scanFolders` restricts where sources are scanned.
    #[must_use]
    pub fn has_scan_folders(&self) -> bool {
        self.scan_folders.is_some()
    }

    /// True if one of the `jsonFiles` entries matches `path`.
    #[must_use]
    pub fn matches_json_file(&self, path: &str) -> bool {
        self.json_files.iter().any(|spec| spec.matches_path(path))
    }

    /// True if `extension` (any case, no dot) is one of `fileExtensions`.
    #[must_use]
    pub fn handles_extension(&self, extension: &str) -> bool {
        self.file_extensions.contains(&extension.to_lowercase())
    }

    /// True if any method pattern occurs in `text`.
    #[must_use]
    pub fn mentions_method(&self, text: &str) -> bool {
        self.method_patterns.iter().any(|pattern| pattern.appears_in(text))
    }

    /// True if the workspace-relative path lies under a scan folder, or no
    /// scan folders are configured.
    #[must_use]
    pub fn in_scan_folders(&self, relative_path: &str) -> bool {
        self.scan_folders.as_ref().is_none_or(|folders| {
            folders.iter().any(|folder| relative_path.starts_with(folder.as_str()))
        })
    }

    /// True if the workspace-relative path is a source file this rule scans.
    #[must_use]
    pub fn scans(&self, relative_path: &str) -> bool {
        extension_of(Path::new(relative_path)).is_some_and(|ext| self.handles_extension(&ext))
            && self.in_scan_folders(relative_path)
    }
}

/// The compiled rule configuration. Immutable; rebuilt on every configuration change.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Rules that compiled, in configured order.
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compiles every rule. Rules that fail to compile are left out and
    /// reported in the returned error list.
    #[must_use]
    pub fn compile(settings: &CheckerSettings) -> (Self, Vec<MatcherError>) {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for (index, rule) in settings.patterns.iter().enumerate() {
            match CompiledRule::new(index, rule) {
                Ok(compiled) => {
                    tracing::debug!(
                        rule = compiled.index(),
                        json_files = ?compiled.json_files().iter().map(JsonFileSpec::pattern).collect::<Vec<_>>(),
                        method_patterns = ?compiled.method_patterns().iter().map(MethodPattern::source).collect::<Vec<_>>(),
                        "Compiled rule"
                    );
                    rules.push(compiled);
                }
                Err(error) => {
                    tracing::warn!(%error, "Skipping rule");
                    errors.push(error);
                }
            }
        }

        (Self { rules }, errors)
    }

    /// True when no rule compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every compiled rule.
    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Selects the rules that apply to a document.
    ///
    /// Rules whose `jsonFiles` match the path win. Only when none do, rules
    /// are selected by extension plus an occurrence of one of their method
    /// patterns in `text`. An empty result means nothing applies.
    #[must_use]
    pub fn match_rules(&self, path: &Path, text: &str) -> Vec<&CompiledRule> {
        let json_rules = self.rules_for_json_file(path);
        if !json_rules.is_empty() {
            return json_rules;
        }

        let Some(extension) = extension_of(path) else {
            return Vec::new();
        };

        self.rules
            .iter()
            .filter(|rule| rule.handles_extension(&extension) && rule.mentions_method(text))
            .collect()
    }

    /// Rules whose `jsonFiles` match `path`.
    #[must_use]
    pub fn rules_for_json_file(&self, path: &Path) -> Vec<&CompiledRule> {
        let path = path_string(path);
        self.rules.iter().filter(|rule| rule.matches_json_file(&path)).collect()
    }

    /// Rules that list the extension of `path` in `fileExtensions`.
    #[must_use]
    pub fn rules_for_source_file(&self, path: &Path) -> Vec<&CompiledRule> {
        let Some(extension) = extension_of(path) else {
            return Vec::new();
        };
        self.rules.iter().filter(|rule| rule.handles_extension(&extension)).collect()
    }
}

/// Lowercased extension of `path`, without the dot.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
}

/// True if `path` names a JSON document.
#[must_use]
pub fn is_json_path(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| ext == "json")
}

/// `path` as a `/`-separated string.
#[must_use]
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `/`-separated, without a leading `./` or `/`.
fn normalize_folder(folder: &str) -> String {
    folder.replace('\\', "/").trim_start_matches("./").trim_start_matches('/').to_string()
}

/// Builds a glob set from patterns, used for `excludePatterns`.
pub(crate) fn build_glob_set(patterns: &[String]) -> Result<globset::GlobSet, MatcherError> {
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| MatcherError::InvalidExcludePattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| MatcherError::InvalidExcludePattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::path::Path;

    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn rule(json_files: &[&str], extensions: &[&str], methods: &[&str]) -> Rule {
        Rule {
            json_files: json_files.iter().copied().map(String::from).collect(),
            file_extensions: extensions.iter().copied().map(String::from).collect(),
            method_patterns: methods.iter().copied().map(String::from).collect(),
            scan_folders: None,
        }
    }

    fn rule_set(rules: Vec<Rule>) -> RuleSet {
        let (rule_set, errors) =
            RuleSet::compile(&CheckerSettings { patterns: rules, ..CheckerSettings::default() });
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        rule_set
    }

    fn indices(rules: &[&CompiledRule]) -> Vec<usize> {
        rules.iter().map(|rule| rule.index()).collect()
    }

    #[rstest]
    #[case::suffix("en.json", "/ws/locales/en.json", true)]
    #[case::suffix_with_dir("locales/en.json", "/ws/locales/en.json", true)]
    #[case::suffix_other("en.json", "/ws/locales/ja.json", false)]
    #[case::wildcard("locales/*.json", "/ws/locales/ja.json", true)]
    #[case::wildcard_nested("locales/*.json", "/ws/src/locales/de/app.json", true)]
    #[case::wildcard_miss("locales/*.json", "/ws/i18n/ja.json", false)]
    #[case::wildcard_unanchored("*.json", "/ws/data.jsonx", true)]
    #[case::wildcard_escapes_dot("locales/*.json", "/ws/locales/enxjson", false)]
    fn json_file_spec_matches_path(
        #[case] pattern: &str,
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let spec = JsonFileSpec::new(0, pattern).expect("valid pattern");

        assert_that!(spec.matches_path(path), eq(expected));
    }

    #[rstest]
    #[case::suffix_top("en.json", "en.json", true)]
    #[case::suffix_nested("en.json", "locales/en.json", true)]
    #[case::suffix_partial_segment("en.json", "locales/ten.json", false)]
    #[case::suffix_with_dir("locales/en.json", "app/locales/en.json", true)]
    #[case::glob("locales/*.json", "locales/en.json", true)]
    #[case::glob_single_segment("locales/*.json", "locales/en/app.json", false)]
    #[case::glob_any_depth("**/locales/*.json", "src/locales/en.json", true)]
    fn json_file_spec_matches_relative(
        #[case] pattern: &str,
        #[case] relative_path: &str,
        #[case] expected: bool,
    ) {
        let spec = JsonFileSpec::new(0, pattern).expect("valid pattern");

        assert_that!(spec.matches_relative(relative_path), eq(expected));
    }

    #[rstest]
    fn match_rules_prefers_json_matches() {
        let rules = rule_set(vec![
            rule(&["en.json"], &["ts"], &["t"]),
            rule(&["messages.json"], &["json"], &["t"]),
        ]);

        let matched = rules.match_rules(Path::new("/ws/en.json"), r#"{"t": "t(\"x\")"}"#);

        assert_eq!(indices(&matched), vec![0]);
    }

    #[rstest]
    fn match_rules_falls_back_to_source_matching() {
        let rules = rule_set(vec![
            rule(&["en.json"], &["ts"], &["t"]),
            rule(&["de.json"], &["js"], &["t"]),
            rule(&["fr.json"], &["ts"], &["i18n"]),
        ]);

        let matched = rules.match_rules(Path::new("/ws/src/App.TS"), r#"t("hello")"#);

        assert_eq!(indices(&matched), vec![0]);
    }

    #[rstest]
    fn match_rules_unions_every_matching_rule() {
        let rules =
            rule_set(vec![rule(&["a.json"], &["ts"], &["t"]), rule(&["b.json"], &["ts"], &["tr"])]);

        let matched = rules.match_rules(Path::new("/ws/app.ts"), r#"t("a"); tr("b");"#);

        assert_eq!(indices(&matched), vec![0, 1]);
    }

    #[rstest]
    fn match_rules_requires_method_occurrence() {
        let rules = rule_set(vec![rule(&["en.json"], &["ts"], &["translate"])]);

        let matched = rules.match_rules(Path::new("/ws/app.ts"), "const x = 1;");

        assert_that!(matched, is_empty());
    }

    #[rstest]
    fn match_rules_without_extension() {
        let rules = rule_set(vec![rule(&["en.json"], &["ts"], &["t"])]);

        let matched = rules.match_rules(Path::new("/ws/Makefile"), r#"t("x")"#);

        assert_that!(matched, is_empty());
    }

    #[rstest]
    fn compile_skips_rules_with_invalid_method_pattern() {
        let settings = CheckerSettings {
            patterns: vec![rule(&["a.json"], &["ts"], &["t("]), rule(&["b.json"], &["ts"], &["t"])],
            ..CheckerSettings::default()
        };

        let (rules, errors) = RuleSet::compile(&settings);

        assert_eq!(indices(&rules.rules().iter().collect::<Vec<_>>()), vec![1]);
        assert_that!(errors, len(eq(1)));
        assert!(matches!(errors[0], MatcherError::InvalidMethodPattern { rule: 0, .. }));
    }

    #[rstest]
    fn compile_skips_rules_with_invalid_json_glob() {
        let settings = CheckerSettings {
            patterns: vec![rule(&["locales/[*.json"], &["ts"], &["t"])],
            ..CheckerSettings::default()
        };

        let (rules, errors) = RuleSet::compile(&settings);

        assert!(rules.is_empty());
        assert!(matches!(errors[0], MatcherError::InvalidJsonFilePattern { rule: 0, .. }));
    }

    #[rstest]
    #[case::no_folders(None, "lib/app.ts", true)]
    #[case::inside(Some(vec!["src/"]), "src/app.ts", true)]
    #[case::dot_prefixed(Some(vec!["./src/"]), "src/deep/app.ts", true)]
    #[case::outside(Some(vec!["src/"]), "lib/app.ts", false)]
    #[case::wrong_extension(Some(vec!["src/"]), "src/app.rs", false)]
    fn scans_respects_extensions_and_folders(
        #[case] folders: Option<Vec<&str>>,
        #[case] relative_path: &str,
        #[case] expected: bool,
    ) {
        let mut config = rule(&["en.json"], &["ts"], &["t"]);
        config.scan_folders = folders.map(|f| f.into_iter().map(String::from).collect());
        let compiled = CompiledRule::new(0, &config).expect("valid rule");

        assert_that!(compiled.scans(relative_path), eq(expected));
    }

    #[rstest]
    fn empty_scan_folders_mean_unrestricted() {
        let mut config = rule(&["en.json"], &["ts"], &["t"]);
        config.scan_folders = Some(vec![]);
        let compiled = CompiledRule::new(0, &config).expect("valid rule");

        assert_that!(compiled.has_scan_folders(), eq(false));
        assert_that!(compiled.in_scan_folders("anywhere/app.ts"), eq(true));
    }

    #[rstest]
    fn extensions_are_normalized() {
        let compiled = CompiledRule::new(0, &rule(&[], &[".TS", "js"], &[])).expect("valid rule");

        assert_that!(compiled.handles_extension("ts"), eq(true));
        assert_that!(compiled.handles_extension("JS"), eq(true));
        assert_that!(compiled.handles_extension("tsx"), eq(false));
    }

    #[rstest]
    fn rules_for_source_file_ignores_text() {
        let rules = rule_set(vec![rule(&["en.json"], &["ts"], &["never"])]);

        assert_that!(rules.rules_for_source_file(Path::new("/ws/a.ts")), len(eq(1)));
        assert_that!(rules.rules_for_source_file(Path::new("/ws/a.js")), is_empty());
    }

    #[rstest]
    fn build_glob_set_rejects_invalid_patterns() {
        let result = build_glob_set(&["[invalid".to_string()]);

        assert!(matches!(result, Err(MatcherError::InvalidExcludePattern { .. })));
    }
}
