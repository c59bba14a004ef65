//! 設定の型定義

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// 設定のバリデーションエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "excludePatterns[0]")
    pub field_path: String,
    /// エラーメッセージ
    pub message: String,
}

impl ValidationError {
    /// 新しいバリデーションエラーを作成
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

/// 設定の読み込み・適用時のエラー
#[derive(Error, Debug)]
pub enum ConfigError {
    /// バリデーションエラー
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    /// 設定ファイルの読み込みエラー
    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON パースエラー
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// エラー一覧を番号付きの行に整形する
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Settings as sent by clients that namespace them under the extension name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// The settings under `jsonKeyChecker`.
    pub json_key_checker: CheckerSettings,
}

/// One record linking JSON resource files to the source files that use their keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    /// Literal path suffixes, or patterns where `*` matches anything.
    pub json_files: Vec<String>,
    /// Source extensions, lowercase and without the leading dot.
    pub file_extensions: Vec<String>,
    /// Regex fragments naming the call whose first string argument is a key.
    pub method_patterns: Vec<String>,
    /// Workspace-relative path prefixes that restrict source scanning.
    pub scan_folders: Option<Vec<String>>,
}

/// Server settings: the rules and the globs never enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckerSettings {
    /// Rules in configured order.
    pub patterns: Vec<Rule>,

    /// Globs relative to the workspace root that are never enumerated.
    pub exclude_patterns: Vec<String>,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self { patterns: Vec::new(), exclude_patterns: vec!["**/node_modules/**".to_string()] }
    }
}

impl CheckerSettings {
    /// Parses settings sent either bare or wrapped as `{"jsonKeyChecker": {...}}`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        if value.get("jsonKeyChecker").is_some() {
            return Ok(serde_json::from_value::<ServerSettings>(value)?.json_key_checker);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Rule records are only read, never rejected here; see `RuleSet::compile`.
    ///
    /// # Errors
    /// - Invalid exclude glob pattern
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<_> = self
            .exclude_patterns
            .iter()
            .enumerate()
            .filter_map(|(index, pattern)| {
                globset::Glob::new(pattern).err().map(|e| {
                    ValidationError::new(
                        format!("excludePatterns[{index}]"),
                        format!("Invalid glob pattern '{pattern}': {e}"),
                    )
                })
            })
            .collect();

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
