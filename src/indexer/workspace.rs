//! File enumeration and reading for one workspace.
use std::path::{
    Path,
    PathBuf,
};

use futures::stream::{
    self,
    StreamExt,
};
use globset::GlobSet;
use ignore::WalkBuilder;

use crate::config::matcher::{
    CompiledRule,
    MatcherError,
    build_glob_set,
    path_string,
};
use crate::indexer::types::IndexerError;

/// A workspace root together with the globs that are never enumerated.
#[derive(Clone, Debug)]
pub struct WorkspaceFiles {
    /// Directory walked for JSON and source files.
    root: PathBuf,
    /// Compiled `excludePatterns`, matched against root-relative paths.
    exclude_set: GlobSet,
}

impl WorkspaceFiles {
    /// # Errors
    /// An exclude pattern is not a valid glob.
    pub fn new(root: impl Into<PathBuf>, exclude_patterns: &[String]) -> Result<Self, MatcherError> {
        Ok(Self { root: root.into(), exclude_set: build_glob_set(exclude_patterns)? })
    }

    /// `path` relative to the root, `/`-separated. `None` outside the workspace.
    #[must_use]
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root).ok().map(path_string)
    }

    /// Collects files below the root whose relative path satisfies `predicate`.
    ///
    /// `.gitignore` is honoured and excluded paths are skipped. The result is sorted.
    pub fn walk(&self, mut predicate: impl FnMut(&str) -> bool) -> Vec<PathBuf> {
        let mut found_files = Vec::new();

        // ignore クレートでファイルを走査
        for result in WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            // ファイルのみを対象
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(relative_path) = self.relative_path(path) else {
                continue;
            };
            if self.exclude_set.is_match(&relative_path) || !predicate(&relative_path) {
                continue;
            }

            found_files.push(path.to_path_buf());
        }

        found_files.sort();
        found_files
    }

    /// JSON files named by any `jsonFiles` entry of `rules`.
    #[must_use]
    pub fn find_json_files(&self, rules: &[&CompiledRule]) -> Vec<PathBuf> {
        let files = self.walk(|relative_path| {
            rules
                .iter()
                .flat_map(|rule| rule.json_files())
                .any(|spec| spec.matches_relative(relative_path))
        });
        tracing::debug!(count = files.len(), "Found JSON files");
        files
    }

    /// Source files scanned by any of `rules`.
    #[must_use]
    pub fn find_source_files(&self, rules: &[&CompiledRule]) -> Vec<PathBuf> {
        let files = self.walk(|relative_path| rules.iter().any(|rule| rule.scans(relative_path)));
        tracing::debug!(count = files.len(), "Found source files");
        files
    }

    /// Reads a file as UTF-8 text.
    ///
    /// # Errors
    /// The file is missing, unreadable or not UTF-8.
    pub async fn read_text(path: &Path) -> Result<String, IndexerError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| IndexerError::Read { path: path.to_path_buf(), source })
    }

    /// Reads files concurrently. Files that fail to read are logged and left out.
    ///
    /// The result keeps the order of `paths`.
    pub async fn read_many(paths: Vec<PathBuf>) -> Vec<(PathBuf, String)> {
        let concurrency = num_cpus::get().max(1);

        let mut results: Vec<(usize, PathBuf, String)> = stream::iter(paths.into_iter().enumerate())
            .map(|(position, path)| async move {
                match Self::read_text(&path).await {
                    Ok(text) => Some((position, path, text)),
                    Err(error) => {
                        // ファイル読み込みエラーは警告として扱い、処理を続行
                        tracing::warn!(%error, "Skipping file");
                        None
                    }
                }
            })
            .buffer_unordered(concurrency)
            .filter_map(|result| async move { result })
            .collect()
            .await;

        results.sort_by_key(|(position, _, _)| *position);
        results.into_iter().map(|(_, path, text)| (path, text)).collect()
    }
}
