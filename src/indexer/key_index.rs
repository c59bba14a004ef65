//! Flattened keys of every JSON resource file that a set of rules names.

use std::path::{
    Path,
    PathBuf,
};

use crate::config::CompiledRule;
use crate::indexer::workspace::WorkspaceFiles;
use crate::input::key_set::{
    KeySet,
    flatten_keys,
};

/// One parsed JSON resource file.
#[derive(Debug, Clone)]
pub struct IndexedJson {
    /// Where the file was read from.
    path: PathBuf,
    /// Text as read.
    text: String,
    /// Flattened keys.
    keys: KeySet,
}

impl IndexedJson {
    /// Parses and flattens `text`. `None` when it is not valid JSON.
    #[must_use]
    pub fn parse(path: PathBuf, text: String) -> Option<Self> {
        match serde_json::from_str(&text) {
            Ok(value) => {
                let keys = flatten_keys(&value);
                Some(Self { path, text, keys })
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "Skipping invalid JSON file");
                None
            }
        }
    }

    /// Where the file was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Text as read, used to locate keys.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flattened keys of the file.
    #[must_use]
    pub const fn keys(&self) -> &KeySet {
        &self.keys
    }
}

/// Keys of several JSON files, answering "does it exist" and "where is it defined".
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    /// Files that parsed, in enumeration order.
    files: Vec<IndexedJson>,
    /// Union of the key sets of `files`.
    available: KeySet,
}

impl KeyIndex {
    /// Indexes already-read documents. Documents that fail to parse contribute nothing.
    #[must_use]
    pub fn from_documents(documents: impl IntoIterator<Item = (PathBuf, String)>) -> Self {
        let mut files: Vec<_> = documents
            .into_iter()
            .filter_map(|(path, text)| IndexedJson::parse(path, text))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);

        let mut available = KeySet::default();
        for file in &files {
            available.merge(&file.keys);
        }

        Self { files, available }
    }

    /// Enumerates the JSON files named by `rules`, reads them concurrently and indexes them.
    pub async fn build(workspace: &WorkspaceFiles, rules: &[&CompiledRule]) -> Self {
        let paths = workspace.find_json_files(rules);
        let documents = WorkspaceFiles::read_many(paths).await;
        let index = Self::from_documents(documents);
        tracing::debug!(
            files = index.files.len(),
            keys = index.available.len(),
            "Built key index"
        );
        index
    }

    /// True if any indexed file defines `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.available.contains(key)
    }

    /// Files defining `key`, in path order.
    pub fn definers<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a IndexedJson> {
        self.files.iter().filter(move |file| file.keys.contains(key))
    }

    /// Union of all indexed keys.
    #[must_use]
    pub const fn available_keys(&self) -> &KeySet {
        &self.available
    }

    /// Indexed files.
    #[must_use]
    pub fn files(&self) -> &[IndexedJson] {
        &self.files
    }

    /// True when no JSON file was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
