//! LSP Backend 実装

use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionParams,
    CompletionResponse,
    DidChangeConfigurationParams,
    DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
    FileSystemWatcher,
    GlobPattern,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    Location,
    MessageType,
    ReferenceParams,
    Registration,
    Url,
    WorkspaceFolder,
};
use tower_lsp::{
    Client,
    LanguageServer,
};

use super::check::{
    CheckOutcome,
    check_document,
};
use super::handlers;
use super::state::ServerState;
use crate::config::{
    CONFIG_FILE_NAME,
    ConfigError,
    ConfigManager,
    MatcherError,
    RuleSet,
};
use crate::indexer::WorkspaceFiles;

/// `workspace/didChangeWatchedFiles` の登録 ID
const WATCHER_REGISTRATION_ID: &str = "json-key-checker-watched-files";

/// LSP Backend
#[derive(Clone)]
pub struct Backend {
    /// LSP クライアント
    pub client: Client,
    /// 設定管理
    pub config_manager: Arc<Mutex<ConfigManager>>,
    /// 開いているドキュメントとチェック番号
    pub state: ServerState,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config_manager", &"<ConfigManager>")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// 新しい `Backend` を作成
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config_manager: Arc::new(Mutex::new(ConfigManager::new())),
            state: ServerState::new(),
        }
    }

    /// ワークスペースフォルダを取得
    ///
    /// フォルダが設定されていない場合は空のVecを返します。
    ///
    /// # Errors
    /// クライアントとの通信に失敗した場合
    pub(crate) async fn get_workspace_folders(&self) -> Result<Vec<WorkspaceFolder>> {
        self.client.workspace_folders().await.map(Option::unwrap_or_default)
    }

    /// URI をファイルパスに変換
    pub(crate) fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().ok()
    }

    /// ワークスペースの設定ファイルかどうか
    pub(crate) fn is_config_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME)
    }

    /// 現在のルールと、ファイル列挙に使うワークスペースのスナップショット
    ///
    /// ワークスペースルートがない場合は `document` の親ディレクトリを使う。
    pub(crate) async fn snapshot(&self, document: &Path) -> Option<(WorkspaceFiles, Arc<RuleSet>)> {
        let config_manager = self.config_manager.lock().await;
        let root = config_manager
            .workspace_root()
            .cloned()
            .or_else(|| document.parent().map(Path::to_path_buf))?;
        let rules = config_manager.rules();

        match WorkspaceFiles::new(root, &config_manager.get_settings().exclude_patterns) {
            Ok(workspace) => Some((workspace, rules)),
            Err(error) => {
                tracing::warn!(%error, "Cannot enumerate workspace");
                None
            }
        }
    }

    /// 設定の読み込み結果をクライアントに報告する
    ///
    /// # Returns
    /// 設定が適用された場合は `true`
    pub(crate) async fn report_settings(
        &self,
        result: std::result::Result<Vec<MatcherError>, ConfigError>,
    ) -> bool {
        match result {
            Ok(skipped) => {
                for error in skipped {
                    self.client
                        .log_message(MessageType::WARNING, format!("Rule skipped: {error}"))
                        .await;
                }
                true
            }
            Err(error) => {
                tracing::error!(%error, "Configuration error");
                self.client
                    .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
                    .await;
                false
            }
        }
    }

    /// ドキュメントをチェックして診断を送信する
    ///
    /// チェック中に同じドキュメントの新しいチェックが始まった場合、結果は破棄される。
    pub(crate) async fn check_and_publish(&self, uri: Url) {
        let Some((text, sequence)) = self.state.begin_check(&uri).await else {
            return;
        };

        let outcome = match Self::uri_to_path(&uri) {
            Some(path) => match self.snapshot(&path).await {
                Some((workspace, rules)) => check_document(&workspace, &rules, &path, &text).await,
                None => CheckOutcome::Clear,
            },
            None => CheckOutcome::Clear,
        };

        self.publish_if_latest(uri, sequence, outcome).await;
    }

    /// `sequence` がドキュメントの最新のチェックなら診断を送信する
    ///
    /// # Returns
    /// 送信した場合は `true`
    pub(crate) async fn publish_if_latest(
        &self,
        uri: Url,
        sequence: u64,
        outcome: CheckOutcome,
    ) -> bool {
        if !self.state.is_latest(&uri, sequence).await {
            tracing::debug!(%uri, sequence, "Dropping stale check result");
            return false;
        }

        let diagnostics = outcome.into_diagnostics();
        tracing::debug!(%uri, count = diagnostics.len(), "Publishing diagnostics");
        self.client.publish_diagnostics(uri, diagnostics, None).await;
        true
    }

    /// 開いている全ドキュメントを再チェック
    pub(crate) async fn check_open_documents(&self) {
        let uris = self.state.open_documents().await;
        tracing::debug!(count = uris.len(), "Re-checking open documents");
        join_all(uris.into_iter().map(|uri| self.check_and_publish(uri))).await;
    }

    /// JSON ファイルと設定ファイルの変更監視を登録
    pub(crate) async fn register_file_watchers(&self) {
        let watchers = ["**/*.json".to_string(), format!("**/{CONFIG_FILE_NAME}")]
            .into_iter()
            .map(|pattern| FileSystemWatcher { glob_pattern: GlobPattern::String(pattern), kind: None })
            .collect();
        let options = DidChangeWatchedFilesRegistrationOptions { watchers };

        let registration = Registration {
            id: WATCHER_REGISTRATION_ID.to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };

        if let Err(error) = self.client.register_capability(vec![registration]).await {
            tracing::warn!(%error, "Failed to register file watchers");
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::lifecycle::handle_initialize(self, params).await
    }

    async fn initialized(&self, params: InitializedParams) {
        handlers::lifecycle::handle_initialized(self, params).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handlers::lifecycle::handle_shutdown(self).await
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handlers::document_sync::handle_did_open(self, params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handlers::document_sync::handle_did_change(self, params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        handlers::document_sync::handle_did_save(self, params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handlers::document_sync::handle_did_close(self, params).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        handlers::features::handle_completion(self, params).await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        handlers::features::handle_goto_definition(self, params).await
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        handlers::features::handle_references(self, params).await
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handlers::workspace::handle_did_change_configuration(self, params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        handlers::workspace::handle_did_change_watched_files(self, params).await;
    }
}
