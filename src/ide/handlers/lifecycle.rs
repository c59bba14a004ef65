//! LSP lifecycle handlers: `initialize`, `initialized`, `shutdown`.

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionOptions,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    MessageType,
    OneOf,
    ServerCapabilities,
    ServerInfo,
    TextDocumentSyncCapability,
    TextDocumentSyncKind,
    WorkDoneProgressOptions,
};

use super::super::backend::Backend;
use super::super::completion::TRIGGER_CHARACTERS;
use crate::config::CheckerSettings;

/// `initialize` リクエストを処理
///
/// ワークスペースの設定ファイルを読み、`initializationOptions` があればそれで置き換える。
pub async fn handle_initialize(
    backend: &Backend,
    params: InitializeParams,
) -> Result<InitializeResult> {
    #[allow(deprecated)]
    let workspace_root = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())
        .and_then(Backend::uri_to_path);

    let mut config_manager = backend.config_manager.lock().await;
    let loaded = config_manager.load_settings(workspace_root);
    let overridden = match params.initialization_options {
        Some(options) => match CheckerSettings::from_value(options) {
            Ok(settings) => Some(config_manager.update_settings(settings)),
            Err(error) => Some(Err(error)),
        },
        None => None,
    };
    drop(config_manager);

    backend.report_settings(loaded).await;
    if let Some(result) = overridden {
        backend.report_settings(result).await;
    }

    Ok(InitializeResult {
        server_info: Some(ServerInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            completion_provider: Some(CompletionOptions {
                resolve_provider: Some(false),
                trigger_characters: Some(
                    TRIGGER_CHARACTERS.iter().map(ToString::to_string).collect(),
                ),
                work_done_progress_options: WorkDoneProgressOptions::default(),
                all_commit_characters: None,
                completion_item: None,
            }),
            definition_provider: Some(OneOf::Left(true)),
            references_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        },
    })
}

/// `initialized` 通知を処理
pub async fn handle_initialized(backend: &Backend, _: InitializedParams) {
    backend.client.log_message(MessageType::INFO, "json-key-checker initialized").await;

    // initialize でルートが渡されなかった場合はクライアントに問い合わせる
    let has_root = backend.config_manager.lock().await.workspace_root().is_some();
    if !has_root {
        if let Ok(folders) = backend.get_workspace_folders().await {
            let root = folders.first().and_then(|folder| Backend::uri_to_path(&folder.uri));
            if root.is_some() {
                let result = backend.config_manager.lock().await.load_settings(root);
                backend.report_settings(result).await;
            }
        }
    }

    let rule_count = backend.config_manager.lock().await.rules().rules().len();
    tracing::info!(rules = rule_count, "Server initialized");

    backend.register_file_watchers().await;
}

/// `shutdown` リクエストを処理
pub async fn handle_shutdown(backend: &Backend) -> Result<()> {
    backend.state.clear().await;
    tracing::info!("Server shut down");
    Ok(())
}
