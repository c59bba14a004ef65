//! Workspace-related handlers.

use tower_lsp::lsp_types::{
    DidChangeConfigurationParams,
    DidChangeWatchedFilesParams,
};

use super::super::backend::Backend;
use crate::config::CheckerSettings;
use crate::config::matcher::is_json_path;

/// `workspace/didChangeConfiguration` を処理
pub async fn handle_did_change_configuration(
    backend: &Backend,
    params: DidChangeConfigurationParams,
) {
    tracing::info!(settings = %params.settings, "didChangeConfiguration received");

    let new_settings = match CheckerSettings::from_value(params.settings) {
        Ok(settings) => settings,
        Err(error) => {
            // 設定を含まない通知（pull 型のクライアント）は無視する
            tracing::debug!(%error, "Ignoring configuration payload");
            return;
        }
    };

    let result = backend.config_manager.lock().await.update_settings(new_settings);
    if backend.report_settings(result).await {
        tracing::info!("configuration updated successfully");
        backend.check_open_documents().await;
    }
}

/// `workspace/didChangeWatchedFiles` を処理
pub async fn handle_did_change_watched_files(
    backend: &Backend,
    params: DidChangeWatchedFilesParams,
) {
    let mut config_changed = false;
    let mut json_changed = false;

    for change in params.changes {
        let Some(file_path) = Backend::uri_to_path(&change.uri) else {
            continue;
        };
        tracing::debug!("Watched file changed: {:?}, type: {:?}", file_path, change.typ);

        if Backend::is_config_file(&file_path) {
            config_changed = true;
        } else if is_json_path(&file_path) {
            json_changed = true;
        }
    }

    if config_changed {
        let result = backend.config_manager.lock().await.reload_workspace_settings();
        backend.report_settings(result).await;
    }

    if config_changed || json_changed {
        backend.check_open_documents().await;
    }
}
