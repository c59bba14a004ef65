//! Document synchronization handlers.

use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
};

use super::super::backend::Backend;

/// `textDocument/didOpen` を処理
pub async fn handle_did_open(backend: &Backend, params: DidOpenTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(%uri, "Document opened");

    backend.state.upsert_document(uri.clone(), params.text_document.text).await;
    backend.check_and_publish(uri).await;
}

/// `textDocument/didChange` を処理（全文同期なので最後の変更だけを使う）
pub async fn handle_did_change(backend: &Backend, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;

    let Some(change) = params.content_changes.into_iter().next_back() else {
        return;
    };

    backend.state.upsert_document(uri.clone(), change.text).await;
    backend.check_and_publish(uri).await;
}

/// 保存されたファイルが他のドキュメントの結果を変えることがあるため、全て再チェックする
pub async fn handle_did_save(backend: &Backend, params: DidSaveTextDocumentParams) {
    tracing::debug!(uri = %params.text_document.uri, "Document saved");
    backend.check_open_documents().await;
}

/// `textDocument/didClose` を処理し、診断をクリアする
pub async fn handle_did_close(backend: &Backend, params: DidCloseTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(%uri, "Document closed");

    backend.state.close_document(&uri).await;
    backend.client.publish_diagnostics(uri, Vec::new(), None).await;
}
