//! LSP 機能ハンドラー
//!
//! `completion`, `goto_definition`, `references` の処理を担当します。

use std::path::PathBuf;
use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionParams,
    CompletionResponse,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Location,
    ReferenceParams,
    Url,
};

use super::super::backend::Backend;
use super::super::{
    completion,
    goto_definition,
    references,
};
use crate::config::RuleSet;
use crate::indexer::WorkspaceFiles;

/// リクエスト処理に必要なドキュメントとワークスペースのスナップショット
struct RequestContext {
    /// ドキュメントのパス
    path: PathBuf,
    /// ドキュメントのテキスト
    text: String,
    /// ファイル列挙に使うワークスペース
    workspace: WorkspaceFiles,
    /// ルールのスナップショット
    rules: Arc<RuleSet>,
}

impl RequestContext {
    /// 開いているドキュメントのテキストを優先し、なければディスクから読む
    async fn resolve(backend: &Backend, uri: &Url) -> Option<Self> {
        let path = Backend::uri_to_path(uri)?;
        let text = match backend.state.document_text(uri).await {
            Some(text) => text,
            None => WorkspaceFiles::read_text(&path)
                .await
                .map_err(|error| tracing::debug!(%error, "Document not available"))
                .ok()?,
        };
        let (workspace, rules) = backend.snapshot(&path).await?;

        Some(Self { path, text, workspace, rules })
    }
}

/// `textDocument/completion` リクエストを処理
pub async fn handle_completion(
    backend: &Backend,
    params: CompletionParams,
) -> Result<Option<CompletionResponse>> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Completion request");

    let Some(context) = RequestContext::resolve(backend, &uri).await else {
        return Ok(None);
    };

    let items = completion::complete(
        &context.workspace,
        &context.rules,
        &context.path,
        &context.text,
        position.into(),
    )
    .await;

    Ok(items.map(CompletionResponse::Array))
}

/// `textDocument/definition` リクエストを処理
pub async fn handle_goto_definition(
    backend: &Backend,
    params: GotoDefinitionParams,
) -> Result<Option<GotoDefinitionResponse>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Goto definition request");

    let Some(context) = RequestContext::resolve(backend, &uri).await else {
        return Ok(None);
    };

    let locations = goto_definition::find_definitions(
        &context.workspace,
        &context.rules,
        &context.path,
        &context.text,
        position.into(),
    )
    .await;

    if locations.is_empty() {
        return Ok(None);
    }
    Ok(Some(GotoDefinitionResponse::Array(locations)))
}

/// `textDocument/references` リクエストを処理
pub async fn handle_references(
    backend: &Backend,
    params: ReferenceParams,
) -> Result<Option<Vec<Location>>> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;
    let include_declaration = params.context.include_declaration;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "References request");

    let Some(context) = RequestContext::resolve(backend, &uri).await else {
        return Ok(None);
    };

    let locations = references::find_references(
        &context.workspace,
        &context.rules,
        &context.path,
        &context.text,
        position.into(),
        include_declaration,
    )
    .await;

    if locations.is_empty() {
        return Ok(None);
    }
    Ok(Some(locations))
}
