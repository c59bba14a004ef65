//! LSPサーバーのリクエスト処理に関するテスト

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(missing_docs)]
#![allow(deprecated)]

use std::fs;

use json_key_checker::Backend;
use serde_json::json;
use tempfile::TempDir;
use tower_lsp::lsp_types::{
    CompletionParams,
    CompletionResponse,
    DidChangeWatchedFilesParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    FileChangeType,
    FileEvent,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    InitializeParams,
    OneOf,
    PartialResultParams,
    Position,
    ReferenceContext,
    ReferenceParams,
    TextDocumentIdentifier,
    TextDocumentItem,
    TextDocumentPositionParams,
    TextDocumentSyncCapability,
    TextDocumentSyncKind,
    Url,
    WorkDoneProgressParams,
};
use tower_lsp::{
    LanguageServer,
    LspService,
};

fn create_test_backend() -> Backend {
    let (service, _socket) = LspService::new(Backend::new);
    service.inner().clone()
}

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("locales")).unwrap();
    fs::write(root.join("locales/en.json"), "{\n  \"hello\": \"Hello\",\n  \"help\": \"Help\"\n}")
        .unwrap();
    fs::write(root.join("app.ts"), "t(\"hello\")").unwrap();
    temp_dir
}

fn rules() -> serde_json::Value {
    json!({
        "patterns": [{
            "jsonFiles": ["locales/*.json"],
            "fileExtensions": ["ts"],
            "methodPatterns": ["t"]
        }]
    })
}

async fn initialize(backend: &Backend, root: &TempDir, options: Option<serde_json::Value>) {
    let params = InitializeParams {
        root_uri: Some(Url::from_file_path(root.path()).unwrap()),
        initialization_options: options,
        ..InitializeParams::default()
    };
    backend.initialize(params).await.unwrap();
}

async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "typescript".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

fn position_params(uri: &Url, line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position: Position { line, character },
    }
}

#[tokio::test]
async fn test_initialize_advertises_capabilities() {
    let backend = create_test_backend();

    let result = backend.initialize(InitializeParams::default()).await.unwrap();
    let capabilities = result.capabilities;

    assert_eq!(
        capabilities.text_document_sync,
        Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL))
    );
    assert_eq!(capabilities.definition_provider, Some(OneOf::Left(true)));
    assert_eq!(capabilities.references_provider, Some(OneOf::Left(true)));
    assert_eq!(
        capabilities.completion_provider.unwrap().trigger_characters,
        Some(vec!["\"".to_string(), "'".to_string(), ".".to_string()])
    );
    assert!(capabilities.hover_provider.is_none());
}

#[tokio::test]
async fn test_initialize_reads_workspace_config_file() {
    let root = workspace();
    fs::write(root.path().join(".json-key-checker.json"), rules().to_string()).unwrap();
    let backend = create_test_backend();

    initialize(&backend, &root, None).await;

    let config_manager = backend.config_manager.lock().await;
    assert_eq!(config_manager.rules().rules().len(), 1);
    assert_eq!(config_manager.workspace_root(), Some(&root.path().to_path_buf()));
}

#[tokio::test]
async fn test_initialization_options_override_the_config_file() {
    let root = workspace();
    fs::write(root.path().join(".json-key-checker.json"), json!({"patterns": []}).to_string())
        .unwrap();
    let backend = create_test_backend();

    initialize(&backend, &root, Some(json!({ "jsonKeyChecker": rules() }))).await;

    assert_eq!(backend.config_manager.lock().await.rules().rules().len(), 1);
}

#[tokio::test]
async fn test_config_file_change_keeps_client_settings() {
    let root = workspace();
    let config_path = root.path().join(".json-key-checker.json");
    fs::write(&config_path, json!({"patterns": []}).to_string()).unwrap();
    let backend = create_test_backend();
    initialize(&backend, &root, Some(rules())).await;

    let file_rules = json!({"patterns": [{"jsonFiles": ["a.json"]}, {"jsonFiles": ["b.json"]}]});
    fs::write(&config_path, file_rules.to_string()).unwrap();
    backend
        .did_change_watched_files(DidChangeWatchedFilesParams {
            changes: vec![FileEvent {
                uri: Url::from_file_path(&config_path).unwrap(),
                typ: FileChangeType::CHANGED,
            }],
        })
        .await;

    assert_eq!(backend.config_manager.lock().await.rules().rules().len(), 1);
}

#[tokio::test]
async fn test_completion_uses_open_document_text() {
    let root = workspace();
    let backend = create_test_backend();
    initialize(&backend, &root, Some(rules())).await;
    let uri = Url::from_file_path(root.path().join("app.ts")).unwrap();
    open(&backend, &uri, "t(\"he").await;

    let response = backend
        .completion(CompletionParams {
            text_document_position: position_params(&uri, 0, 5),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        })
        .await
        .unwrap();

    let Some(CompletionResponse::Array(items)) = response else {
        panic!("Expected completion items");
    };
    let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(labels, vec!["hello", "help"]);
}

#[tokio::test]
async fn test_goto_definition_and_references() {
    let root = workspace();
    let backend = create_test_backend();
    initialize(&backend, &root, Some(rules())).await;
    let uri = Url::from_file_path(root.path().join("app.ts")).unwrap();
    open(&backend, &uri, "t(\"hello\")").await;

    let definition = backend
        .goto_definition(GotoDefinitionParams {
            text_document_position_params: position_params(&uri, 0, 4),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap();
    let references = backend
        .references(ReferenceParams {
            text_document_position: position_params(&uri, 0, 4),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: ReferenceContext { include_declaration: false },
        })
        .await
        .unwrap();

    let Some(GotoDefinitionResponse::Array(locations)) = definition else {
        panic!("Expected definition locations");
    };
    assert_eq!(locations.len(), 1);
    assert!(locations[0].uri.path().ends_with("locales/en.json"));
    assert_eq!(references.map(|locations| locations.len()), Some(1));
}

#[tokio::test]
async fn test_requests_without_rules_return_nothing() {
    let root = workspace();
    let backend = create_test_backend();
    initialize(&backend, &root, None).await;
    let uri = Url::from_file_path(root.path().join("app.ts")).unwrap();
    open(&backend, &uri, "t(\"hello\")").await;

    let definition = backend
        .goto_definition(GotoDefinitionParams {
            text_document_position_params: position_params(&uri, 0, 4),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap();

    assert!(definition.is_none());
}

#[tokio::test]
async fn test_close_and_shutdown_forget_documents() {
    let root = workspace();
    let backend = create_test_backend();
    initialize(&backend, &root, Some(rules())).await;
    let app = Url::from_file_path(root.path().join("app.ts")).unwrap();
    let en = Url::from_file_path(root.path().join("locales/en.json")).unwrap();
    open(&backend, &app, "t(\"hello\")").await;
    open(&backend, &en, "{\"hello\": \"Hello\"}").await;

    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: app.clone() },
        })
        .await;

    assert!(backend.state.document_text(&app).await.is_none());
    assert_eq!(backend.state.open_documents().await, vec![en]);

    backend.shutdown().await.unwrap();

    assert!(backend.state.open_documents().await.is_empty());
}
