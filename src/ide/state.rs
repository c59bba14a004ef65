//! LSP サーバーの共有状態

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

use tokio::sync::Mutex;
use tower_lsp::lsp_types::Url;

/// LSP サーバーの共有状態
///
/// 開いているドキュメントの内容と、ドキュメントごとのチェック番号を保持する。
/// ディスクには何も保存しない。
///
/// チェック番号はサーバー全体で単調増加し、close や shutdown でもリセットされない。
/// 閉じて開き直したドキュメントでも、古いチェックの番号が最新と一致することはない。
///
/// # ロック順序
///
/// 複数のロックを同時に取得する場合は `documents` → `check_sequences` の順。
#[derive(Clone, Default)]
pub struct ServerState {
    /// 開いているドキュメント（URI → 最新のテキスト）
    pub documents: Arc<Mutex<HashMap<Url, String>>>,
    /// ドキュメントごとに最後に開始したチェックの番号
    pub check_sequences: Arc<Mutex<HashMap<Url, u64>>>,
    /// 次に割り当てるチェック番号の元になるカウンター
    next_sequence: Arc<AtomicU64>,
}

impl ServerState {
    /// 新しい `ServerState` を作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ドキュメントを開く、または内容を置き換える
    pub async fn upsert_document(&self, uri: Url, text: String) {
        self.documents.lock().await.insert(uri, text);
    }

    /// ドキュメントを閉じる。進行中のチェックの結果は破棄される
    pub async fn close_document(&self, uri: &Url) {
        self.documents.lock().await.remove(uri);
        self.check_sequences.lock().await.remove(uri);
    }

    /// 開いているドキュメントのテキスト
    pub async fn document_text(&self, uri: &Url) -> Option<String> {
        self.documents.lock().await.get(uri).cloned()
    }

    /// 開いているドキュメントの URI 一覧
    pub async fn open_documents(&self) -> Vec<Url> {
        self.documents.lock().await.keys().cloned().collect()
    }

    /// 新しいチェックを開始し、チェック対象のテキストとその番号を返す
    ///
    /// テキストの取得と番号の割り当ては `documents` のロックを保持したまま行う。
    /// 返るテキストより新しい編集のチェックは、必ずより大きい番号を受け取る。
    /// ドキュメントが開かれていない場合は `None`。
    pub async fn begin_check(&self, uri: &Url) -> Option<(String, u64)> {
        let documents = self.documents.lock().await;
        let text = documents.get(uri)?.clone();
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.check_sequences.lock().await.insert(uri.clone(), sequence);
        drop(documents);
        Some((text, sequence))
    }

    /// `sequence` がこのドキュメントで最後に開始したチェックか
    pub async fn is_latest(&self, uri: &Url, sequence: u64) -> bool {
        self.check_sequences.lock().await.get(uri) == Some(&sequence)
    }

    /// 全状態を破棄する（shutdown 用）
    pub async fn clear(&self) {
        self.documents.lock().await.clear();
        self.check_sequences.lock().await.clear();
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("documents", &"<HashMap<Url, String>>")
            .field("check_sequences", &"<HashMap<Url, u64>>")
            .field("next_sequence", &self.next_sequence.load(Ordering::Relaxed))
            .finish()
    }
}
