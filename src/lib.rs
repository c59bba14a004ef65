//! json-key-checker
//!
//! JSON ファイルのキーとソースコード中のメソッド呼び出しを突き合わせる Language Server Protocol (LSP) 実装

pub mod config;
pub mod ide;
pub mod indexer;
pub mod input;
pub mod syntax;
pub mod types;

// Backend を再エクスポート
pub use ide::backend::Backend;
