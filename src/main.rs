//! Entry point for the Language Server Protocol implementation.

use json_key_checker::Backend;
use tower_lsp::{
    LspService,
    Server,
};
use tracing_subscriber::EnvFilter;

/// ログレベルを指定する環境変数
const LOG_ENV: &str = "JSON_KEY_CHECKER_LOG";

/// stdio で LSP サーバーを起動する
#[tokio::main]
async fn main() {
    // stdout は LSP の通信に使うため、ログは stderr に出す
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());
    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
