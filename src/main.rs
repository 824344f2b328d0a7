use mcp_launcher::config::{self, LauncherConfig};
use mcp_launcher::error::LauncherError;
use mcp_launcher::python_env;
use mcp_launcher::supervisor::Supervisor;

#[tokio::main]
async fn main() {
    // stdout은 자식 프로토콜 채널 — 런처 진단은 전부 stderr로
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{}", e.report());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// locate → verify → supervise 시퀀스.
/// 각 단계는 블로킹이며, 복구 불가능한 실패는 전체 런치를 중단합니다.
async fn run() -> Result<i32, LauncherError> {
    tracing::info!("MCP server launcher starting");

    let root = config::resolve_install_root();
    let cfg = LauncherConfig::load(&root);
    tracing::debug!("Install root: {}", root.display());

    // 엔트리 아티팩트가 없으면 아무 프로세스도 띄우기 전에 실패
    let entry = cfg.server_entry_path(&root);
    if !entry.exists() {
        return Err(LauncherError::EntryMissing(entry));
    }

    let python = python_env::find_interpreter(&cfg.python_candidates).await?;
    python_env::deps::ensure_dependencies(&python, &cfg.manifest_path(&root)).await?;

    tracing::info!("Starting MCP server in stdio mode (Ctrl+C to stop)");
    let supervisor = Supervisor::spawn(&python, &entry, &root)?;
    supervisor.run().await
}
