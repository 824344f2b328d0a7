//! 의존성 검증/설치 — 선택된 인터프리터 아래에서 서버의 핵심
//! 라이브러리가 import 가능한지 확인하고, 안 되면 manifest로부터
//! pip 설치를 1회 시도합니다.
//!
//! 프로브-우선 설계: import 프로브는 전체 의존성 해석을 대신하는
//! 값싼 결정적 검사입니다. 이미 설치된 환경에서는 네트워크를 전혀
//! 건드리지 않습니다.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::error::LauncherError;
use crate::utils::{apply_creation_flags, output_with_timeout};

/// Import expression that must succeed before the server can start.
const IMPORT_PROBE: &str = "import mcp.server.fastmcp; print('MCP OK')";

/// Marker expected on the probe's stdout.
const PROBE_MARKER: &str = "MCP OK";

const IMPORT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 네트워크/다운로드 시간을 감안한 설치 타임아웃
const INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Ensure the server's dependencies are importable under `python`.
///
/// - manifest가 없으면 선언된 것이 없으므로 즉시 성공
/// - import 프로브 성공 → 설치 없이 성공
/// - 프로브 실패 → `pip install -r <manifest>` 1회 시도 후 재검증
///
/// 설치 실패는 치명적입니다. 수동 복구 명령을 담은
/// [`LauncherError::InstallFailed`]를 반환하며 재시도는 없습니다.
pub async fn ensure_dependencies(python: &str, manifest: &Path) -> Result<(), LauncherError> {
    if !manifest.exists() {
        tracing::debug!(
            "No dependency manifest at {}, nothing to verify",
            manifest.display()
        );
        return Ok(());
    }

    tracing::info!("Checking Python dependencies...");
    if import_probe(python).await {
        tracing::info!("Python dependencies are already installed");
        return Ok(());
    }

    tracing::info!("Installing Python dependencies (this may take a few moments)...");
    let remedy = format!("{} -m pip install -r {}", python, manifest.display());

    let mut cmd = Command::new(python);
    cmd.args(["-m", "pip", "install", "-r"]).arg(manifest);
    apply_creation_flags(&mut cmd);

    // pip 출력은 캡처한다 — 런처의 stdout은 자식 프로토콜 채널이므로
    // 상속시킬 수 없음
    match output_with_timeout(&mut cmd, INSTALL_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            // 설치가 끝났어도 실제로 import 가능한지 한 번 더 확인
            if import_probe(python).await {
                tracing::info!("Dependencies installed successfully");
                Ok(())
            } else {
                Err(LauncherError::InstallFailed {
                    manifest: manifest.to_path_buf(),
                    remedy,
                    detail: "install completed but the server library still fails to import"
                        .to_string(),
                })
            }
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(LauncherError::InstallFailed {
                manifest: manifest.to_path_buf(),
                remedy,
                detail: format!("pip exited with {}: {}", output.status, tail(&stderr, 800)),
            })
        }
        Err(e) => Err(LauncherError::InstallFailed {
            manifest: manifest.to_path_buf(),
            remedy,
            detail: e.to_string(),
        }),
    }
}

/// 핵심 라이브러리 import 프로브 — 성공 여부만 반환
async fn import_probe(python: &str) -> bool {
    let mut cmd = Command::new(python);
    cmd.args(["-c", IMPORT_PROBE]);
    apply_creation_flags(&mut cmd);

    match output_with_timeout(&mut cmd, IMPORT_PROBE_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).contains(PROBE_MARKER)
        }
        Ok(output) => {
            tracing::debug!(
                "Import probe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            tracing::debug!("Import probe failed: {}", e);
            false
        }
    }
}

/// 에러 메시지에 넣을 stderr 꼬리 부분 (UTF-8 경계 보정)
fn tail(s: &str, max: usize) -> String {
    let t = s.trim();
    if t.len() <= max {
        return t.to_string();
    }
    let start = t.len() - max;
    let start = (start..t.len())
        .find(|&i| t.is_char_boundary(i))
        .unwrap_or(t.len());
    format!("...{}", &t[start..])
}
