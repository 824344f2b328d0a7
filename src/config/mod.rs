//! 런처 설정 — 후보 인터프리터 목록과 아티팩트 상대 경로.
//!
//! 설치 루트에 `config/launcher.toml`이 있으면 후보 목록과 경로를
//! 덮어쓸 수 있습니다(없어도 무방). 프로브/설치 타임아웃과 최소
//! Python 버전은 런치 계약의 일부이므로 파일로는 바꿀 수 없습니다.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// 서버 구동에 필요한 최소 Python 버전
pub const MIN_PYTHON_VERSION: (u32, u32) = (3, 8);

/// Relative path of the server entry artifact under the install root.
pub const DEFAULT_SERVER_ENTRY: &str = "server/server.py";

/// Relative path of the dependency manifest under the install root.
pub const DEFAULT_MANIFEST: &str = "requirements.txt";

/// Directory put on the child's `PYTHONPATH`, relative to the install root.
pub const SERVER_SOURCE_DIR: &str = "server";

fn default_candidates() -> Vec<String> {
    ["python3", "python", "py"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_server_entry() -> String {
    DEFAULT_SERVER_ENTRY.to_string()
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST.to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct LauncherConfig {
    /// 우선순위 순서의 인터프리터 후보 이름 — 앞선 후보가 먼저 시도됨
    #[serde(default = "default_candidates")]
    pub python_candidates: Vec<String>,
    #[serde(default = "default_server_entry")]
    pub server_entry: String,
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            python_candidates: default_candidates(),
            server_entry: default_server_entry(),
            manifest: default_manifest(),
        }
    }
}

impl LauncherConfig {
    /// Load `config/launcher.toml` under the install root.
    /// 파일이 없거나 파싱할 수 없으면 기본값을 사용합니다.
    pub fn load(root: &Path) -> Self {
        let path = root.join("config").join("launcher.toml");
        let s = std::fs::read_to_string(&path).unwrap_or_default();
        toml::from_str(&s).unwrap_or_default()
    }

    pub fn server_entry_path(&self, root: &Path) -> PathBuf {
        root.join(&self.server_entry)
    }

    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.manifest)
    }
}

/// 설치 루트 결정 — 자식의 작업 디렉토리이자 모든 아티팩트의 기준 경로.
///
/// 1. `MCP_LAUNCHER_ROOT` 환경변수 오버라이드
/// 2. 실행 파일 옆에 `server/` 페이로드가 있으면 그 디렉토리
/// 3. 실행 파일의 상위 디렉토리 (`bin/` 배치 레이아웃)
/// 4. 현재 작업 디렉토리
pub fn resolve_install_root() -> PathBuf {
    if let Ok(dir) = std::env::var("MCP_LAUNCHER_ROOT") {
        return PathBuf::from(dir);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            if exe_dir.join(SERVER_SOURCE_DIR).is_dir() {
                return exe_dir.to_path_buf();
            }
            if let Some(parent) = exe_dir.parent() {
                if parent.join(SERVER_SOURCE_DIR).is_dir() {
                    return parent.to_path_buf();
                }
            }
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
