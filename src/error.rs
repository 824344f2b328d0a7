//! 런처 전용 에러 타입 — 에러 종류를 구분하여 main에서 문서화된
//! 프로세스 종료 코드를 반환할 수 있게 합니다.
//!
//! 자식 서버의 비정상 종료는 여기 속하지 않습니다. 그건 에러가 아니라
//! 종료 코드 전파로 처리됩니다(supervisor 참고).

use std::path::PathBuf;

/// Outcome of probing a single interpreter candidate, kept so a
/// discovery failure can report what every candidate actually said.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub candidate: String,
    pub outcome: String,
}

/// 런치 단계에서 발생할 수 있는 치명적 에러 유형
#[derive(thiserror::Error, Debug)]
pub enum LauncherError {
    #[error("no Python interpreter >= {required_major}.{required_minor} found")]
    InterpreterNotFound {
        required_major: u32,
        required_minor: u32,
        probed: Vec<ProbeReport>,
    },

    #[error("failed to install dependencies from '{}'", .manifest.display())]
    InstallFailed {
        manifest: PathBuf,
        /// 사용자가 수동으로 실행할 수 있는 정확한 설치 명령
        remedy: String,
        detail: String,
    },

    #[error("server entry not found: {}", .0.display())]
    EntryMissing(PathBuf),

    #[error("failed to start server process: {0}")]
    SpawnFailed(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl LauncherError {
    /// 프로세스 종료 코드 매핑 — 모든 런치 단계 실패는 1
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// 머신 리더블 에러 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InterpreterNotFound { .. } => "NO_PYTHON",
            Self::InstallFailed { .. } => "PIP_INSTALL_FAILED",
            Self::EntryMissing(_) => "ENTRY_MISSING",
            Self::SpawnFailed(_) => "SPAWN_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Multi-line operator-facing report, written to stderr on failure.
    pub fn report(&self) -> String {
        match self {
            Self::InterpreterNotFound {
                required_major,
                required_minor,
                probed,
            } => {
                let mut out = format!(
                    "No compatible Python interpreter found (need >= {}.{}).\n",
                    required_major, required_minor
                );
                for probe in probed {
                    out.push_str(&format!("  {}: {}\n", probe.candidate, probe.outcome));
                }
                out.push_str("Install Python from https://python.org and retry.");
                out
            }
            Self::InstallFailed { remedy, detail, .. } => format!(
                "Failed to install Python dependencies.\n{}\nPlease run manually:\n  {}",
                detail, remedy
            ),
            other => other.to_string(),
        }
    }
}
