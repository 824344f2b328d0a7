//! Python 인터프리터 탐색 — 시스템에 설치된 Python 중 서버를 구동할
//! 수 있는 것을 찾습니다.
//!
//! 후보 실행 파일 이름을 우선순위 순서로 `--version` 프로브하고,
//! 출력에서 `<major>.<minor>`를 추출해 최소 버전을 만족하는 첫
//! 후보를 선택합니다. 실패한 프로브(실행 불가, 비정상 종료, 타임아웃)는
//! 해당 후보만 건너뛰며 전체 탐색을 중단시키지 않습니다.

pub mod deps;

use std::time::Duration;

use tokio::process::Command;

use crate::config::MIN_PYTHON_VERSION;
use crate::error::{LauncherError, ProbeReport};
use crate::utils::{apply_creation_flags, output_with_timeout};

/// 버전 프로브 타임아웃 — 응답 없는 후보는 사용 불가로 간주
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Find the first candidate interpreter meeting [`MIN_PYTHON_VERSION`].
///
/// 리스트 순서가 우선순위입니다 — 앞선 후보가 조건을 만족하면 뒤의
/// 후보는 프로브하지 않습니다. 모든 후보가 탈락하면 후보별 관찰
/// 결과를 담은 [`LauncherError::InterpreterNotFound`]를 반환합니다.
pub async fn find_interpreter(candidates: &[String]) -> Result<String, LauncherError> {
    let mut probed = Vec::with_capacity(candidates.len());

    for name in candidates {
        match probe_candidate(name, VERSION_PROBE_TIMEOUT).await {
            ProbeOutcome::Accepted { major, minor } => {
                tracing::info!("Found Python: {} ({}.{})", name, major, minor);
                return Ok(name.clone());
            }
            outcome => {
                tracing::debug!("Candidate '{}' skipped: {}", name, outcome.describe());
                probed.push(ProbeReport {
                    candidate: name.clone(),
                    outcome: outcome.describe(),
                });
            }
        }
    }

    Err(LauncherError::InterpreterNotFound {
        required_major: MIN_PYTHON_VERSION.0,
        required_minor: MIN_PYTHON_VERSION.1,
        probed,
    })
}

/// 단일 후보의 프로브 결과
#[derive(Debug, PartialEq, Eq)]
enum ProbeOutcome {
    Accepted { major: u32, minor: u32 },
    BelowMinimum { major: u32, minor: u32 },
    NoVersion,
    NotRunnable(String),
}

impl ProbeOutcome {
    fn describe(&self) -> String {
        match self {
            Self::Accepted { major, minor } => format!("Python {}.{}", major, minor),
            Self::BelowMinimum { major, minor } => format!(
                "Python {}.{} (below required {}.{})",
                major, minor, MIN_PYTHON_VERSION.0, MIN_PYTHON_VERSION.1
            ),
            Self::NoVersion => "no recognizable version output".to_string(),
            Self::NotRunnable(reason) => reason.clone(),
        }
    }
}

/// `<name> --version`을 실행해 후보의 사용 가능 여부를 판정합니다.
async fn probe_candidate(name: &str, timeout: Duration) -> ProbeOutcome {
    let mut cmd = Command::new(name);
    cmd.arg("--version");
    apply_creation_flags(&mut cmd);

    let output = match output_with_timeout(&mut cmd, timeout).await {
        Ok(output) => output,
        Err(e) => return ProbeOutcome::NotRunnable(e.to_string()),
    };
    if !output.status.success() {
        return ProbeOutcome::NotRunnable(format!("exited with {}", output.status));
    }

    // 구버전 CPython은 버전 배너를 stderr로 출력
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match parse_version(&stdout).or_else(|| parse_version(&stderr)) {
        Some((major, minor)) if (major, minor) >= MIN_PYTHON_VERSION => {
            ProbeOutcome::Accepted { major, minor }
        }
        Some((major, minor)) => ProbeOutcome::BelowMinimum { major, minor },
        None => ProbeOutcome::NoVersion,
    }
}

/// "Python 3.12.8" 같은 자유 형식 텍스트에서 (major, minor) 추출
fn parse_version(text: &str) -> Option<(u32, u32)> {
    let re = regex::Regex::new(r"(?P<major>\d+)\.(?P<minor>\d+)").ok()?;
    let caps = re.captures(text)?;
    let major = caps.name("major")?.as_str().parse().ok()?;
    let minor = caps.name("minor")?.as_str().parse().ok()?;
    Some((major, minor))
}
