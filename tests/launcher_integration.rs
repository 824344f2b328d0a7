//! 핵심 런치 시퀀스 통합 테스트 — 가짜 인터프리터 스크립트로
//! 탐색 → 의존성 검증 → 감독 단계를 실제 서브프로세스 위에서 구동합니다.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mcp_launcher::error::LauncherError;
use mcp_launcher::python_env::{self, deps};
use mcp_launcher::supervisor::Supervisor;

fn fake_interpreter(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn entry_artifact(dir: &Path) -> PathBuf {
    fs::create_dir_all(dir.join("server")).unwrap();
    let entry = dir.join("server").join("server.py");
    fs::write(&entry, "# server entry\n").unwrap();
    entry
}

/// 엔트리 존재, 인터프리터가 3.11 보고, manifest 없음 → 설치 없이
/// 바로 스폰하고 자식의 코드를 그대로 반환
#[tokio::test]
async fn full_sequence_without_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let entry = entry_artifact(dir.path());
    let python = fake_interpreter(
        dir.path(),
        "python3",
        r#"case "$1" in
  --version) echo "Python 3.11.2"; exit 0;;
esac
exit 0"#,
    );

    let candidates = vec![python.to_string_lossy().into_owned()];
    let chosen = python_env::find_interpreter(&candidates).await.unwrap();

    deps::ensure_dependencies(&chosen, &dir.path().join("requirements.txt"))
        .await
        .unwrap();

    let sup = Supervisor::spawn(&chosen, &entry, dir.path()).unwrap();
    assert_eq!(sup.run().await.unwrap(), 0);
}

/// 자식이 3으로 종료하면 런처도 3 — 코드는 절대 재매핑되지 않음
#[tokio::test]
async fn child_exit_code_propagates_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let entry = entry_artifact(dir.path());
    let python = fake_interpreter(
        dir.path(),
        "python3",
        r#"case "$1" in
  --version) echo "Python 3.10.1"; exit 0;;
esac
exit 3"#,
    );

    let candidates = vec![python.to_string_lossy().into_owned()];
    let chosen = python_env::find_interpreter(&candidates).await.unwrap();

    let sup = Supervisor::spawn(&chosen, &entry, dir.path()).unwrap();
    assert_eq!(sup.run().await.unwrap(), 3);
}

/// 프로브 실패 → 설치 1회 → 재검증 통과 → 서버 기동까지의 전체 흐름
#[tokio::test]
async fn install_then_launch() {
    let dir = tempfile::tempdir().unwrap();
    let entry = entry_artifact(dir.path());
    let manifest = dir.path().join("requirements.txt");
    fs::write(&manifest, "mcp>=1.0\n").unwrap();

    let state = dir.path().join("installed");
    let python = fake_interpreter(
        dir.path(),
        "python3",
        &format!(
            r#"STATE={}
case "$1" in
  --version) echo "Python 3.12.0"; exit 0;;
  -c)
    if [ -f "$STATE" ]; then echo "MCP OK"; exit 0; fi
    echo "ModuleNotFoundError: No module named 'mcp'" >&2
    exit 1;;
  -m) touch "$STATE"; exit 0;;
esac
exit 0"#,
            state.display()
        ),
    );

    let candidates = vec![python.to_string_lossy().into_owned()];
    let chosen = python_env::find_interpreter(&candidates).await.unwrap();

    deps::ensure_dependencies(&chosen, &manifest).await.unwrap();
    assert!(state.exists(), "pip install should have run exactly once");

    let sup = Supervisor::spawn(&chosen, &entry, dir.path()).unwrap();
    assert_eq!(sup.run().await.unwrap(), 0);
}

/// 설치 실패는 치명적 — 서버는 스폰되지 않고 종료 코드 1로 끝나야 함
#[tokio::test]
async fn install_failure_aborts_launch() {
    let dir = tempfile::tempdir().unwrap();
    entry_artifact(dir.path());
    let manifest = dir.path().join("requirements.txt");
    fs::write(&manifest, "mcp>=1.0\n").unwrap();

    let python = fake_interpreter(
        dir.path(),
        "python3",
        r#"case "$1" in
  --version) echo "Python 3.11.0"; exit 0;;
  -c) exit 1;;
  -m) echo "Could not find a version that satisfies the requirement" >&2; exit 1;;
esac
exit 0"#,
    );

    let candidates = vec![python.to_string_lossy().into_owned()];
    let chosen = python_env::find_interpreter(&candidates).await.unwrap();

    let err = deps::ensure_dependencies(&chosen, &manifest)
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 1);
    match err {
        LauncherError::InstallFailed { remedy, .. } => {
            assert!(remedy.contains("-m pip install -r"));
        }
        other => panic!("expected InstallFailed, got {:?}", other),
    }
}

/// 호환 인터프리터가 하나도 없으면 버전 프로브 외의 서브프로세스는
/// 전혀 뜨지 않아야 함
#[tokio::test]
async fn discovery_failure_runs_only_version_probes() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("non-probe-invocation");
    let python = fake_interpreter(
        dir.path(),
        "python3",
        &format!(
            r#"case "$1" in
  --version) echo "Python 3.6.0"; exit 0;;
esac
touch {}
exit 0"#,
            marker.display()
        ),
    );

    let candidates = vec![python.to_string_lossy().into_owned()];
    let err = python_env::find_interpreter(&candidates).await.unwrap_err();
    assert_eq!(err.error_code(), "NO_PYTHON");
    assert!(!marker.exists(), "locator must only run version probes");
}

/// 엔트리 아티팩트가 없으면 자식이 스폰되지 않고 1로 끝남
#[tokio::test]
async fn missing_entry_never_spawns() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("spawned");
    let python = fake_interpreter(
        dir.path(),
        "python3",
        &format!("touch {}\nexit 0", marker.display()),
    );

    let err = Supervisor::spawn(
        &python.to_string_lossy(),
        &dir.path().join("server/server.py"),
        dir.path(),
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(!marker.exists(), "no child may be spawned without the entry");
}
