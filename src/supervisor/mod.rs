//! Process Supervisor — 단일 서버 자식 프로세스의 스폰과 수명주기를
//! 소유합니다.
//!
//! 자식의 표준 입출력은 그대로 상속되어 런처는 자식이 말하는
//! 프로토콜에 대해 바이트 단위로 투명합니다. 런처 자체 진단은 전부
//! stderr(tracing)로만 나갑니다.
//!
//! ## 종료 정책
//! 첫 인터럽트/종료 시그널에서 `ShuttingDown`으로 전이하고 graceful
//! 종료 시그널을 전달한 뒤 5초 유예 타이머를 무장합니다. 유예 안에
//! 자식이 끝나지 않으면 강제 종료합니다. 이후의 종료류 시그널은
//! graceful 시그널만 재전달합니다.
//!
//! 크래시한 서버는 보고만 하고 재시작하지 않습니다.

pub mod state_machine;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use self::state_machine::{State, StateMachine};
use crate::config::SERVER_SOURCE_DIR;
use crate::error::LauncherError;
use crate::utils::apply_creation_flags;

/// graceful 시그널 전달 후 강제 종료까지의 유예 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 감독 루프가 깨어나는 이벤트 — exit/시그널/유예 만료
enum SupervisorEvent {
    ChildExited(std::io::Result<std::process::ExitStatus>),
    TerminationSignal,
    GraceExpired,
}

/// Owns the one live server child for the whole launcher invocation.
/// 시그널 핸들링은 전역 상태가 아니라 이 핸들을 통해서만 이루어집니다.
#[derive(Debug)]
pub struct Supervisor {
    child: Child,
    state: StateMachine,
}

impl Supervisor {
    /// Spawn the server process under `python` with inherited stdio.
    ///
    /// 환경은 부모 환경에 `PYTHONPATH`(모듈 탐색 루트)와
    /// `PYTHONUNBUFFERED`(프로토콜 바이트 즉시 플러시)만 추가합니다.
    /// `entry`가 없으면 아무것도 스폰하지 않고 실패합니다.
    pub fn spawn(python: &str, entry: &Path, root: &Path) -> Result<Self, LauncherError> {
        if !entry.exists() {
            return Err(LauncherError::EntryMissing(entry.to_path_buf()));
        }

        let mut cmd = Command::new(python);
        cmd.arg(entry)
            .current_dir(root)
            .env("PYTHONPATH", root.join(SERVER_SOURCE_DIR))
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);
        apply_creation_flags(&mut cmd);

        let child = cmd
            .spawn()
            .map_err(|e| LauncherError::SpawnFailed(e.to_string()))?;

        if let Some(pid) = child.id() {
            tracing::info!("Server process started (pid {})", pid);
        }

        Ok(Self {
            child,
            state: StateMachine::new(),
        })
    }

    /// 자식의 PID — 이미 종료를 관찰했으면 None
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Block until the child exits, forwarding OS termination signals in
    /// between. Returns the exit code the launcher itself should use.
    pub async fn run(mut self) -> Result<i32, LauncherError> {
        let mut signals = TerminationSignals::new().map_err(|e| {
            LauncherError::Internal(anyhow::anyhow!("failed to install signal handlers: {}", e))
        })?;

        let escalation = tokio::time::sleep(SHUTDOWN_GRACE);
        tokio::pin!(escalation);
        let mut escalation_armed = false;

        loop {
            let event = tokio::select! {
                status = self.child.wait() => SupervisorEvent::ChildExited(status),
                _ = signals.recv() => SupervisorEvent::TerminationSignal,
                _ = &mut escalation, if escalation_armed => SupervisorEvent::GraceExpired,
            };

            match event {
                SupervisorEvent::ChildExited(status) => return self.observe_exit(status),
                SupervisorEvent::TerminationSignal => {
                    if self.begin_shutdown() && !escalation_armed {
                        escalation
                            .as_mut()
                            .reset(tokio::time::Instant::now() + SHUTDOWN_GRACE);
                        escalation_armed = true;
                    }
                }
                SupervisorEvent::GraceExpired => {
                    escalation_armed = false;
                    tracing::warn!(
                        "Server did not exit within {}s grace, force killing",
                        SHUTDOWN_GRACE.as_secs()
                    );
                    self.signal_child(true);
                }
            }
        }
    }

    /// 첫 시그널이면 `ShuttingDown`으로 전이합니다. 이후에는 graceful
    /// 시그널 재전달만 합니다. 반환값은 "이번이 첫 시그널이었는가".
    fn begin_shutdown(&mut self) -> bool {
        let first = self.state.state == State::Running;
        if first {
            tracing::info!("Shutdown signal received, stopping server...");
            // Running → ShuttingDown 전이는 항상 유효
            let _ = self.state.transition(State::ShuttingDown);
        } else {
            tracing::info!("Repeated shutdown signal, forwarding again");
        }
        self.signal_child(false);
        first
    }

    /// Forward a termination signal to the child.
    /// `force`는 즉시 강제 종료(SIGKILL / TerminateProcess)입니다.
    pub fn signal_child(&mut self, force: bool) {
        let Some(pid) = self.child.id() else { return };

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let sig = if force { Signal::SIGKILL } else { Signal::SIGTERM };
            if let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig) {
                tracing::warn!("Failed to send {} to pid {}: {}", sig, pid, e);
            }
        }

        #[cfg(windows)]
        {
            // Windows에는 SIGTERM 상당이 없음 — graceful/강제 모두 TerminateProcess
            use winapi::um::handleapi::CloseHandle;
            use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
            use winapi::um::winnt::PROCESS_TERMINATE;

            let _ = force;
            unsafe {
                let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
                if handle.is_null() {
                    tracing::warn!("Failed to open process {}", pid);
                    return;
                }
                if TerminateProcess(handle, 1) == 0 {
                    tracing::warn!("TerminateProcess failed for pid {}", pid);
                }
                CloseHandle(handle);
            }
        }
    }

    /// 자식 종료 관찰 — `Terminated` 전이 후 런처 종료 코드로 번역.
    /// 자식의 비0 코드는 그대로 전파하며 절대 재매핑하지 않습니다.
    fn observe_exit(
        &mut self,
        status: std::io::Result<std::process::ExitStatus>,
    ) -> Result<i32, LauncherError> {
        let was_shutting_down = self.state.state == State::ShuttingDown;
        let _ = self.state.transition(State::Terminated);

        let status = status.map_err(|e| {
            LauncherError::Internal(anyhow::anyhow!("failed to wait for server process: {}", e))
        })?;

        match status.code() {
            Some(0) => {
                tracing::info!("Server exited cleanly");
                Ok(0)
            }
            Some(code) => {
                tracing::error!("Server exited with code {}", code);
                Ok(code)
            }
            // 시그널로 종료되어 코드가 없는 경우
            None => {
                if was_shutting_down {
                    tracing::info!("Server stopped gracefully");
                } else {
                    tracing::warn!("Server terminated by signal");
                }
                Ok(0)
            }
        }
    }
}

// ─── Termination signal streams ──────────────────────────────

/// 플랫폼별 종료류 시그널 스트림 묶음.
/// unix: SIGINT + SIGTERM, windows: Ctrl-C 이벤트.
#[cfg(unix)]
struct TerminationSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    /// 다음 인터럽트/종료 시그널까지 대기
    async fn recv(&mut self) {
        tokio::select! {
            Some(_) = self.sigint.recv() => {}
            Some(_) = self.sigterm.recv() => {}
            else => std::future::pending::<()>().await,
        }
    }
}

#[cfg(windows)]
struct TerminationSignals;

#[cfg(windows)]
impl TerminationSignals {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        let _ = tokio::signal::ctrl_c().await;
    }
}
