//! Shared utility functions for the launcher.

use std::time::Duration;

use anyhow::Result;
use tokio::process::Command;

/// Apply platform-specific flags to hide the console window on Windows.
/// On non-Windows platforms, this is a no-op.
#[cfg(target_os = "windows")]
pub fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
pub fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    cmd
}

/// Run a command to completion with a bounded timeout, capturing its output.
/// 타임아웃 초과는 해당 서브프로세스의 비정상 종료와 동일하게 `Err`로 취급합니다.
pub async fn output_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
) -> Result<std::process::Output> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(anyhow::anyhow!(
            "command timed out after {}s",
            timeout.as_secs()
        )),
    }
}
