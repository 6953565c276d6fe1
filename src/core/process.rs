use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Run a command with arguments and a timeout, returning trimmed stdout.
///
/// The child is killed if the timeout elapses first.
pub async fn run_command(cmd: &str, args: &[&str], timeout: Duration) -> Result<String> {
    debug!(cmd, ?args, "spawning subprocess");
    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(cmd)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .with_context(|| format!("Command `{}` timed out after {:?}", cmd, timeout))?
    .with_context(|| format!("Failed to execute `{}`", cmd))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "`{}` exited with {}: {}",
            cmd,
            output.status,
            stderr.trim()
        );
    }

    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("Non-UTF8 output from `{}`", cmd))?;
    Ok(stdout.trim().to_string())
}

/// Check if a binary exists in PATH. Returns the full path if found.
pub fn which(binary: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(binary))
            .find(|p| p.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_finds_existing_binary() {
        assert!(which("sh").is_some());
    }

    #[test]
    fn which_returns_none_for_nonexistent() {
        assert!(which("burnout_missing_binary_xyz").is_none());
    }

    #[tokio::test]
    async fn run_command_captures_stdout() {
        let result = run_command("echo", &["  quota  "], Duration::from_secs(5)).await;
        assert_eq!(result.unwrap(), "quota");
    }

    #[tokio::test]
    async fn run_command_reports_exit_status() {
        let err = run_command("false", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn run_command_times_out() {
        let err = run_command("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
