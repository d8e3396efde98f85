use crate::error::{ClientError, Result};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as TokioCommand;

pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Runs a local process to completion, killing it if it outlives `timeout`.
pub async fn run_bounded(
    mut cmd: TokioCommand,
    host: &str,
    timeout: Duration,
) -> Result<Output> {
    scanmon_core::logging::log_command(cmd.as_std());
    let program = cmd.as_std().get_program().to_string_lossy().to_string();

    cmd.kill_on_drop(true).stdin(std::process::Stdio::null());
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(ClientError::Spawn { program, source }),
        Err(_) => Err(ClientError::RemoteTimeout {
            host: host.to_string(),
            timeout,
        }),
    }
}

pub fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain() {
        assert_eq!(shell_quote("/scratch/scan"), "'/scratch/scan'");
    }

    #[test]
    fn test_shell_quote_embedded_quote() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[tokio::test]
    async fn test_run_bounded_captures_output() {
        let mut cmd = TokioCommand::new("sh");
        cmd.arg("-c").arg("echo hello; echo oops >&2");
        let output = run_bounded(cmd, "localhost", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(lossy(&output.stdout), "hello\n");
        assert_eq!(lossy(&output.stderr), "oops\n");
    }

    #[tokio::test]
    async fn test_run_bounded_times_out() {
        let mut cmd = TokioCommand::new("sleep");
        cmd.arg("5");
        let err = run_bounded(cmd, "cluster", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RemoteTimeout { ref host, .. } if host == "cluster"));
    }

    #[tokio::test]
    async fn test_run_bounded_reports_missing_program() {
        let cmd = TokioCommand::new("scanmon-definitely-not-a-program");
        let err = run_bounded(cmd, "localhost", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Spawn { .. }));
    }
}
