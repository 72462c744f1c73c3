//! Subprocess execution for the external partitioning tools. Generalizes
//! the driver's terraform-invocation pattern: pipe stdout/stderr, forward
//! the child's own diagnostics through `tracing` rather than the process's
//! real stderr, and enforce a hard wall-clock timeout with a kill on expiry.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::error::ExtractError;

pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub success: bool,
}

/// Run `binary args...`, optionally feeding `stdin_data`, capturing stdout
/// as bytes and forwarding stderr lines through `tracing::debug`. Killed if
/// it runs longer than `timeout`.
pub async fn run_with_timeout(
    binary: &str,
    args: &[&str],
    stdin_data: Option<&[u8]>,
    timeout: Duration,
) -> Result<ExecOutput, ExtractError> {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(if stdin_data.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| ExtractError::PartitionerFailed {
        binary: binary.to_string(),
        message: format!("spawn failed: {e}"),
    })?;

    if let Some(data) = stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            let data = data.to_vec();
            stdin.write_all(&data).await.ok();
        }
    }

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");
    let binary_owned = binary.to_string();

    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "ingest_extract::partitioner", binary = %binary_owned, "{line}");
        }
    });

    let read_stdout = async {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buf).await.map(|_| buf)
    };

    let result = tokio::time::timeout(timeout, read_stdout).await;
    stderr_task.abort();

    let stdout_bytes = match result {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            let _ = child.kill().await;
            return Err(ExtractError::Io(e));
        }
        Err(_) => {
            let _ = child.kill().await;
            return Err(ExtractError::Timeout(binary.to_string()));
        }
    };

    let status = child.wait().await.map_err(ExtractError::Io)?;

    Ok(ExecOutput { stdout: stdout_bytes, success: status.success() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_a_successful_command() {
        let out = run_with_timeout("printf", &["hello"], None, Duration::from_secs(5)).await.unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, b"hello");
    }

    #[tokio::test]
    async fn kills_process_that_exceeds_timeout() {
        let err = run_with_timeout("sleep", &["5"], None, Duration::from_millis(50)).await;
        assert!(matches!(err, Err(ExtractError::Timeout(_))));
    }
}
