use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{COMMAND_OUTPUT_CAP, COMMAND_TIMEOUT_SECS};
use crate::tools::ToolResult;
use crate::utils::FailureKind;

/// Execute a shell command inside the sandbox and capture its output
///
/// The caller is responsible for having routed the command through the
/// safety gate first; this function only runs it. The sandbox root is the
/// working directory, and execution is bounded by a timeout.
pub async fn execute_command(command: &str, working_dir: &Path, time_limit: Duration) -> ToolResult {
    let shell = if cfg!(target_os = "windows") { "cmd" } else { "sh" };
    let shell_arg = if cfg!(target_os = "windows") { "/C" } else { "-c" };

    let mut cmd = Command::new(shell);
    cmd.arg(shell_arg)
        .arg(command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match timeout(time_limit, run_command(cmd)).await {
        Ok(Ok(output)) => ToolResult::success(cap_output(&output)),
        Ok(Err(e)) => ToolResult::failed(FailureKind::Execution, format!("Command failed: {:#}", e)),
        Err(_) => ToolResult::failed(
            FailureKind::Timeout,
            format!("Command timed out after {} seconds", time_limit.as_secs()),
        ),
    }
}

/// Default time bound for shell commands
pub fn default_time_limit() -> Duration {
    Duration::from_secs(COMMAND_TIMEOUT_SECS)
}

/// Run the command and collect stdout/stderr
async fn run_command(mut cmd: Command) -> Result<String> {
    let mut child = cmd
        .spawn()
        .context("Failed to execute command. Is the shell available?")?;

    let stdout = child
        .stdout
        .take()
        .context("Command process stdout stream not available")?;
    let stderr = child
        .stderr
        .take()
        .context("Command process stderr stream not available")?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let mut output = String::new();
    let mut errors = String::new();

    while let Some(line) = stdout_reader
        .next_line()
        .await
        .context("Error reading command output")?
    {
        output.push_str(&line);
        output.push('\n');
    }

    while let Some(line) = stderr_reader
        .next_line()
        .await
        .context("Error reading command error output")?
    {
        errors.push_str(&line);
        errors.push('\n');
    }

    let status = child
        .wait()
        .await
        .context("Failed to wait for command to complete")?;

    let mut full_output = output;
    if !errors.is_empty() {
        full_output.push_str("\n--- stderr ---\n");
        full_output.push_str(&errors);
    }

    if !status.success() {
        full_output.push_str(&format!(
            "\n--- Command exited with status: {} ---",
            status.code().unwrap_or(-1)
        ));
    }

    Ok(full_output)
}

fn cap_output(output: &str) -> String {
    if output.len() > COMMAND_OUTPUT_CAP {
        let mut cut = COMMAND_OUTPUT_CAP;
        while cut > 0 && !output.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}...\n[output truncated at {} bytes]",
            &output[..cut],
            COMMAND_OUTPUT_CAP
        )
    } else {
        output.to_string()
    }
}
