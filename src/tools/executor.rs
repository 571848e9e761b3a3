use std::sync::Arc;
use std::time::Duration;

use crate::app::SafetyConfig;
use crate::safety::{SafetyGate, SandboxRoot, Verdict};
use crate::utils::{DenialRule, FailureKind};

use super::confirm::{ConfirmOutcome, ConfirmationProvider, ConfirmationRequest};
use super::types::{ToolAction, ToolInvocation, ToolResult};
use super::{filesystem, git, shell};

/// Single point of execution for all tool invocations
///
/// The only component permitted to touch the filesystem, spawn processes or
/// drive version control. Every invocation goes: resolve against the
/// registered tool set, validate arguments, consult the safety gate, then
/// execute. Invocations are strictly serialized by the agent loop, which
/// keeps backup bookkeeping race-free.
pub struct ToolExecutor {
    gate: SafetyGate,
    confirm: Arc<dyn ConfirmationProvider>,
    command_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(
        sandbox: SandboxRoot,
        safety: SafetyConfig,
        confirm: Arc<dyn ConfirmationProvider>,
    ) -> Self {
        let command_timeout = Duration::from_secs(safety.command_timeout_secs);
        Self {
            gate: SafetyGate::new(sandbox, safety),
            confirm,
            command_timeout,
        }
    }

    pub fn sandbox(&self) -> &SandboxRoot {
        self.gate.sandbox()
    }

    /// Execute one invocation end-to-end, producing exactly one result
    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        // Unknown tools and malformed arguments never reach the gate
        let action = match ToolAction::from_invocation(invocation) {
            Ok(action) => action,
            Err((kind, message)) => {
                tracing::debug!("Invocation rejected before gating: {}", message);
                return ToolResult::failed(kind, message);
            }
        };

        let decision = self.gate.evaluate(&action);
        tracing::debug!(
            "Safety gate: {:?} via rule '{}' for {}",
            decision.verdict,
            decision.rule,
            action.describe()
        );

        match decision.verdict {
            Verdict::Deny(rule) => {
                return ToolResult::denied(rule, format!("[{}] {}", decision.rule, decision.reason));
            }
            Verdict::RequireConfirmation => {
                if !self.ask_operator(&action, &decision.reason, invocation) {
                    return ToolResult::denied(
                        DenialRule::UserDeclined,
                        format!("operator declined: {}", action.describe()),
                    );
                }
            }
            Verdict::Allow => {}
        }

        self.run(&action).await
    }

    /// Surface the confirmation prompt, honoring one detail request
    fn ask_operator(&self, action: &ToolAction, reason: &str, invocation: &ToolInvocation) -> bool {
        let mut request = ConfirmationRequest {
            description: action.describe(),
            reason: reason.to_string(),
            details: None,
        };

        match self.confirm.confirm(&request) {
            ConfirmOutcome::Approved => true,
            ConfirmOutcome::Declined => false,
            ConfirmOutcome::DetailRequested => {
                request.details = Some(invocation.raw.clone());
                matches!(self.confirm.confirm(&request), ConfirmOutcome::Approved)
            }
        }
    }

    /// Run an already-gated action
    async fn run(&self, action: &ToolAction) -> ToolResult {
        let sandbox = self.gate.sandbox();
        let root = sandbox.path();

        match action {
            ToolAction::ReadFile { path } => {
                if let Some(hint) = filesystem::missing_file_hint(sandbox, path) {
                    return ToolResult::failed(FailureKind::Execution, hint);
                }
                into_result(filesystem::read_file(sandbox, path))
            }
            ToolAction::WriteFile { path, content } => {
                match filesystem::write_file(sandbox, path, content) {
                    Ok(Some(backup)) => ToolResult::success_with_backup(
                        format!("File written: {}", path),
                        backup,
                    ),
                    Ok(None) => ToolResult::success(format!("File created: {}", path)),
                    Err(e) => execution_error(e),
                }
            }
            ToolAction::EditFile {
                path,
                start_line,
                end_line,
                content,
            } => {
                if let Some(hint) = filesystem::missing_file_hint(sandbox, path) {
                    return ToolResult::failed(FailureKind::Execution, hint);
                }
                match filesystem::edit_file(sandbox, path, *start_line, *end_line, content) {
                    Ok((summary, backup)) => ToolResult::success_with_backup(summary, backup),
                    Err(e) => execution_error(e),
                }
            }
            ToolAction::DeleteFile { path } => match filesystem::delete_file(sandbox, path) {
                Ok(backup) => {
                    ToolResult::success_with_backup(format!("File deleted: {}", path), backup)
                }
                Err(e) => execution_error(e),
            },
            ToolAction::CreateDirectory { path } => {
                match filesystem::create_directory(sandbox, path) {
                    Ok(_) => ToolResult::success(format!("Directory created: {}", path)),
                    Err(e) => execution_error(e),
                }
            }
            ToolAction::ListFiles { path } => into_result(filesystem::list_files(sandbox, path)),
            ToolAction::SearchFiles { pattern, path } => {
                into_result(filesystem::search_files(sandbox, pattern, path))
            }
            ToolAction::RunCommand { command } => {
                shell::execute_command(command, root, self.command_timeout).await
            }
            ToolAction::GitStatus => into_result(git::status(root)),
            ToolAction::GitDiff { path } => into_result(git::diff(root, path.as_deref())),
            ToolAction::GitCommit { message } => into_result(git::commit(root, message)),
            ToolAction::Finish { summary } => ToolResult::success(
                summary
                    .clone()
                    .unwrap_or_else(|| "Task marked complete".to_string()),
            ),
        }
    }
}

fn into_result(outcome: anyhow::Result<String>) -> ToolResult {
    match outcome {
        Ok(output) => ToolResult::success(output),
        Err(e) => execution_error(e),
    }
}

fn execution_error(e: anyhow::Error) -> ToolResult {
    ToolResult::failed(FailureKind::Execution, format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::confirm::{AutoApprove, ScriptedConfirmation};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn executor_with(
        confirm: Arc<dyn ConfirmationProvider>,
        safety: SafetyConfig,
    ) -> (TempDir, ToolExecutor) {
        let temp_dir = TempDir::new().unwrap();
        let sandbox = SandboxRoot::new(temp_dir.path()).unwrap();
        (temp_dir, ToolExecutor::new(sandbox, safety, confirm))
    }

    fn executor() -> (TempDir, ToolExecutor) {
        executor_with(Arc::new(AutoApprove), SafetyConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_without_gating() {
        let (_tmp, executor) = executor();

        let inv = ToolInvocation::new("format_disk", "[FORMAT_DISK]");
        let result = executor.execute(&inv).await;

        assert_eq!(
            result,
            ToolResult::failed(
                FailureKind::UnknownTool,
                "no tool named 'format_disk' is registered"
            )
        );
    }

    #[tokio::test]
    async fn test_delete_outside_sandbox_denied_and_untouched() {
        let (_tmp, executor) = executor();

        let inv = ToolInvocation::new("delete_file", "[DELETE_FILE: /etc/passwd]")
            .with_arg("path", "/etc/passwd");
        let result = executor.execute(&inv).await;

        match result {
            ToolResult::Denied { rule, .. } => assert_eq!(rule, DenialRule::PathTraversal),
            other => panic!("Expected denial, got {:?}", other),
        }
        assert!(std::path::Path::new("/etc/passwd").exists());
    }

    #[tokio::test]
    async fn test_overwrite_creates_backup_before_mutation() {
        let (tmp, executor) = executor();
        fs::write(tmp.path().join("README.md"), "A").unwrap();

        let inv = ToolInvocation::new("write_file", "[WRITE_FILE: README.md]B[/WRITE_FILE]")
            .with_arg("path", "README.md")
            .with_arg("content", "B");
        let result = executor.execute(&inv).await;

        match result {
            ToolResult::Success { backup: Some(backup), .. } => {
                assert_eq!(fs::read_to_string(&backup).unwrap(), "A");
            }
            other => panic!("Expected success with backup, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(tmp.path().join("README.md")).unwrap(), "B");
    }

    #[tokio::test]
    async fn test_declined_confirmation_blocks_mutation() {
        let confirm = Arc::new(ScriptedConfirmation::new([ConfirmOutcome::Declined]));
        let (tmp, executor) = executor_with(confirm, SafetyConfig::default());
        fs::write(tmp.path().join("keep.txt"), "keep me").unwrap();

        let inv = ToolInvocation::new("delete_file", "[DELETE_FILE: keep.txt]")
            .with_arg("path", "keep.txt");
        let result = executor.execute(&inv).await;

        match result {
            ToolResult::Denied { rule, .. } => assert_eq!(rule, DenialRule::UserDeclined),
            other => panic!("Expected denial, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(tmp.path().join("keep.txt")).unwrap(), "keep me");
    }

    #[tokio::test]
    async fn test_detail_request_then_approve() {
        let confirm = Arc::new(ScriptedConfirmation::new([
            ConfirmOutcome::DetailRequested,
            ConfirmOutcome::Approved,
        ]));
        let (tmp, executor) = executor_with(confirm, SafetyConfig::default());
        fs::write(tmp.path().join("old.txt"), "x").unwrap();

        let inv = ToolInvocation::new("delete_file", "[DELETE_FILE: old.txt]")
            .with_arg("path", "old.txt");
        let result = executor.execute(&inv).await;

        assert!(result.is_success());
        assert!(!tmp.path().join("old.txt").exists());
    }

    #[tokio::test]
    async fn test_dangerous_command_never_spawned() {
        let (tmp, executor) = executor();
        fs::write(tmp.path().join("canary.txt"), "alive").unwrap();

        let inv = ToolInvocation::new("run_command", "[COMMAND: rm -rf /]")
            .with_arg("command", "rm -rf /");
        let result = executor.execute(&inv).await;

        match result {
            ToolResult::Denied { rule, .. } => assert_eq!(rule, DenialRule::DangerousCommand),
            other => panic!("Expected denial, got {:?}", other),
        }
        assert!(tmp.path().join("canary.txt").exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_suggests_siblings() {
        let (tmp, executor) = executor();
        fs::write(tmp.path().join("present.txt"), "x").unwrap();

        let inv = ToolInvocation::new("read_file", "[READ_FILE: absent.txt]")
            .with_arg("path", "absent.txt");
        let result = executor.execute(&inv).await;

        match result {
            ToolResult::Failed { kind, error } => {
                assert_eq!(kind, FailureKind::Execution);
                assert!(error.contains("present.txt"));
            }
            other => panic!("Expected failure with hint, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_finish_is_a_no_op_success() {
        let (_tmp, executor) = executor();

        let inv = ToolInvocation::new("finish", "[FINISH]");
        let result = executor.execute(&inv).await;
        assert!(result.is_success());
    }
}
