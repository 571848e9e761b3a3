use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::utils::{DenialRule, FailureKind};

/// A structured request from the model to perform one registered operation
///
/// `name`/`args` are what the parser extracted; `raw` keeps the model's
/// literal action text for audit and session replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub args: BTreeMap<String, String>,
    pub raw: String,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
            raw: raw.into(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Signature used by the repeated-action guard
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}:{}", self.name, args.join(","))
    }
}

/// The closed set of operations the agent can perform
///
/// Unknown tools cannot be represented here; they surface as
/// `Failed{UnknownTool}` during resolution, before the safety gate is ever
/// consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolAction {
    /// Read a file
    ReadFile { path: String },
    /// Write or create a file
    WriteFile { path: String, content: String },
    /// Replace an inclusive 1-indexed line range in a file
    EditFile {
        path: String,
        start_line: usize,
        end_line: usize,
        content: String,
    },
    /// Delete a file
    DeleteFile { path: String },
    /// Create a directory
    CreateDirectory { path: String },
    /// List the entries of a directory
    ListFiles { path: String },
    /// Search for text in files under a directory
    SearchFiles { pattern: String, path: String },
    /// Execute a shell command
    RunCommand { command: String },
    /// Git operations
    GitStatus,
    GitDiff { path: Option<String> },
    GitCommit { message: String },
    /// Explicit completion signal from the model
    Finish { summary: Option<String> },
}

impl ToolAction {
    /// Resolve a parsed invocation against the registered tool set
    pub fn from_invocation(inv: &ToolInvocation) -> Result<Self, (FailureKind, String)> {
        let missing = |key: &str| {
            (
                FailureKind::InvalidArguments,
                format!("tool '{}' requires argument '{}'", inv.name, key),
            )
        };

        let action = match inv.name.as_str() {
            "read_file" => ToolAction::ReadFile {
                path: inv.arg("path").ok_or_else(|| missing("path"))?.to_string(),
            },
            "write_file" => ToolAction::WriteFile {
                path: inv.arg("path").ok_or_else(|| missing("path"))?.to_string(),
                content: inv.arg("content").unwrap_or_default().to_string(),
            },
            "edit_file" => {
                let parse_line = |key: &str| -> Result<usize, (FailureKind, String)> {
                    let raw = inv.arg(key).ok_or_else(|| missing(key))?;
                    raw.parse().map_err(|_| {
                        (
                            FailureKind::InvalidArguments,
                            format!("'{}' must be a line number, got '{}'", key, raw),
                        )
                    })
                };
                let start_line = parse_line("start_line")?;
                let end_line = parse_line("end_line")?;
                if start_line == 0 || end_line < start_line {
                    return Err((
                        FailureKind::InvalidArguments,
                        format!("invalid line range {}..{}", start_line, end_line),
                    ));
                }
                ToolAction::EditFile {
                    path: inv.arg("path").ok_or_else(|| missing("path"))?.to_string(),
                    start_line,
                    end_line,
                    content: inv.arg("content").unwrap_or_default().to_string(),
                }
            }
            "delete_file" => ToolAction::DeleteFile {
                path: inv.arg("path").ok_or_else(|| missing("path"))?.to_string(),
            },
            "create_dir" => ToolAction::CreateDirectory {
                path: inv.arg("path").ok_or_else(|| missing("path"))?.to_string(),
            },
            "list_files" => ToolAction::ListFiles {
                path: inv.arg("path").unwrap_or(".").to_string(),
            },
            "search_files" => ToolAction::SearchFiles {
                pattern: inv
                    .arg("pattern")
                    .ok_or_else(|| missing("pattern"))?
                    .to_string(),
                path: inv.arg("path").unwrap_or(".").to_string(),
            },
            "run_command" => ToolAction::RunCommand {
                command: inv
                    .arg("command")
                    .ok_or_else(|| missing("command"))?
                    .to_string(),
            },
            "git_status" => ToolAction::GitStatus,
            "git_diff" => ToolAction::GitDiff {
                path: inv.arg("path").map(str::to_string),
            },
            "git_commit" => ToolAction::GitCommit {
                message: inv
                    .arg("message")
                    .ok_or_else(|| missing("message"))?
                    .to_string(),
            },
            "finish" => ToolAction::Finish {
                summary: inv.arg("summary").map(str::to_string),
            },
            other => {
                return Err((
                    FailureKind::UnknownTool,
                    format!("no tool named '{}' is registered", other),
                ))
            }
        };

        Ok(action)
    }

    /// Whether this action mutates the filesystem or repository
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ToolAction::WriteFile { .. }
                | ToolAction::EditFile { .. }
                | ToolAction::DeleteFile { .. }
                | ToolAction::CreateDirectory { .. }
                | ToolAction::RunCommand { .. }
                | ToolAction::GitCommit { .. }
        )
    }

    /// Get a human-readable description of an action
    pub fn describe(&self) -> String {
        match self {
            ToolAction::ReadFile { path } => format!("Read file: {}", path),
            ToolAction::WriteFile { path, content } => {
                format!("Write file: {} ({} bytes)", path, content.len())
            }
            ToolAction::EditFile {
                path,
                start_line,
                end_line,
                ..
            } => format!("Edit file: {} (lines {}-{})", path, start_line, end_line),
            ToolAction::DeleteFile { path } => format!("Delete file: {}", path),
            ToolAction::CreateDirectory { path } => format!("Create directory: {}", path),
            ToolAction::ListFiles { path } => format!("List files: {}", path),
            ToolAction::SearchFiles { pattern, path } => {
                format!("Search for '{}' in {}", pattern, path)
            }
            ToolAction::RunCommand { command } => format!("Execute command: {}", command),
            ToolAction::GitStatus => "Git status".to_string(),
            ToolAction::GitDiff { path } => match path {
                Some(p) => format!("Git diff for: {}", p),
                None => "Git diff (all files)".to_string(),
            },
            ToolAction::GitCommit { message } => format!("Git commit: {}", message),
            ToolAction::Finish { .. } => "Finish task".to_string(),
        }
    }
}

/// Result of executing one tool invocation, produced exactly once per call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        output: String,
        /// Backup written before a destructive mutation, when one applies
        #[serde(skip_serializing_if = "Option::is_none", default)]
        backup: Option<PathBuf>,
    },
    Denied {
        rule: DenialRule,
        reason: String,
    },
    Failed {
        kind: FailureKind,
        error: String,
    },
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        ToolResult::Success {
            output: output.into(),
            backup: None,
        }
    }

    pub fn success_with_backup(output: impl Into<String>, backup: PathBuf) -> Self {
        ToolResult::Success {
            output: output.into(),
            backup: Some(backup),
        }
    }

    pub fn denied(rule: DenialRule, reason: impl Into<String>) -> Self {
        ToolResult::Denied {
            rule,
            reason: reason.into(),
        }
    }

    pub fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        ToolResult::Failed {
            kind,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// Render the observation text fed back to the model
    pub fn observation_text(&self) -> String {
        match self {
            ToolResult::Success { output, backup } => match backup {
                Some(path) => format!("{}\n(backup saved at {})", output, path.display()),
                None => output.clone(),
            },
            ToolResult::Denied { rule, reason } => {
                format!("Denied ({}): {}", rule, reason)
            }
            ToolResult::Failed { kind, error } => {
                format!("Error ({}): {}", kind, error)
            }
        }
    }
}
