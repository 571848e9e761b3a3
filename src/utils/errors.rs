use thiserror::Error;

/// Errors that terminate the agent loop (everything else is recovered
/// locally and fed back to the model as an observation)
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("iteration limit of {0} exceeded")]
    IterationLimitExceeded(usize),

    #[error("model client failed: {0}")]
    ModelClient(#[from] crate::models::ModelError),
}

/// Classification of a failed tool invocation, carried in the observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The model named a tool that is not registered
    UnknownTool,
    /// Arguments missing or malformed for the named tool
    InvalidArguments,
    /// The underlying filesystem/process/VCS operation failed
    Execution,
    /// A spawned process exceeded its time bound
    Timeout,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::UnknownTool => "unknown tool",
            FailureKind::InvalidArguments => "invalid arguments",
            FailureKind::Execution => "execution error",
            FailureKind::Timeout => "timeout",
        };
        write!(f, "{}", name)
    }
}

/// Identifier of the safety rule that produced a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialRule {
    /// Path resolves outside the sandbox root (or hits a sensitive file)
    PathTraversal,
    /// Shell command matched the dangerous-pattern denylist
    DangerousCommand,
    /// Operator declined the confirmation prompt
    UserDeclined,
}

impl std::fmt::Display for DenialRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DenialRule::PathTraversal => "path_traversal",
            DenialRule::DangerousCommand => "dangerous_command",
            DenialRule::UserDeclined => "user_declined",
        };
        write!(f, "{}", name)
    }
}

