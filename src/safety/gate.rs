use crate::app::SafetyConfig;
use crate::constants::{DANGEROUS_COMMANDS, DELETION_COMMANDS};
use crate::tools::ToolAction;
use crate::utils::DenialRule;

use super::sandbox::SandboxRoot;

/// Verdict of the safety gate for one resolved operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenialRule),
    RequireConfirmation,
}

/// The gate's decision, with the rule that produced it
///
/// Computed fresh for every invocation; never cached, because target paths
/// and configuration differ per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyDecision {
    pub verdict: Verdict,
    pub rule: &'static str,
    pub reason: String,
}

impl SafetyDecision {
    fn allow(rule: &'static str) -> Self {
        Self {
            verdict: Verdict::Allow,
            rule,
            reason: String::new(),
        }
    }

    fn deny(rule: &'static str, denial: DenialRule, reason: String) -> Self {
        Self {
            verdict: Verdict::Deny(denial),
            rule,
            reason,
        }
    }

    fn confirm(rule: &'static str, reason: String) -> Self {
        Self {
            verdict: Verdict::RequireConfirmation,
            rule,
            reason,
        }
    }
}

/// The sole authority deciding whether a resolved operation may run
///
/// Stateless per call apart from the sandbox root and configuration it was
/// built with. Rules are evaluated in fixed order; the first match wins.
pub struct SafetyGate {
    sandbox: SandboxRoot,
    config: SafetyConfig,
}

impl SafetyGate {
    pub fn new(sandbox: SandboxRoot, config: SafetyConfig) -> Self {
        Self { sandbox, config }
    }

    pub fn sandbox(&self) -> &SandboxRoot {
        &self.sandbox
    }

    /// Evaluate an action against the rule chain
    pub fn evaluate(&self, action: &ToolAction) -> SafetyDecision {
        // Rule 1: path containment for every path argument
        if let Some(decision) = self.check_paths(action) {
            tracing::warn!("Safety gate denied {}: {}", action.describe(), decision.reason);
            return decision;
        }

        // Rule 2: shell command filtering
        if let ToolAction::RunCommand { command } = action {
            return self.check_command(command);
        }

        // Rule 3: destructive file operations need confirmation
        if self.config.confirm_destructive {
            if let Some(decision) = self.check_destructive(action) {
                return decision;
            }
        }

        // Rule 4: default
        SafetyDecision::allow("default_allow")
    }

    fn check_paths(&self, action: &ToolAction) -> Option<SafetyDecision> {
        for raw in path_arguments(action) {
            let Some(resolved) = self.sandbox.resolve(raw) else {
                return Some(SafetyDecision::deny(
                    "path_containment",
                    DenialRule::PathTraversal,
                    format!("path '{}' resolves outside the project root", raw),
                ));
            };

            if self.sandbox.is_sensitive(&resolved) {
                return Some(SafetyDecision::deny(
                    "sensitive_path",
                    DenialRule::PathTraversal,
                    format!("path '{}' matches a protected sensitive location", raw),
                ));
            }
        }
        None
    }

    fn check_command(&self, command: &str) -> SafetyDecision {
        let trimmed = command.trim();
        let lowered = trimmed.to_lowercase();

        // An explicitly allowlisted idiom short-circuits everything else
        if self
            .config
            .allowed_command_prefixes
            .iter()
            .any(|prefix| trimmed.starts_with(prefix.as_str()))
        {
            return SafetyDecision::allow("command_allowlist");
        }

        if let Some(pattern) = DANGEROUS_COMMANDS
            .iter()
            .find(|pattern| lowered.contains(*pattern))
        {
            return SafetyDecision::deny(
                "command_denylist",
                DenialRule::DangerousCommand,
                format!("command matches dangerous pattern '{}'", pattern.trim()),
            );
        }

        // Deletion-shaped commands fall under destructive confirmation
        if self.config.confirm_destructive
            && DELETION_COMMANDS
                .iter()
                .any(|pattern| lowered.contains(*pattern))
        {
            return SafetyDecision::confirm(
                "command_deletion",
                format!("command may delete files: {}", trimmed),
            );
        }

        SafetyDecision::allow("default_allow")
    }

    fn check_destructive(&self, action: &ToolAction) -> Option<SafetyDecision> {
        match action {
            ToolAction::DeleteFile { path } => Some(SafetyDecision::confirm(
                "destructive_confirmation",
                format!("deleting file: {}", path),
            )),
            ToolAction::EditFile { path, .. } => Some(SafetyDecision::confirm(
                "destructive_confirmation",
                format!("editing existing file: {}", path),
            )),
            ToolAction::WriteFile { path, .. } => {
                // Only overwrites are destructive; fresh files are not
                let exists = self
                    .sandbox
                    .resolve(path)
                    .map(|p| p.exists())
                    .unwrap_or(false);
                if exists {
                    Some(SafetyDecision::confirm(
                        "destructive_confirmation",
                        format!("overwriting existing file: {}", path),
                    ))
                } else {
                    None
                }
            }
            ToolAction::GitCommit { message } => Some(SafetyDecision::confirm(
                "destructive_confirmation",
                format!("committing all staged and unstaged changes: {}", message),
            )),
            _ => None,
        }
    }
}

/// Every path argument an action carries, in declaration order
fn path_arguments(action: &ToolAction) -> Vec<&str> {
    match action {
        ToolAction::ReadFile { path }
        | ToolAction::WriteFile { path, .. }
        | ToolAction::EditFile { path, .. }
        | ToolAction::DeleteFile { path }
        | ToolAction::CreateDirectory { path }
        | ToolAction::ListFiles { path }
        | ToolAction::SearchFiles { path, .. } => vec![path.as_str()],
        ToolAction::GitDiff { path: Some(path) } => vec![path.as_str()],
        _ => Vec::new(),
    }
}
