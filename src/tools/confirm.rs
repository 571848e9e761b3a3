use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

/// What the operator is being asked to approve
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    /// Human-readable description of the action
    pub description: String,
    /// The gate's reason for requiring confirmation
    pub reason: String,
    /// Raw action text, shown when the operator asks for detail
    pub details: Option<String>,
}

/// Operator's answer to a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Approved,
    Declined,
    /// Show the full action text, then ask again
    DetailRequested,
}

/// Injectable source of confirmation decisions
///
/// The executor blocks on this only when the safety gate returns
/// `RequireConfirmation`. Tests supply a scripted implementation instead of
/// real interactive input.
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationProvider: Send + Sync {
    fn confirm(&self, request: &ConfirmationRequest) -> ConfirmOutcome;
}

/// Interactive terminal prompt (y/n/d)
pub struct TerminalConfirmation;

impl ConfirmationProvider for TerminalConfirmation {
    fn confirm(&self, request: &ConfirmationRequest) -> ConfirmOutcome {
        eprintln!("\n{} ({})", request.description, request.reason);
        eprint!("Proceed? [y]es / [n]o / [d]etails: ");
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return ConfirmOutcome::Declined;
        }

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => ConfirmOutcome::Approved,
            "d" | "details" => ConfirmOutcome::DetailRequested,
            _ => ConfirmOutcome::Declined,
        }
    }
}

/// Approves everything; for non-interactive runs that opted out of prompts
pub struct AutoApprove;

impl ConfirmationProvider for AutoApprove {
    fn confirm(&self, _request: &ConfirmationRequest) -> ConfirmOutcome {
        ConfirmOutcome::Approved
    }
}

/// Declines everything; the safe default for headless runs
pub struct AutoDecline;

impl ConfirmationProvider for AutoDecline {
    fn confirm(&self, _request: &ConfirmationRequest) -> ConfirmOutcome {
        ConfirmOutcome::Declined
    }
}

/// Replays a fixed script of outcomes; exhausting the script declines
pub struct ScriptedConfirmation {
    script: Mutex<VecDeque<ConfirmOutcome>>,
}

impl ScriptedConfirmation {
    pub fn new(outcomes: impl IntoIterator<Item = ConfirmOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
        }
    }
}

impl ConfirmationProvider for ScriptedConfirmation {
    fn confirm(&self, _request: &ConfirmationRequest) -> ConfirmOutcome {
        self.script
            .lock()
            .expect("confirmation script lock")
            .pop_front()
            .unwrap_or(ConfirmOutcome::Declined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest {
            description: "Delete file: notes.txt".to_string(),
            reason: "deleting file".to_string(),
            details: None,
        }
    }

    #[test]
    fn test_scripted_replays_in_order() {
        let provider = ScriptedConfirmation::new([ConfirmOutcome::Approved, ConfirmOutcome::Declined]);

        assert_eq!(provider.confirm(&request()), ConfirmOutcome::Approved);
        assert_eq!(provider.confirm(&request()), ConfirmOutcome::Declined);
    }

    #[test]
    fn test_exhausted_script_declines() {
        let provider = ScriptedConfirmation::new([]);
        assert_eq!(provider.confirm(&request()), ConfirmOutcome::Declined);
    }

    #[test]
    fn test_auto_providers() {
        assert_eq!(AutoApprove.confirm(&request()), ConfirmOutcome::Approved);
        assert_eq!(AutoDecline.confirm(&request()), ConfirmOutcome::Declined);
    }
}
