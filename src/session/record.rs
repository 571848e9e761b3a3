use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tools::{ToolInvocation, ToolResult};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Aborted,
    Error,
}

/// One ReAct cycle: thought, optional action, terminal observation
///
/// Immutable once appended. An absent observation is itself terminal and
/// means "no action taken this cycle".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub thought: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub invocation: Option<ToolInvocation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub observation: Option<ToolResult>,
    pub timestamp: DateTime<Local>,
}

impl Step {
    pub fn new(
        index: usize,
        thought: impl Into<String>,
        invocation: Option<ToolInvocation>,
        observation: Option<ToolResult>,
    ) -> Self {
        Self {
            index,
            thought: thought.into(),
            invocation,
            observation,
            timestamp: Local::now(),
        }
    }

    /// Render this step the way the model sees it in its history
    pub fn render(&self) -> String {
        let mut text = format!("Thought: {}", self.thought);
        if let Some(inv) = &self.invocation {
            text.push_str(&format!("\nAction: {}", inv.raw));
        }
        match &self.observation {
            Some(result) => text.push_str(&format!("\nObservation: {}", result.observation_text())),
            None => {
                if self.invocation.is_none() {
                    text.push_str("\nObservation: (no action taken)");
                }
            }
        }
        text
    }
}

/// The mutable record of a single task, owned exclusively by the agent loop
///
/// Steps are append-only; insertion order is execution order and later
/// steps' context derives from earlier ones. The only allowed truncation is
/// the wholesale `reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub task: String,
    pub sandbox_root: PathBuf,
    pub steps: Vec<Step>,
    pub status: SessionStatus,
    pub token_count: usize,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Session {
    pub fn new(task: impl Into<String>, sandbox_root: PathBuf) -> Self {
        let now = Local::now();
        Self {
            id: format!("{}", now.format("%Y%m%d_%H%M%S")),
            task: task.into(),
            sandbox_root,
            steps: Vec::new(),
            status: SessionStatus::Active,
            token_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a completed step; steps are never edited or reordered
    pub fn push_step(&mut self, step: Step) {
        debug_assert_eq!(step.index, self.steps.len());
        self.steps.push(step);
        self.updated_at = Local::now();
    }

    pub fn next_index(&self) -> usize {
        self.steps.len()
    }

    pub fn add_tokens(&mut self, tokens: usize) {
        self.token_count += tokens;
    }

    pub fn mark(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = Local::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Wholesale truncation; the only way steps ever disappear
    pub fn reset(&mut self) {
        self.steps.clear();
        self.token_count = 0;
        self.status = SessionStatus::Active;
        self.updated_at = Local::now();
    }

    /// The most recent `n` steps, oldest first
    pub fn recent_steps(&self, n: usize) -> &[Step] {
        let start = self.steps.len().saturating_sub(n);
        &self.steps[start..]
    }

    /// How often an identical invocation ran within the recent window
    pub fn count_recent_matching(&self, signature: &str, window: usize) -> usize {
        self.recent_steps(window)
            .iter()
            .filter_map(|s| s.invocation.as_ref())
            .filter(|inv| inv.signature() == signature)
            .count()
    }

    /// Paths successfully mutated by earlier steps in this session
    ///
    /// The packer boosts these: files the agent itself just edited are
    /// highly relevant to the next model call.
    pub fn touched_paths(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| {
                s.observation
                    .as_ref()
                    .map(|o| o.is_success())
                    .unwrap_or(false)
            })
            .filter_map(|s| s.invocation.as_ref())
            .filter_map(|inv| inv.args.get("path").cloned())
            .collect()
    }

    /// Get a summary for display
    pub fn summary(&self) -> String {
        format!(
            "{} | {} steps | {:?} | {}",
            self.updated_at.format("%Y-%m-%d %H:%M"),
            self.steps.len(),
            self.status,
            self.task
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::DenialRule;
    use pretty_assertions::assert_eq;

    fn invocation(path: &str) -> ToolInvocation {
        ToolInvocation::new("write_file", format!("[WRITE_FILE: {}]", path))
            .with_arg("path", path)
            .with_arg("content", "x")
    }

    #[test]
    fn test_step_order_is_append_only() {
        let mut session = Session::new("demo task", PathBuf::from("/tmp/project"));

        for i in 0..3 {
            let step = Step::new(i, format!("thought {}", i), None, None);
            session.push_step(step);
        }

        let indices: Vec<usize> = session.steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_reset_truncates_wholesale() {
        let mut session = Session::new("demo", PathBuf::from("/tmp/p"));
        session.push_step(Step::new(0, "t", None, None));
        session.add_tokens(42);
        session.mark(SessionStatus::Aborted);

        session.reset();

        assert!(session.steps.is_empty());
        assert_eq!(session.token_count, 0);
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[test]
    fn test_touched_paths_only_counts_successes() {
        let mut session = Session::new("demo", PathBuf::from("/tmp/p"));

        session.push_step(Step::new(
            0,
            "write a",
            Some(invocation("a.txt")),
            Some(ToolResult::success("File written: a.txt")),
        ));
        session.push_step(Step::new(
            1,
            "write b",
            Some(invocation("b.txt")),
            Some(ToolResult::denied(DenialRule::UserDeclined, "declined")),
        ));

        assert_eq!(session.touched_paths(), vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_count_recent_matching_respects_window() {
        let mut session = Session::new("demo", PathBuf::from("/tmp/p"));

        for i in 0..4 {
            session.push_step(Step::new(
                i,
                "again",
                Some(invocation("same.txt")),
                Some(ToolResult::success("ok")),
            ));
        }

        let signature = invocation("same.txt").signature();
        assert_eq!(session.count_recent_matching(&signature, 5), 4);
        assert_eq!(session.count_recent_matching(&signature, 2), 2);
    }

    #[test]
    fn test_step_render_includes_observation() {
        let step = Step::new(
            0,
            "read the file",
            Some(ToolInvocation::new("read_file", "[READ_FILE: a.txt]").with_arg("path", "a.txt")),
            Some(ToolResult::success("contents")),
        );

        let rendered = step.render();
        assert!(rendered.contains("Thought: read the file"));
        assert!(rendered.contains("Action: [READ_FILE: a.txt]"));
        assert!(rendered.contains("Observation: contents"));
    }

    #[test]
    fn test_step_without_action_renders_terminal_observation() {
        let step = Step::new(0, "nothing to do", None, None);
        assert!(step.render().contains("(no action taken)"));
    }
}
