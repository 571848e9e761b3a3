use std::sync::Arc;

use crate::app::Config;
use crate::context::{CandidateScanner, ContextPacker};
use crate::models::{GenerationParams, ModelClient};
use crate::safety::SandboxRoot;
use crate::session::{Session, SessionStatus, SessionStore, Step};
use crate::tools::{parse_reply, ConfirmationProvider, ToolExecutor, ToolResult};
use crate::utils::{AgentError, FailureKind, TokenEstimator};

use super::interrupt::InterruptHandle;
use super::prompt;

/// How a session ended; exactly one of these per run
#[derive(Debug)]
pub enum LoopOutcome {
    /// The model signalled completion (or had nothing further to do)
    Done { summary: Option<String> },
    /// Iteration ceiling or operator interrupt
    Aborted { reason: String },
    /// The model client failed for good
    Failed { error: AgentError },
}

/// The ReAct state machine: Thinking -> Acting -> Observing, repeated
///
/// Owns the session exclusively; no other component mutates it. One tool
/// invocation is in flight at a time, which keeps filesystem state and
/// backup bookkeeping race-free.
pub struct ReactLoop {
    config: crate::app::AgentConfig,
    params: GenerationParams,
    model: Arc<dyn ModelClient>,
    executor: ToolExecutor,
    packer: ContextPacker,
    scanner: CandidateScanner,
    store: Option<SessionStore>,
    estimator: TokenEstimator,
    session: Session,
    interrupt: InterruptHandle,
}

impl ReactLoop {
    /// Assemble a loop from configuration, with explicit collaborators
    ///
    /// Everything the loop needs is threaded through here once; there is no
    /// ambient global state, so independent sessions can coexist in tests.
    pub fn new(
        config: &Config,
        session: Session,
        model: Arc<dyn ModelClient>,
        confirm: Arc<dyn ConfirmationProvider>,
    ) -> anyhow::Result<Self> {
        let sandbox = SandboxRoot::new(&session.sandbox_root)?;
        let executor = ToolExecutor::new(sandbox, config.safety.clone(), confirm);

        Ok(Self {
            config: config.agent.clone(),
            params: GenerationParams::from(&config.model),
            model,
            executor,
            packer: ContextPacker::new(config.context.clone()),
            scanner: CandidateScanner::new(&config.context),
            store: None,
            estimator: TokenEstimator::new(),
            session,
            interrupt: InterruptHandle::new(),
        })
    }

    /// Persist the session after every step and on termination
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Drive the loop until DONE, ABORTED or FAILED
    pub async fn run(&mut self) -> LoopOutcome {
        for iteration in 0..self.config.max_iterations {
            if self.interrupt.is_interrupted() {
                return self.abort("interrupted by user");
            }

            // THINKING: pack context, ask the model for the next step
            tracing::info!("[iter {}] thinking", iteration);
            let candidates = match self.scanner.scan(self.executor.sandbox().path()) {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!("Candidate scan failed, packing history only: {:#}", e);
                    Vec::new()
                }
            };
            let packed = self.packer.pack(&self.session.task, candidates, &self.session);
            let request = prompt::build_request(&self.session.task, &packed, self.params.clone());

            let reply = tokio::select! {
                reply = self.model.complete(&request) => reply,
                _ = self.interrupt.wait() => return self.abort("interrupted by user"),
            };

            let reply = match reply {
                Ok(reply) => reply,
                Err(e) => {
                    // The client already retried transient faults; anything
                    // surfacing here is final.
                    tracing::error!("[iter {}] model client failed: {}", iteration, e);
                    self.session.mark(SessionStatus::Error);
                    self.persist();
                    return LoopOutcome::Failed {
                        error: AgentError::ModelClient(e),
                    };
                }
            };

            let tokens = reply
                .usage
                .map(|u| u.total_tokens)
                .unwrap_or_else(|| self.estimator.estimate(&reply.content));
            self.session.add_tokens(tokens);

            let parsed = parse_reply(&reply.content);

            let Some(invocation) = parsed.invocation else {
                // No parseable action: the model is finished
                let step = Step::new(self.session.next_index(), parsed.thought.clone(), None, None);
                self.session.push_step(step);
                self.session.mark(SessionStatus::Completed);
                self.persist();
                tracing::info!("[iter {}] done, no further action", iteration);
                return LoopOutcome::Done {
                    summary: non_empty(parsed.thought),
                };
            };

            // Repeated-action guard: an identical invocation hammered over
            // recent steps is re-planned, not re-executed
            let signature = invocation.signature();
            let repeats = self
                .session
                .count_recent_matching(&signature, self.config.repeat_window);
            if repeats >= self.config.repeat_threshold {
                tracing::warn!(
                    "[iter {}] repeated action suppressed ({}x): {}",
                    iteration,
                    repeats,
                    signature
                );
                let observation = ToolResult::failed(
                    FailureKind::Execution,
                    format!(
                        "Repeated action detected ({} recent occurrences). You already have \
                         this result; take a different action based on what you learned.",
                        repeats
                    ),
                );
                let step = Step::new(
                    self.session.next_index(),
                    parsed.thought,
                    Some(invocation),
                    Some(observation),
                );
                self.session.push_step(step);
                if self.config.auto_save_session {
                    self.persist();
                }
                continue;
            }

            // ACTING: exactly one invocation, through gate and executor
            tracing::info!("[iter {}] acting: {}", iteration, summarize(&invocation.raw));
            let result = tokio::select! {
                result = self.executor.execute(&invocation) => result,
                _ = self.interrupt.wait() => return self.abort("interrupted by user"),
            };

            // OBSERVING: fold the result back into the session
            tracing::info!(
                "[iter {}] observed: {}",
                iteration,
                summarize(&result.observation_text())
            );
            let finished = invocation.name == "finish" && result.is_success();
            let summary = invocation.args.get("summary").cloned();

            let step = Step::new(
                self.session.next_index(),
                parsed.thought,
                Some(invocation),
                Some(result),
            );
            self.session.push_step(step);
            if self.config.auto_save_session {
                self.persist();
            }

            if finished {
                self.session.mark(SessionStatus::Completed);
                self.persist();
                tracing::info!("[iter {}] done via finish", iteration);
                return LoopOutcome::Done { summary };
            }
        }

        // Iteration ceiling: the only defense against a forever-failing plan
        let reason = AgentError::IterationLimitExceeded(self.config.max_iterations).to_string();
        self.abort(&reason)
    }

    fn abort(&mut self, reason: &str) -> LoopOutcome {
        tracing::warn!("Session aborted: {}", reason);
        self.session.mark(SessionStatus::Aborted);
        self.persist();
        LoopOutcome::Aborted {
            reason: reason.to_string(),
        }
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.session) {
                tracing::error!("Failed to save session {}: {:#}", self.session.id, e);
            }
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// One-line preview for transition logs
fn summarize(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 120 {
        let head: String = line.chars().take(117).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelError, ScriptedModel};
    use crate::tools::AutoApprove;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(max_iterations: usize) -> Config {
        let mut config = Config::default();
        config.agent.max_iterations = max_iterations;
        config.agent.auto_save_session = false;
        config
    }

    fn react_loop(temp_dir: &TempDir, config: &Config, model: ScriptedModel) -> ReactLoop {
        let session = Session::new("demo task", temp_dir.path().to_path_buf());
        ReactLoop::new(config, session, Arc::new(model), Arc::new(AutoApprove)).unwrap()
    }

    #[tokio::test]
    async fn test_finish_signal_completes_session() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(["Everything checks out.\n[FINISH]\nNothing to change.\n[/FINISH]"]);
        let mut agent = react_loop(&temp_dir, &test_config(10), model);

        let outcome = agent.run().await;

        match outcome {
            LoopOutcome::Done { summary } => {
                assert_eq!(summary.as_deref(), Some("Nothing to change."))
            }
            other => panic!("Expected done, got {:?}", other),
        }
        assert_eq!(agent.session().status, SessionStatus::Completed);
        assert_eq!(agent.session().steps.len(), 1);
    }

    #[tokio::test]
    async fn test_reply_without_action_completes_session() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(["The project already satisfies the request."]);
        let mut agent = react_loop(&temp_dir, &test_config(10), model);

        let outcome = agent.run().await;

        assert!(matches!(outcome, LoopOutcome::Done { .. }));
        let step = &agent.session().steps[0];
        assert!(step.invocation.is_none());
        assert!(step.observation.is_none()); // empty observation = no action taken
    }

    #[tokio::test]
    async fn test_iteration_ceiling_aborts_at_limit_not_after() {
        let temp_dir = TempDir::new().unwrap();
        // 50 distinct non-terminating actions; none ever signals finish
        let replies: Vec<String> = (0..60)
            .map(|i| format!("step {i}\n[READ_FILE: missing_{i}.txt]"))
            .collect();
        let model = ScriptedModel::new(replies);
        let mut agent = react_loop(&temp_dir, &test_config(50), model);

        let outcome = agent.run().await;

        match outcome {
            LoopOutcome::Aborted { reason } => assert!(reason.contains("50")),
            other => panic!("Expected abort, got {:?}", other),
        }
        assert_eq!(agent.session().steps.len(), 50);
        assert_eq!(agent.session().status, SessionStatus::Aborted);
    }

    #[tokio::test]
    async fn test_model_failure_fails_session() {
        let temp_dir = TempDir::new().unwrap();
        let model =
            ScriptedModel::with_results([Err(ModelError::Fatal("provider gone".to_string()))]);
        let mut agent = react_loop(&temp_dir, &test_config(10), model);

        let outcome = agent.run().await;

        assert!(matches!(outcome, LoopOutcome::Failed { .. }));
        assert_eq!(agent.session().status, SessionStatus::Error);
    }

    #[tokio::test]
    async fn test_denied_action_is_fed_back_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel::new([
            "Removing the password file.\n[DELETE_FILE: /etc/passwd]".to_string(),
            "That was denied; stopping here.\n[FINISH]".to_string(),
        ]);
        let mut agent = react_loop(&temp_dir, &test_config(10), model);

        let outcome = agent.run().await;

        assert!(matches!(outcome, LoopOutcome::Done { .. }));
        let first = &agent.session().steps[0];
        match first.observation.as_ref().unwrap() {
            ToolResult::Denied { rule, .. } => {
                assert_eq!(*rule, crate::utils::DenialRule::PathTraversal)
            }
            other => panic!("Expected denial observation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rewrite_file_creates_backup_then_finishes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("README.md"), "A").unwrap();

        let model = ScriptedModel::new([
            "Rewriting the readme.\n[WRITE_FILE: README.md]\nB\n[/WRITE_FILE]".to_string(),
            "[FINISH]\nRewrote README.md\n[/FINISH]".to_string(),
        ]);
        let mut agent = react_loop(&temp_dir, &test_config(10), model);

        let outcome = agent.run().await;
        assert!(matches!(outcome, LoopOutcome::Done { .. }));

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("README.md")).unwrap(),
            "B"
        );
        let backup = temp_dir.path().join("README.md.backup");
        assert_eq!(fs::read_to_string(backup).unwrap(), "A");

        match agent.session().steps[0].observation.as_ref().unwrap() {
            ToolResult::Success { backup, .. } => assert!(backup.is_some()),
            other => panic!("Expected success with backup, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repeated_action_guard_synthesizes_observation() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("same.txt"), "content").unwrap();

        let replies: Vec<String> = (0..6)
            .map(|_| "Reading it again.\n[READ_FILE: same.txt]".to_string())
            .collect();
        let model = ScriptedModel::new(replies);

        let mut config = test_config(6);
        config.agent.repeat_threshold = 3;
        config.agent.repeat_window = 5;
        let mut agent = react_loop(&temp_dir, &config, model);

        agent.run().await;

        let steps = &agent.session().steps;
        // First three executions really read the file
        for step in &steps[..3] {
            assert!(step.observation.as_ref().unwrap().is_success());
        }
        // The fourth is suppressed with a synthetic observation
        match steps[3].observation.as_ref().unwrap() {
            ToolResult::Failed { error, .. } => assert!(error.contains("Repeated action")),
            other => panic!("Expected synthetic failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_interrupt_aborts_inflight_model_call() {
        use crate::models::{ModelReply, ModelRequest};
        use async_trait::async_trait;

        /// A provider that never answers; only an interrupt can unblock it
        struct PendingModel;

        #[async_trait]
        impl crate::models::ModelClient for PendingModel {
            async fn complete(
                &self,
                _request: &ModelRequest,
            ) -> Result<ModelReply, ModelError> {
                std::future::pending().await
            }

            fn name(&self) -> &str {
                "pending"
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let session = Session::new("demo task", temp_dir.path().to_path_buf());
        let mut agent = ReactLoop::new(
            &test_config(10),
            session,
            Arc::new(PendingModel),
            Arc::new(AutoApprove),
        )
        .unwrap();

        let handle = agent.interrupt_handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.interrupt();
        });

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(2), agent.run())
            .await
            .expect("interrupt must break the suspension");

        assert!(matches!(outcome, LoopOutcome::Aborted { .. }));
        assert_eq!(agent.session().status, SessionStatus::Aborted);
    }

    #[tokio::test]
    async fn test_pre_fired_interrupt_aborts_before_any_step() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(["[READ_FILE: a.txt]"]);
        let mut agent = react_loop(&temp_dir, &test_config(10), model);

        agent.interrupt_handle().interrupt();
        let outcome = agent.run().await;

        assert!(matches!(outcome, LoopOutcome::Aborted { .. }));
        assert!(agent.session().steps.is_empty());
        assert_eq!(agent.session().status, SessionStatus::Aborted);
    }

    #[tokio::test]
    async fn test_thinking_request_carries_packed_context() {
        use crate::models::{MockModelClient, ModelReply};

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.md"), "demo task notes live here").unwrap();

        let mut model = MockModelClient::new();
        model.expect_complete().returning(|request| {
            let user = &request.messages[1].content;
            assert!(user.contains("Task: demo task"));
            assert!(user.contains("notes.md"));
            Ok(ModelReply {
                content: "[FINISH]".to_string(),
                usage: None,
                model_name: "mock".to_string(),
            })
        });

        let config = test_config(5);
        let session = Session::new("demo task", temp_dir.path().to_path_buf());
        let mut agent =
            ReactLoop::new(&config, session, Arc::new(model), Arc::new(AutoApprove)).unwrap();

        assert!(matches!(agent.run().await, LoopOutcome::Done { .. }));
    }

    #[tokio::test]
    async fn test_sessions_persist_through_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path()).unwrap();
        let model = ScriptedModel::new(["[FINISH]"]);

        let mut config = test_config(5);
        config.agent.auto_save_session = true;
        let session = Session::new("demo task", temp_dir.path().to_path_buf());
        let session_id = session.id.clone();
        let mut agent = ReactLoop::new(&config, session, Arc::new(model), Arc::new(AutoApprove))
            .unwrap()
            .with_store(SessionStore::new(temp_dir.path()).unwrap());

        agent.run().await;

        let loaded = store.load(&session_id).unwrap();
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.steps, agent.session().steps);
    }
}
