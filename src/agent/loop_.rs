//! The Agent Loop: drives a model through think -> act ->
//! observe cycles against a working root, parsing tool calls out of
//! free-form text, gating risky ones behind human approval, and running
//! post-completion verification before calling a task done.
//!
//! State machine per iteration:
//! `PLANNING -> AWAIT_MODEL -> {TRUNCATED, NO_ACTION, HTML_SALVAGE, TOOL_RUN} -> ... -> VERIFY`

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::agent::completion::{detect_completion, COMPLETION_SENTINEL};
use crate::agent::html_salvage::{extract_html_document, looks_like_html_site_request};
use crate::agent::system_prompt::build_system_prompt;
use crate::agent::truncation::looks_structurally_truncated;
use crate::agent::types::{AgentState, GenerationOptions, Message, Task, ToolCall};
use crate::agent::verify::{
    extract_expected_output_paths, extract_verification_commands, verification_command_timeout_secs,
    verification_failed,
};
use crate::error::{Error, Result};
use crate::model::{is_length_truncated, ModelProvider};
use crate::pathres::PathResolver;
use crate::permission::{PermissionDecision, PermissionGate};
use crate::progress::{EventKind, ProgressEvent, ProgressSink};
use crate::prompt::{assemble, DEFAULT_BUDGET_BYTES};
use crate::redact::Redactor;
use crate::tools::ToolEngine;

const MAX_NO_ACTION_ATTEMPTS: u32 = 10;
const MAX_API_ERROR_STREAK: u32 = 8;
const MAX_TRUNCATION_CONTINUE_ATTEMPTS: u32 = 2;
const INITIAL_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 60;
const VERIFY_EXEC_TIMEOUT_ARG: &str = "timeout_s";

const NON_COMPLETION_FINAL_MESSAGE: &str =
    "Reached the maximum number of attempts without receiving a completion signal.";

/// Cancellation context: cooperative, checked between
/// suspension points, never forcibly unwound.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How the loop terminated, for callers that want more than just the
/// persisted `AgentState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Completed,
    MaxIterationsExceeded,
    PermissionDenied,
    Cancelled,
    ModelConfigError,
}

/// Persists `AgentState` after every iteration. Implementations must not
/// fail the loop on a write error; log and continue.
#[async_trait::async_trait]
pub trait StatePersister: Send + Sync {
    async fn persist(&self, state: &AgentState);
}

/// Default no-op persister for callers (tests, one-shot scripts) that
/// don't need durable state.
pub struct NoOpPersister;

#[async_trait::async_trait]
impl StatePersister for NoOpPersister {
    async fn persist(&self, _state: &AgentState) {}
}

/// Writes `<state_dir>/<task_id>.json`, pretty-printed.
pub struct FileStatePersister {
    state_dir: PathBuf,
}

impl FileStatePersister {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into() }
    }
}

#[async_trait::async_trait]
impl StatePersister for FileStatePersister {
    async fn persist(&self, state: &AgentState) {
        let path = self.state_dir.join(format!("{}.json", state.task_id));
        match serde_json::to_vec_pretty(state) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    warn!(error = %e, path = %path.display(), "failed to persist agent state");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize agent state"),
        }
    }
}

/// Tunable loop limits.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_loops: u32,
    pub relentless: bool,
    pub max_no_action_attempts: u32,
    pub max_api_error_streak: u32,
    pub max_truncation_continue_attempts: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_loops: 50,
            relentless: false,
            max_no_action_attempts: MAX_NO_ACTION_ATTEMPTS,
            max_api_error_streak: MAX_API_ERROR_STREAK,
            max_truncation_continue_attempts: MAX_TRUNCATION_CONTINUE_ATTEMPTS,
        }
    }
}

/// Everything the loop needs to drive one run: the model boundary, the
/// tool engine, the permission gate, a progress sink, and the redactor
/// every outbound string passes through first.
pub struct AgentLoop {
    provider: Arc<dyn ModelProvider>,
    engine: ToolEngine,
    gate: PermissionGate,
    sink: Arc<dyn ProgressSink>,
    redactor: Redactor,
    persister: Arc<dyn StatePersister>,
    config: LoopConfig,
    any_tool_executed: AtomicBool,
    iteration_hint: AtomicU32,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        engine: ToolEngine,
        gate: PermissionGate,
        sink: Arc<dyn ProgressSink>,
        redactor: Redactor,
        persister: Arc<dyn StatePersister>,
        config: LoopConfig,
    ) -> Self {
        Self {
            provider,
            engine,
            gate,
            sink,
            redactor,
            persister,
            config,
            any_tool_executed: AtomicBool::new(false),
            iteration_hint: AtomicU32::new(0),
        }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration_hint.load(Ordering::Relaxed)
    }

    /// Run `task` to completion (or exhaustion), returning the final
    /// persisted state and an outcome tag.
    pub async fn run(&self, task: Task, cancel: &CancellationToken) -> Result<(AgentState, LoopOutcome)> {
        let mut state = AgentState::new(&task, self.config.max_loops);
        let root = self.engine.resolver().root().to_path_buf();

        let system_prompt = build_system_prompt(&task.instruction);
        state.messages.push(Message::system(system_prompt));
        state.messages.push(Message::user(task.instruction.clone()));

        let expected_paths = extract_expected_output_paths(&task.instruction);
        let mut verification_commands: Option<Vec<String>> = None;

        let mut consecutive_no_action: u32 = 0;
        let mut api_error_streak: u32 = 0;
        let mut truncation_continue_attempts: u32 = 0;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            if cancel.is_cancelled() {
                state.final_output = Some("Cancelled.".to_string());
                return self.finish(state, LoopOutcome::Cancelled).await;
            }
            if !self.config.relentless && state.iteration >= self.config.max_loops {
                state.final_output = Some(NON_COMPLETION_FINAL_MESSAGE.to_string());
                return self.finish(state, LoopOutcome::MaxIterationsExceeded).await;
            }

            self.iteration_hint.store(state.iteration, Ordering::Relaxed);
            self.persister.persist(&state).await;

            if state.iteration == 0 {
                self.sink.emit(ProgressEvent::thinking("Planning approach").redacted(&self.redactor)).await;
            }

            let assembled = assemble(&state.messages, DEFAULT_BUDGET_BYTES);
            let completion = self
                .provider
                .complete_with_observer(&assembled.text, &GenerationOptions::default(), self.sink.as_ref())
                .await;

            let completion = match completion {
                Ok(c) => c,
                Err(e) => {
                    if cancel.is_cancelled() {
                        state.final_output = Some("Cancelled.".to_string());
                        return self.finish(state, LoopOutcome::Cancelled).await;
                    }
                    let text = e.to_string();
                    if Error::is_model_config_error(&text) {
                        let message = self.redactor.redact(&format!("Error: {text}"));
                        state.messages.push(Message::assistant(message.clone()));
                        state.final_output = Some(message);
                        return self.finish(state, LoopOutcome::ModelConfigError).await;
                    }
                    api_error_streak += 1;
                    if api_error_streak > self.config.max_api_error_streak {
                        let message = self.redactor.redact(&format!("Error: {text}"));
                        state.final_output = Some(message);
                        return self.finish(state, LoopOutcome::MaxIterationsExceeded).await;
                    }
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }
            };
            api_error_streak = 0;

            let redacted_text = self.redactor.redact(&completion.text);
            state.messages.push(Message::assistant(redacted_text.clone()));

            let parsed = crate::parser::parse(&completion.text);

            if parsed.is_none() {
                if looks_like_html_site_request(&task.instruction) {
                    if let Some(document) = extract_html_document(&completion.text) {
                        let call = ToolCall::new(
                            ToolCall::generated_id("html-salvage"),
                            "write_file",
                            serde_json::json!({"path": "index.html", "content": document}),
                        );
                        self.any_tool_executed.store(true, Ordering::Relaxed);
                        let result = self.engine.execute(&call, self.sink.as_ref()).await;
                        let succeeded = result.success;
                        state.results.push(result);
                        if succeeded {
                            state.completed = true;
                            state.final_output = Some(COMPLETION_SENTINEL.to_string());
                            return self.finish(state, LoopOutcome::Completed).await;
                        }
                    }
                }

                let structurally_truncated = is_length_truncated(completion.finish_reason.as_deref())
                    || looks_structurally_truncated(&completion.text);

                if structurally_truncated {
                    if truncation_continue_attempts < self.config.max_truncation_continue_attempts {
                        truncation_continue_attempts += 1;
                        let looked_like_tool_call = completion.text.trim_start().starts_with('{');
                        let prompt = if looked_like_tool_call {
                            "Your previous response was cut off. Continue from where you left off, \
                             responding with JSON only."
                        } else {
                            "Your previous response was cut off. Please continue from where you left off."
                        };
                        state.messages.push(Message::user(prompt));
                        state.iteration += 1;
                        continue;
                    }
                } else {
                    truncation_continue_attempts = 0;
                }

                consecutive_no_action += 1;
                let any_tool_executed = self.any_tool_executed.load(Ordering::Relaxed);
                let completed_signal = detect_completion(&completion.text, any_tool_executed);

                if completed_signal {
                    match self
                        .run_post_completion_verification(
                            &task,
                            &root,
                            &expected_paths,
                            &mut verification_commands,
                            &redacted_text,
                            &mut state,
                        )
                        .await?
                    {
                        VerificationOutcome::Passed => {
                            state.completed = true;
                            state.final_output = Some(redacted_text);
                            return self.finish(state, LoopOutcome::Completed).await;
                        }
                        VerificationOutcome::NeedsAnotherTurn => {
                            state.iteration += 1;
                            continue;
                        }
                    }
                }

                if consecutive_no_action >= self.config.max_no_action_attempts {
                    if self.config.relentless {
                        state.messages.push(Message::user(RELENTLESS_HARD_RESET_INSTRUCTION));
                        consecutive_no_action = 0;
                        state.iteration += 1;
                        continue;
                    }
                    state.final_output = Some(NON_COMPLETION_FINAL_MESSAGE.to_string());
                    return self.finish(state, LoopOutcome::MaxIterationsExceeded).await;
                }

                let instruction = if self.any_tool_executed.load(Ordering::Relaxed) {
                    NO_ACTION_INSTRUCTION_WITH_TOOLS
                } else {
                    NO_ACTION_INSTRUCTION_NO_TOOLS
                };
                state.messages.push(Message::user(instruction));
                state.iteration += 1;
                continue;
            }

            // Tool calls present.
            consecutive_no_action = 0;
            truncation_continue_attempts = 0;
            let calls = parsed.expect("checked is_none above");

            for call in &calls {
                if self.gate.is_enabled() && crate::permission::requires_approval(call, self.engine.resolver()) {
                    let mut request = ProgressEvent::new(EventKind::PermissionRequest).text(describe_call(call));
                    request.tool = Some(call.name.clone());
                    request.tool_call_id = Some(call.id.clone());
                    self.sink.emit(request.redacted(&self.redactor)).await;
                    let rx = self.gate.await_decision(&call.id).await;
                    let allowed = matches!(rx.await, Ok(PermissionDecision { allow: true, .. }));
                    if !allowed {
                        self.sink
                            .emit(ProgressEvent::warn(crate::permission::PERMISSION_DENIED_MESSAGE).redacted(&self.redactor))
                            .await;
                        state.final_output = Some(crate::permission::PERMISSION_DENIED_MESSAGE.to_string());
                        return self.finish(state, LoopOutcome::PermissionDenied).await;
                    }
                }

                self.any_tool_executed.store(true, Ordering::Relaxed);
                let result = self.engine.execute(call, self.sink.as_ref()).await;
                let envelope = serde_json::to_string_pretty(&result.to_envelope_json()).unwrap_or_default();
                state.messages.push(Message::user(format!("Tool result for {}:\n{envelope}", call.name)));
                state.results.push(result);
            }

            state.iteration += 1;
        }
    }

    async fn run_post_completion_verification(
        &self,
        task: &Task,
        root: &std::path::Path,
        expected_paths: &[String],
        verification_commands: &mut Option<Vec<String>>,
        redacted_text: &str,
        state: &mut AgentState,
    ) -> Result<VerificationOutcome> {
        let mut missing = Vec::new();
        for path in expected_paths {
            let abs = self.engine.resolver().resolve(path);
            if tokio::fs::try_exists(&abs).await.unwrap_or(false) {
                continue;
            }
            missing.push(path.clone());
        }
        if !missing.is_empty() {
            state.messages.push(Message::user(format!(
                "The following expected output files are missing: {}. Please produce them before finishing.",
                missing.join(", ")
            )));
            return Ok(VerificationOutcome::NeedsAnotherTurn);
        }

        if verification_commands.is_none() {
            *verification_commands = Some(extract_verification_commands(&task.instruction, root));
        }
        let commands = verification_commands.as_ref().expect("just set").clone();

        for command in &commands {
            let call = ToolCall::new(
                ToolCall::generated_id("verify"),
                "exec",
                serde_json::json!({"command": command, VERIFY_EXEC_TIMEOUT_ARG: verification_command_timeout_secs()}),
            );
            let result = self.engine.execute(&call, self.sink.as_ref()).await;
            let envelope = serde_json::to_string_pretty(&result.to_envelope_json()).unwrap_or_default();
            state
                .messages
                .push(Message::user(format!("Tool result for exec (verification):\n{envelope}")));
            let failed = verification_failed(result.success, &result.output);
            state.results.push(result);
            if failed {
                state.messages.push(Message::user(format!(
                    "Verification command `{command}` failed. Fix the issue and re-verify before declaring completion."
                )));
                return Ok(VerificationOutcome::NeedsAnotherTurn);
            }
        }

        let _ = redacted_text;
        Ok(VerificationOutcome::Passed)
    }

    async fn finish(&self, mut state: AgentState, outcome: LoopOutcome) -> Result<(AgentState, LoopOutcome)> {
        state.ended_at = Some(chrono::Utc::now());
        if let Some(output) = &state.final_output {
            state.final_output = Some(self.redactor.redact(output));
        }
        self.persister.persist(&state).await;
        Ok((state, outcome))
    }
}

enum VerificationOutcome {
    Passed,
    NeedsAnotherTurn,
}

const NO_ACTION_INSTRUCTION_WITH_TOOLS: &str =
    "You haven't called a tool or signaled completion. If the task is done, reply with a line \
     containing exactly TASK_COMPLETED. Otherwise, produce a single JSON tool call.";
const NO_ACTION_INSTRUCTION_NO_TOOLS: &str =
    "Produce a single JSON tool call to make progress on the task, or reply with TASK_COMPLETED \
     if there is truly nothing left to do.";
const RELENTLESS_HARD_RESET_INSTRUCTION: &str =
    "Respond with a single JSON tool call now. Do not explain; call a tool or report TASK_COMPLETED.";

fn describe_call(call: &ToolCall) -> String {
    let args = serde_json::to_string(&call.arguments).unwrap_or_default();
    format!("{}({args})", call.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::Usage;
    use crate::permission::PermissionMode;
    use crate::progress::TracingSink;
    use crate::tools::canonical_registry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn complete(&self, _prompt: &str, _options: &GenerationOptions) -> Result<crate::model::Completion> {
            let mut responses = self.responses.lock().unwrap();
            let text = if responses.is_empty() { "TASK_COMPLETED".to_string() } else { responses.remove(0).to_string() };
            Ok(crate::model::Completion { text, finish_reason: Some("stop".to_string()), usage: Some(Usage::default()) })
        }
    }

    fn build_loop(responses: Vec<&'static str>, dir: &std::path::Path) -> AgentLoop {
        let provider = Arc::new(ScriptedProvider { responses: Mutex::new(responses) });
        let registry = canonical_registry(dir.to_path_buf());
        let resolver = PathResolver::new(dir);
        let engine = ToolEngine::new(registry, resolver, Redactor::default());
        let gate = PermissionGate::new(PermissionMode::FullAccess);
        AgentLoop::new(
            provider,
            engine,
            gate,
            Arc::new(TracingSink),
            Redactor::default(),
            Arc::new(NoOpPersister),
            LoopConfig::default(),
        )
    }

    #[tokio::test]
    async fn bare_sentinel_completes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let agent_loop = build_loop(vec!["TASK_COMPLETED"], dir.path());
        let (state, outcome) = agent_loop.run(Task::new("do nothing"), &CancellationToken::new()).await.unwrap();
        assert!(state.completed);
        assert_eq!(outcome, LoopOutcome::Completed);
    }

    #[tokio::test]
    async fn tool_call_then_completion_runs_both_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let write = r#"{"tool": "write_file", "args": {"path": "out.txt", "content": "hi"}}"#;
        let agent_loop = build_loop(vec![write, "TASK_COMPLETED"], dir.path());
        let (state, outcome) = agent_loop.run(Task::new("write a file"), &CancellationToken::new()).await.unwrap();
        assert!(state.completed);
        assert_eq!(outcome, LoopOutcome::Completed);
        assert_eq!(state.results.len(), 1);
        assert!(dir.path().join("out.txt").exists());
    }

    #[tokio::test]
    async fn cancellation_is_observed_before_first_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let agent_loop = build_loop(vec!["TASK_COMPLETED"], dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (state, outcome) = agent_loop.run(Task::new("do nothing"), &cancel).await.unwrap();
        assert!(!state.completed);
        assert_eq!(outcome, LoopOutcome::Cancelled);
    }
}
