//! Core data model: Task, Message, ToolCall, ToolResult, AgentState.
//!
//! Field names match the tool-result JSON envelope and progress-event
//! JSON directly so serialization needs no renaming layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message role. Lowercased on the wire via
/// `#[serde(rename_all = "lowercase")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// An immutable instruction plus a fresh unique id and start time.
/// Owned by the loop for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub instruction: String,
    pub started_at: DateTime<Utc>,
}

impl Task {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.into(),
            started_at: Utc::now(),
        }
    }
}

/// A single turn in the transcript. Append-only within a run; a tool
/// result message immediately follows the assistant message whose parse
/// produced its call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: None,
            tool_results: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    pub fn with_tool_results(mut self, results: Vec<ToolResult>) -> Self {
        self.tool_results = Some(results);
        self
    }
}

/// Created by the parser, consumed by the engine. Arguments are
/// normalized by the parser: a JSON-encoded string is unwrapped once;
/// absent args become `{}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Synthesize a fresh call id in the same style as the parser's
    /// generated ids (for salvage-path calls that have no id in the
    /// original model text).
    pub fn generated_id(prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// How a file tool changed its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
    Write,
    Edit,
    Patch,
}

/// Execution record for a single `ToolCall`. Output and error are
/// always truncated to a configured maximum with a tail-preserving
/// marker before this struct is constructed (see `tools::truncate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: true,
            output: output.into(),
            error: None,
            duration_ms,
            file_path: None,
            change_type: None,
            old_content: None,
            new_content: None,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: false,
            output: String::new(),
            error: Some(error.into()),
            duration_ms,
            file_path: None,
            change_type: None,
            old_content: None,
            new_content: None,
        }
    }

    pub fn with_file_change(
        mut self,
        path: impl Into<String>,
        change_type: ChangeType,
        old_content: Option<String>,
        new_content: Option<String>,
    ) -> Self {
        self.file_path = Some(path.into());
        self.change_type = Some(change_type);
        self.old_content = old_content;
        self.new_content = new_content;
        self
    }

    /// Renders the tool-result JSON envelope used as the body of the
    /// "Tool result for <name>:" user message
    /// the loop appends after each tool execution.
    pub fn to_envelope_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

/// Accumulated token usage, kept purely for observability — the model
/// provider boundary is external, but callers still want a running
/// total across iterations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn accumulate(&mut self, delta: &Usage) {
        self.prompt_tokens += delta.prompt_tokens;
        self.completion_tokens += delta.completion_tokens;
        self.total_tokens += delta.total_tokens;
    }
}

/// The full, opportunistically-persisted state of one agent run.
/// Persisted to `<state_dir>/<task_id>.json` each iteration; final
/// state includes redacted outputs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub task_id: Uuid,
    pub task: String,
    pub iteration: u32,
    pub max_loops: u32,
    pub messages: Vec<Message>,
    pub results: Vec<ToolResult>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl AgentState {
    pub fn new(task: &Task, max_loops: u32) -> Self {
        Self {
            task_id: task.id,
            task: task.instruction.clone(),
            iteration: 0,
            max_loops,
            messages: Vec::new(),
            results: Vec::new(),
            completed: false,
            final_output: None,
            started_at: task.started_at,
            ended_at: None,
        }
    }
}

/// Fixed registry entry describing a callable tool, exposed to the
/// model as JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Options passed through to the model provider for one completion
/// call. The provider boundary is external; this struct is the thin
/// shared shape both the loop and the provider agree on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_envelope_includes_file_change_fields() {
        let r = ToolResult::success("call-1", "ok", 12)
            .with_file_change("a.txt", ChangeType::Create, None, Some("hi".into()));
        let json = r.to_envelope_json();
        assert_eq!(json["tool_call_id"], "call-1");
        assert_eq!(json["success"], true);
        assert_eq!(json["change_type"], "create");
        assert_eq!(json["new_content"], "hi");
    }

    #[test]
    fn agent_state_starts_uncompleted() {
        let task = Task::new("do nothing");
        let state = AgentState::new(&task, 20);
        assert!(!state.completed);
        assert_eq!(state.iteration, 0);
    }

    #[test]
    fn role_serializes_lowercase() {
        let m = Message::system("hi");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["role"], "system");
    }
}
