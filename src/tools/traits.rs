//! Core tool trait and the handler-facing result type.
//!
//! Timeouts and output truncation are
//! policy applied by the engine (`tools::engine::ToolEngine`), not by
//! individual handlers. A handler returns a `RawToolResult` describing
//! only what it actually did; the engine is responsible for turning
//! that into the transcript-facing `agent::types::ToolResult` (adding
//! `tool_call_id`, `duration_ms`, truncation, and redaction).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::agent::types::{ChangeType, ToolDefinition};
use crate::error::Result;
use crate::pathres::PathResolver;

/// What a tool handler produced, before the engine applies timing,
/// truncation, and redaction policy.
#[derive(Debug, Clone)]
pub struct RawToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub file_path: Option<String>,
    pub change_type: Option<ChangeType>,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
}

impl RawToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            file_path: None,
            change_type: None,
            old_content: None,
            new_content: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
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
}

/// A tool the agent loop can invoke. `resolver` carries the working
/// root so handlers never have to re-derive it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    /// Category-based default timeout, overridable per call by the
    /// engine when the caller supplies `timeout_s`.
    fn default_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Extract a required string argument, the shape every handler needs.
pub fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| crate::Error::InvalidInput(format!("Missing '{key}' parameter")))
}

pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

pub fn optional_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(|v| v.as_u64())
}

pub fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(|v| v.as_bool())
}
