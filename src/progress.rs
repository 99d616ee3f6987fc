//! Progress Emitter — a thin publish-only surface for structured
//! observability events, one per tick of the loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::types::ChangeType;
use crate::redact::Redactor;

/// Status of a tool invocation as observed by the progress stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Completed,
    Error,
}

/// Discriminates the shape of a `ProgressEvent`. Field names match the
/// stable JSON list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Thinking,
    Reasoning,
    Warn,
    Error,
    Tool,
    ToolOutput,
    FileEdit,
    PermissionRequest,
}

/// One structured observability event. Every text field must already
/// be redacted before construction — callers go through
/// `ProgressSink::emit`, never build-and-forget a raw string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_status: Option<ToolStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            text: None,
            tool: None,
            tool_call_id: None,
            tool_status: None,
            path: None,
            command: None,
            change_type: None,
            old_content: None,
            new_content: None,
            duration_ms: None,
            error: None,
            at: Utc::now(),
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self::new(EventKind::Thinking).text(text)
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::new(EventKind::Reasoning).text(text)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(EventKind::Warn).text(text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(EventKind::Error).text(text)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tool_named(mut self, name: impl Into<String>, call_id: impl Into<String>, status: ToolStatus) -> Self {
        self.kind = EventKind::Tool;
        self.tool = Some(name.into());
        self.tool_call_id = Some(call_id.into());
        self.tool_status = Some(status);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Redact every outbound text-bearing field. Must be called before
    /// the event reaches a sink,.
    pub fn redacted(mut self, redactor: &Redactor) -> Self {
        self.text = redactor.redact_opt(self.text.as_deref());
        self.command = redactor.redact_opt(self.command.as_deref());
        self.path = redactor.redact_opt(self.path.as_deref());
        self.error = redactor.redact_opt(self.error.as_deref());
        self.old_content = redactor.redact_opt(self.old_content.as_deref());
        self.new_content = redactor.redact_opt(self.new_content.as_deref());
        self
    }
}

/// Publish-only sink for progress events. Implementations must not
/// block the loop indefinitely; a slow consumer should buffer or drop,
/// never stall a tool execution.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

/// Default sink: turns each event into a structured `tracing` record.
pub struct TracingSink;

#[async_trait]
impl ProgressSink for TracingSink {
    async fn emit(&self, event: ProgressEvent) {
        tracing::info!(
            kind = ?event.kind,
            text = event.text.as_deref(),
            tool = event.tool.as_deref(),
            tool_status = ?event.tool_status,
            path = event.path.as_deref(),
            "progress event"
        );
    }
}

/// Channel-backed sink for a CLI/TUI consumer.
pub struct ChannelSink {
    sender: tokio::sync::mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_event_strips_secret_from_every_text_field() {
        let redactor = Redactor::new(["sk-secret"]);
        let event = ProgressEvent::error("leaked sk-secret here")
            .with_command("echo sk-secret")
            .redacted(&redactor);
        assert_eq!(event.text.unwrap(), "leaked [REDACTED] here");
        assert_eq!(event.command.unwrap(), "echo [REDACTED]");
    }

    #[tokio::test]
    async fn channel_sink_delivers_events() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(ProgressEvent::thinking("planning")).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.text.unwrap(), "planning");
    }
}
