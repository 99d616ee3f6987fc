//! Tool Engine — executes a single ToolCall: enforces a tool-specific
//! timeout (overridable by argument), bounds output, records duration,
//! and observes file changes for write/edit/append/patch tools.

use std::time::{Duration, Instant};

use crate::agent::types::{ChangeType, ToolCall, ToolResult};
use crate::error::Result;
use crate::pathres::PathResolver;
use crate::progress::{EventKind, ProgressEvent, ProgressSink};
use crate::redact::Redactor;

use super::registry::ToolRegistry;
use super::traits::RawToolResult;
use super::truncate::{truncate_tail, DEFAULT_MAX_OUTPUT_BYTES};

const FILE_TOOLS_WITH_CHANGE_OBSERVATION: &[&str] = &["write_file", "edit_file", "append_file", "patch_file"];
const OLD_CONTENT_PREVIEW_CAP: usize = 32 * 1024;

pub struct ToolEngine {
    registry: ToolRegistry,
    resolver: PathResolver,
    redactor: Redactor,
    max_output_bytes: usize,
}

impl ToolEngine {
    pub fn new(registry: ToolRegistry, resolver: PathResolver, redactor: Redactor) -> Self {
        Self {
            registry,
            resolver,
            redactor,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// True if `name` is not in the configured registry ("Tool unknown"
    /// row of the error taxonomy).
    pub fn is_unknown(&self, name: &str) -> bool {
        !self.registry.contains(name)
    }

    /// Execute `call`, returning a fully-formed `ToolResult` with
    /// truncation, timing, and redaction already applied. Unknown tool
    /// names produce a synthetic failed result rather than an `Err` —
    /// the engine never breaks the loop on a bad tool name.
    pub async fn execute(&self, call: &ToolCall, sink: &dyn ProgressSink) -> ToolResult {
        let start = Instant::now();

        sink.emit(
            ProgressEvent::new(EventKind::Tool)
                .tool_named(call.name.clone(), call.id.clone(), crate::progress::ToolStatus::Pending)
                .redacted(&self.redactor),
        )
        .await;

        let Some(tool) = self.registry.get(&call.name) else {
            let result = ToolResult::failure(
                call.id.clone(),
                format!("Unknown tool: {}", call.name),
                start.elapsed().as_millis() as u64,
            );
            self.emit_completion(&call.id, &call.name, &result, sink).await;
            return result;
        };

        let timeout = call_timeout(&call.arguments).unwrap_or_else(|| tool.default_timeout());
        let old_content = self.capture_old_content(call).await;

        let outcome = tokio::time::timeout(timeout, tool.execute(&self.resolver, call.arguments.clone())).await;

        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(raw)) => self.finalize(call, raw, old_content, duration_ms),
            Ok(Err(e)) => ToolResult::failure(call.id.clone(), e.to_string(), duration_ms),
            Err(_) => ToolResult::failure(
                call.id.clone(),
                format!("Tool '{}' timed out after {:?}", call.name, timeout),
                duration_ms,
            ),
        };

        self.emit_completion(&call.id, &call.name, &result, sink).await;

        if let Some(change_type) = result.change_type {
            sink.emit(
                ProgressEvent::new(EventKind::FileEdit)
                    .with_path(result.file_path.clone().unwrap_or_default())
                    .redacted(&self.redactor)
                    .and_change(change_type, result.old_content.clone(), result.new_content.clone()),
            )
            .await;
        }

        result
    }

    async fn capture_old_content(&self, call: &ToolCall) -> Option<String> {
        if !FILE_TOOLS_WITH_CHANGE_OBSERVATION.contains(&call.name.as_str()) {
            return None;
        }
        let path = call.arguments.get("path").and_then(|v| v.as_str())?;
        let abs = self.resolver.resolve(path);
        match tokio::fs::read(&abs).await {
            Ok(bytes) if bytes.len() <= OLD_CONTENT_PREVIEW_CAP => {
                String::from_utf8(bytes).ok()
            }
            _ => None,
        }
    }

    fn finalize(
        &self,
        call: &ToolCall,
        raw: RawToolResult,
        old_content: Option<String>,
        duration_ms: u64,
    ) -> ToolResult {
        let output = truncate_tail(&self.redactor.redact(&raw.output), self.max_output_bytes);
        let error = raw
            .error
            .as_deref()
            .map(|e| truncate_tail(&self.redactor.redact(e), self.max_output_bytes));

        let mut result = ToolResult {
            tool_call_id: call.id.clone(),
            success: raw.success,
            output,
            error,
            duration_ms,
            file_path: raw.file_path,
            change_type: raw.change_type,
            old_content: raw.old_content.or(old_content).map(|c| self.redactor.redact(&c)),
            new_content: raw.new_content.map(|c| self.redactor.redact(&c)),
        };

        if result.change_type.is_none() && FILE_TOOLS_WITH_CHANGE_OBSERVATION.contains(&call.name.as_str()) && result.success {
            result.change_type = Some(default_change_type(&call.name));
        }

        result
    }

    async fn emit_completion(&self, call_id: &str, tool_name: &str, result: &ToolResult, sink: &dyn ProgressSink) {
        let status = if result.success {
            crate::progress::ToolStatus::Completed
        } else {
            crate::progress::ToolStatus::Error
        };
        sink.emit(
            ProgressEvent::new(EventKind::ToolOutput)
                .tool_named(tool_name.to_string(), call_id.to_string(), status)
                .text(preview(&result.output))
                .with_duration(result.duration_ms)
                .redacted(&self.redactor),
        )
        .await;
    }
}

fn default_change_type(tool_name: &str) -> ChangeType {
    match tool_name {
        "write_file" => ChangeType::Write,
        "edit_file" => ChangeType::Edit,
        "append_file" => ChangeType::Modify,
        "patch_file" => ChangeType::Patch,
        _ => ChangeType::Modify,
    }
}

fn call_timeout(args: &serde_json::Value) -> Option<Duration> {
    args.get("timeout_s").and_then(|v| v.as_u64()).map(Duration::from_secs)
}

/// Head/tail preview for `tool_output` progress events, middle elided.
fn preview(text: &str) -> String {
    const HEAD_LINES: usize = 10;
    const TAIL_LINES: usize = 10;
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= HEAD_LINES + TAIL_LINES {
        return text.to_string();
    }
    let head = lines[..HEAD_LINES].join("\n");
    let tail = lines[lines.len() - TAIL_LINES..].join("\n");
    let elided = lines.len() - HEAD_LINES - TAIL_LINES;
    format!("{head}\n… +{elided} lines\n{tail}")
}

impl ProgressEvent {
    fn and_change(mut self, change_type: ChangeType, old: Option<String>, new: Option<String>) -> Self {
        self.change_type = Some(change_type);
        self.old_content = old;
        self.new_content = new;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::TracingSink;
    use crate::tools::canonical_registry;

    #[tokio::test]
    async fn unknown_tool_name_yields_synthetic_failure() {
        let registry = canonical_registry(std::path::PathBuf::from("/tmp"));
        let resolver = PathResolver::new("/tmp");
        let engine = ToolEngine::new(registry, resolver, Redactor::default());
        let call = ToolCall::new("1", "nonexistent_tool", serde_json::json!({}));
        let result = engine.execute(&call, &TracingSink).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown tool"));
    }

    #[test]
    fn preview_elides_middle_of_long_output() {
        let text: String = (0..40).map(|i| format!("line{i}\n")).collect();
        let out = preview(&text);
        assert!(out.contains("… +20 lines"));
    }
}
