//! `edit_file` tool — performs exactly one substitution of the first
//! occurrence of `old_text`. Fails if `old_text` is not found.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{require_str, RawToolResult, Tool};
use crate::agent::types::ChangeType;
use crate::error::Result;
use crate::pathres::PathResolver;

const DIFF_CONTENT_CAP: usize = 32 * 1024;

pub struct EditFileTool;

impl EditFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EditFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Replace the first occurrence of old_text with new_text in a file"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "old_text": {"type": "string"},
                "new_text": {"type": "string"}
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let path = require_str(&args, "path")?;
        let old_text = require_str(&args, "old_text")?;
        let new_text = require_str(&args, "new_text")?;

        let abs = resolver.resolve(path);
        if resolver.is_outside_root(&abs) {
            return Ok(RawToolResult::err("Access denied: path outside working root"));
        }

        let original = match tokio::fs::read_to_string(&abs).await {
            Ok(c) => c,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to read file: {e}"))),
        };

        let Some(pos) = original.find(old_text) else {
            return Ok(RawToolResult::err("old_text not found in file"));
        };

        let mut updated = String::with_capacity(original.len());
        updated.push_str(&original[..pos]);
        updated.push_str(new_text);
        updated.push_str(&original[pos + old_text.len()..]);

        if let Err(e) = tokio::fs::write(&abs, &updated).await {
            return Ok(RawToolResult::err(format!("Failed to write file: {e}")));
        }

        let cap = |s: &str| s.chars().take(DIFF_CONTENT_CAP).collect::<String>();

        Ok(RawToolResult::ok(format!("Edited {path}"))
            .with_file_change(path, ChangeType::Edit, Some(cap(&original)), Some(cap(&updated))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn replaces_first_occurrence_only() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), "foo foo foo").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = EditFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "f.txt", "old_text": "foo", "new_text": "bar"}))
            .await
            .unwrap();
        assert!(result.success);
        let contents = tokio::fs::read_to_string(dir.path().join("f.txt")).await.unwrap();
        assert_eq!(contents, "bar foo foo");
    }

    #[tokio::test]
    async fn missing_old_text_fails() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), "hello").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = EditFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "f.txt", "old_text": "nope", "new_text": "x"}))
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn edit_then_inverse_edit_restores_original() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), "alpha beta").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = EditFileTool::new();
        tool.execute(&resolver, serde_json::json!({"path": "f.txt", "old_text": "alpha", "new_text": "gamma"}))
            .await
            .unwrap();
        tool.execute(&resolver, serde_json::json!({"path": "f.txt", "old_text": "gamma", "new_text": "alpha"}))
            .await
            .unwrap();
        let contents = tokio::fs::read_to_string(dir.path().join("f.txt")).await.unwrap();
        assert_eq!(contents, "alpha beta");
    }
}
