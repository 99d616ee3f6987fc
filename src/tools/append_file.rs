//! `append_file` tool — creates parents; opens append-mode; creates the
//! file if missing.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use super::traits::{require_str, RawToolResult, Tool};
use crate::agent::types::ChangeType;
use crate::error::Result;
use crate::pathres::PathResolver;

const DIFF_CONTENT_CAP: usize = 32 * 1024;

pub struct AppendFileTool;

impl AppendFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AppendFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for AppendFileTool {
    fn name(&self) -> &str {
        "append_file"
    }

    fn description(&self) -> &str {
        "Append content to a file, creating it if it doesn't exist"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let path = require_str(&args, "path")?;
        let content = require_str(&args, "content")?;

        let abs = resolver.resolve(path);
        if resolver.is_outside_root(&abs) {
            return Ok(RawToolResult::err("Access denied: path outside working root"));
        }

        let old_content = tokio::fs::read_to_string(&abs).await.ok();

        if let Some(parent) = abs.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(RawToolResult::err(format!("Failed to create directories: {e}")));
            }
        }

        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&abs).await;
        let mut file = match file {
            Ok(f) => f,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to open file: {e}"))),
        };

        if let Err(e) = file.write_all(content.as_bytes()).await {
            return Ok(RawToolResult::err(format!("Failed to append to file: {e}")));
        }

        let cap = |s: &str| s.chars().take(DIFF_CONTENT_CAP).collect::<String>();
        let new_content = format!("{}{}", old_content.clone().unwrap_or_default(), content);

        Ok(RawToolResult::ok(format!("Appended {} bytes to {}", content.len(), path)).with_file_change(
            path,
            ChangeType::Modify,
            old_content.map(|c| cap(&c)),
            Some(cap(&new_content)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn appends_to_existing_file() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("log.txt"), "line1\n").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = AppendFileTool::new();
        tool.execute(&resolver, serde_json::json!({"path": "log.txt", "content": "line2\n"}))
            .await
            .unwrap();
        let contents = tokio::fs::read_to_string(dir.path().join("log.txt")).await.unwrap();
        assert_eq!(contents, "line1\nline2\n");
    }

    #[tokio::test]
    async fn creates_missing_file() {
        let dir = tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = AppendFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "new.txt", "content": "first"}))
            .await
            .unwrap();
        assert!(result.success);
        let contents = tokio::fs::read_to_string(dir.path().join("new.txt")).await.unwrap();
        assert_eq!(contents, "first");
    }
}
