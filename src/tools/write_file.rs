//! `write_file` tool — creates parents; writes 0644. Records
//! `change_type` (create vs modify) and old/new contents, both capped
//! at 32 KiB for diff emission.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{require_str, RawToolResult, Tool};
use crate::agent::types::ChangeType;
use crate::error::Result;
use crate::pathres::PathResolver;

const DIFF_CONTENT_CAP: usize = 32 * 1024;

pub struct WriteFileTool;

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories and the file if needed"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path to the file to write"},
                "content": {"type": "string", "description": "Content to write"}
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

        let existed = tokio::fs::metadata(&abs).await.is_ok();
        let old_content = if existed {
            tokio::fs::read_to_string(&abs).await.ok()
        } else {
            None
        };

        if let Some(parent) = abs.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(RawToolResult::err(format!("Failed to create directories: {e}")));
            }
        }

        if let Err(e) = tokio::fs::write(&abs, content).await {
            return Ok(RawToolResult::err(format!("Failed to write file: {e}")));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = tokio::fs::metadata(&abs).await {
                let mut perms = meta.permissions();
                perms.set_mode(0o644);
                let _ = tokio::fs::set_permissions(&abs, perms).await;
            }
        }

        let change_type = if existed { ChangeType::Modify } else { ChangeType::Create };
        let cap = |s: &str| s.chars().take(DIFF_CONTENT_CAP).collect::<String>();

        Ok(RawToolResult::ok(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            path
        ))
        .with_file_change(
            path,
            change_type,
            old_content.map(|c| cap(&c)),
            Some(cap(content)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_creates_parents_and_reports_create() {
        let dir = tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = WriteFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "a/b/c.txt", "content": "hi"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.change_type, Some(ChangeType::Create));
        let written = tokio::fs::read_to_string(dir.path().join("a/b/c.txt")).await.unwrap();
        assert_eq!(written, "hi");
    }

    #[tokio::test]
    async fn overwriting_existing_file_reports_modify_with_old_content() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), "old").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = WriteFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "f.txt", "content": "new"}))
            .await
            .unwrap();
        assert_eq!(result.change_type, Some(ChangeType::Modify));
        assert_eq!(result.old_content.as_deref(), Some("old"));
        assert_eq!(result.new_content.as_deref(), Some("new"));
    }
}
