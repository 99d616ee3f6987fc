//! `list_dir` tool — lists directory entries sorted by name, directories
//! suffixed with `/`, files annotated with their size in bytes. Capped
//! at 200 entries to keep prompt context bounded.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{require_str, RawToolResult, Tool};
use crate::error::Result;
use crate::pathres::PathResolver;

const MAX_ENTRIES: usize = 200;

pub struct ListDirTool;

impl ListDirTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ListDirTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the contents of a directory"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Directory to list"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let path = require_str(&args, "path")?;
        let abs = resolver.resolve(path);

        if resolver.is_outside_root(&abs) {
            return Ok(RawToolResult::err("Access denied: path outside working root"));
        }

        let mut read_dir = match tokio::fs::read_dir(&abs).await {
            Ok(rd) => rd,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to list directory: {e}"))),
        };

        let mut entries: Vec<(String, bool, u64)> = Vec::new();
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let meta = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            entries.push((name, meta.is_dir(), meta.len()));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let total = entries.len();
        let shown = entries.into_iter().take(MAX_ENTRIES);

        let mut out = String::new();
        for (name, is_dir, size) in shown {
            if is_dir {
                out.push_str(&format!("{name}/\n"));
            } else {
                out.push_str(&format!("{name}\t{size} bytes\n"));
            }
        }
        if total > MAX_ENTRIES {
            out.push_str(&format!("[{} more entries not shown]\n", total - MAX_ENTRIES));
        }
        if total == 0 {
            out.push_str("[empty directory]\n");
        }

        Ok(RawToolResult::ok(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn lists_files_and_dirs_sorted_with_suffix() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "hi").await.unwrap();
        tokio::fs::create_dir(dir.path().join("a_sub")).await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = ListDirTool::new();
        let result = tool.execute(&resolver, serde_json::json!({"path": "."})).await.unwrap();
        assert!(result.success);
        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines[0], "a_sub/");
        assert!(lines[1].starts_with("b.txt\t2 bytes"));
    }

    #[tokio::test]
    async fn empty_directory_is_annotated() {
        let dir = tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = ListDirTool::new();
        let result = tool.execute(&resolver, serde_json::json!({"path": "."})).await.unwrap();
        assert!(result.output.contains("empty directory"));
    }
}
