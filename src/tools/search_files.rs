//! `search_files` tool — delegates to the system `find` binary to
//! locate files by name pattern.

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::traits::{optional_str, require_str, RawToolResult, Tool};
use crate::error::Result;
use crate::pathres::PathResolver;

pub struct SearchFilesTool;

impl SearchFilesTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SearchFilesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Find files by name pattern under a directory, recursively"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Glob pattern, e.g. '*.rs'"},
                "path": {"type": "string", "description": "Directory to search (defaults to root)"}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let name = require_str(&args, "name")?;
        let path = optional_str(&args, "path").unwrap_or(".");

        let abs = resolver.resolve(path);
        if resolver.is_outside_root(&abs) {
            return Ok(RawToolResult::err("Access denied: path outside working root"));
        }

        let output = Command::new("find")
            .arg(&abs)
            .arg("-name")
            .arg(name)
            .arg("-type")
            .arg("f")
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                Ok(RawToolResult::ok(String::from_utf8_lossy(&out.stdout).to_string()))
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).to_string();
                Ok(RawToolResult::err(if stderr.is_empty() { "find failed".to_string() } else { stderr }))
            }
            Err(e) => Ok(RawToolResult::err(format!("Failed to run find: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finds_files_by_pattern() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("main.rs"), "").await.unwrap();
        tokio::fs::write(dir.path().join("README.md"), "").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = SearchFilesTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"name": "*.rs", "path": "."}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("main.rs"));
        assert!(!result.output.contains("README.md"));
    }
}
