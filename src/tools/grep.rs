//! `grep` tool — delegates to the system `grep` binary. Exit code 1
//! (no matches) is treated as a successful empty result, not a failure;
//! any other nonzero exit is reported as an error.

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::traits::{optional_str, require_str, RawToolResult, Tool};
use crate::error::Result;
use crate::pathres::PathResolver;

pub struct GrepTool;

impl GrepTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrepTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search for a pattern in files under a directory, recursively"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string", "description": "Directory or file to search (defaults to root)"},
                "recursive": {"type": "boolean", "description": "Recurse into subdirectories (default true)"}
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let pattern = require_str(&args, "pattern")?;
        let path = optional_str(&args, "path").unwrap_or(".");
        let recursive = super::traits::optional_bool(&args, "recursive").unwrap_or(true);

        let abs = resolver.resolve(path);
        if resolver.is_outside_root(&abs) {
            return Ok(RawToolResult::err("Access denied: path outside working root"));
        }

        let mut cmd = Command::new("grep");
        cmd.arg("-n");
        if recursive {
            cmd.arg("-r");
        }
        cmd.arg("--").arg(pattern).arg(&abs);
        let output = cmd.output().await;

        match output {
            Ok(out) => {
                let stdout = String::from_utf8_lossy(&out.stdout).to_string();
                let stderr = String::from_utf8_lossy(&out.stderr).to_string();
                match out.status.code() {
                    Some(0) | Some(1) => Ok(RawToolResult::ok(stdout)),
                    _ => Ok(RawToolResult::err(if stderr.is_empty() {
                        "grep failed".to_string()
                    } else {
                        stderr
                    })),
                }
            }
            Err(e) => Ok(RawToolResult::err(format!("Failed to run grep: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finds_matching_lines() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "hello world\nfoo bar\n").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = GrepTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"pattern": "hello", "path": "."}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("hello world"));
    }

    #[tokio::test]
    async fn no_matches_is_still_success() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "nothing here\n").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = GrepTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"pattern": "zzz_no_match", "path": "."}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "");
    }
}
