//! `read_file` tool — returns at most 64 KiB; binary files are
//! detected via NUL bytes and rendered as a hex preview of the first
//! 128 bytes; truncation is annotated.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{require_str, RawToolResult, Tool};
use crate::error::Result;
use crate::pathres::PathResolver;

const MAX_READ_BYTES: usize = 64 * 1024;
const HEX_PREVIEW_BYTES: usize = 128;

pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file, up to 64 KiB. Binary files are shown as a hex preview."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path to the file to read"}
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

        let bytes = match tokio::fs::read(&abs).await {
            Ok(b) => b,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to read file: {e}"))),
        };

        if bytes.iter().take(8192).any(|b| *b == 0) {
            let preview_len = bytes.len().min(HEX_PREVIEW_BYTES);
            let hex = bytes[..preview_len]
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ");
            let mut out = format!("[binary file, {} bytes, hex preview of first {} bytes]\n{hex}", bytes.len(), preview_len);
            if bytes.len() > preview_len {
                out.push_str(&format!("\n[truncated: {} -> {} bytes]", bytes.len(), preview_len));
            }
            return Ok(RawToolResult::ok(out));
        }

        let text = String::from_utf8_lossy(&bytes).to_string();
        if text.len() <= MAX_READ_BYTES {
            Ok(RawToolResult::ok(text))
        } else {
            let truncated = &text[..floor_char_boundary(&text, MAX_READ_BYTES)];
            Ok(RawToolResult::ok(format!(
                "{truncated}\n[truncated: {} -> {} bytes]",
                text.len(),
                MAX_READ_BYTES
            )))
        }
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_small_text_file_verbatim() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "hello").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = ReadFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "a.txt"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn binary_file_is_hex_previewed() {
        let dir = tempdir().unwrap();
        let mut bytes = vec![0u8; 10];
        bytes[0] = 0xff;
        tokio::fs::write(dir.path().join("b.bin"), &bytes).await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = ReadFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "b.bin"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("binary file"));
        assert!(result.output.contains("ff 00"));
    }

    #[tokio::test]
    async fn outside_root_is_denied() {
        let dir = tempdir().unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = ReadFileTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "../../etc/passwd"}))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
