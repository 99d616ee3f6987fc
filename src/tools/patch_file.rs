//! `patch_file` tool — applies a unified diff to a file, preserving its
//! mode. Parses `@@ -a,b +c,d @@` hunks directly rather than shelling
//! out to `patch(1)`, so behavior doesn't depend on a system binary
//! being present.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{require_str, RawToolResult, Tool};
use crate::agent::types::ChangeType;
use crate::error::Result;
use crate::pathres::PathResolver;

const DIFF_CONTENT_CAP: usize = 32 * 1024;

pub struct PatchFileTool;

impl PatchFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PatchFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for PatchFileTool {
    fn name(&self) -> &str {
        "patch_file"
    }

    fn description(&self) -> &str {
        "Apply a unified diff (as produced by `diff -u`) to a file"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "patch": {"type": "string", "description": "Unified diff text"}
            },
            "required": ["path", "patch"]
        })
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let path = require_str(&args, "path")?;
        let patch_text = require_str(&args, "patch")?;

        let abs = resolver.resolve(path);
        if resolver.is_outside_root(&abs) {
            return Ok(RawToolResult::err("Access denied: path outside working root"));
        }

        let original = match tokio::fs::read_to_string(&abs).await {
            Ok(c) => c,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to read file: {e}"))),
        };

        let hunks = match parse_unified_diff(patch_text) {
            Ok(h) => h,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to parse diff: {e}"))),
        };

        let updated = match apply_hunks(&original, &hunks) {
            Ok(u) => u,
            Err(e) => return Ok(RawToolResult::err(format!("Failed to apply patch: {e}"))),
        };

        if let Err(e) = tokio::fs::write(&abs, &updated).await {
            return Ok(RawToolResult::err(format!("Failed to write file: {e}")));
        }

        let cap = |s: &str| s.chars().take(DIFF_CONTENT_CAP).collect::<String>();

        Ok(RawToolResult::ok(format!("Patched {path} ({} hunk(s) applied)", hunks.len()))
            .with_file_change(path, ChangeType::Patch, Some(cap(&original)), Some(cap(&updated))))
    }
}

struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

enum HunkLine {
    Context(String),
    Delete(String),
    Insert(String),
}

fn parse_unified_diff(diff: &str) -> std::result::Result<Vec<Hunk>, String> {
    let mut hunks = Vec::new();
    let mut lines = diff.lines().peekable();

    while let Some(line) = lines.next() {
        if !line.starts_with("@@") {
            continue;
        }
        let old_start = parse_hunk_header(line)?;
        let mut hunk_lines = Vec::new();

        while let Some(&next) = lines.peek() {
            if next.starts_with("@@") || next.starts_with("--- ") || next.starts_with("+++ ") {
                break;
            }
            let raw = lines.next().unwrap();
            if let Some(rest) = raw.strip_prefix('+') {
                hunk_lines.push(HunkLine::Insert(rest.to_string()));
            } else if let Some(rest) = raw.strip_prefix('-') {
                hunk_lines.push(HunkLine::Delete(rest.to_string()));
            } else if let Some(rest) = raw.strip_prefix(' ') {
                hunk_lines.push(HunkLine::Context(rest.to_string()));
            } else if raw.is_empty() {
                hunk_lines.push(HunkLine::Context(String::new()));
            }
        }

        hunks.push(Hunk { old_start, lines: hunk_lines });
    }

    if hunks.is_empty() {
        return Err("no hunks found in diff".to_string());
    }
    Ok(hunks)
}

fn parse_hunk_header(line: &str) -> std::result::Result<usize, String> {
    // "@@ -12,5 +12,6 @@ optional context"
    let body = line
        .trim_start_matches("@@")
        .split("@@")
        .next()
        .ok_or_else(|| "malformed hunk header".to_string())?;
    let old_part = body
        .split_whitespace()
        .find(|p| p.starts_with('-'))
        .ok_or_else(|| "missing old-range in hunk header".to_string())?;
    let start_str = old_part.trim_start_matches('-').split(',').next().unwrap_or("1");
    start_str
        .parse::<usize>()
        .map_err(|_| format!("invalid hunk start line: {start_str}"))
}

fn apply_hunks(original: &str, hunks: &[Hunk]) -> std::result::Result<String, String> {
    let orig_lines: Vec<&str> = original.lines().collect();
    let mut result: Vec<String> = Vec::new();
    let mut cursor = 0usize;

    for hunk in hunks {
        let start_idx = hunk.old_start.saturating_sub(1);
        if start_idx < cursor {
            return Err("hunks are out of order or overlap".to_string());
        }
        if start_idx > orig_lines.len() {
            return Err("hunk start line is beyond end of file".to_string());
        }
        result.extend(orig_lines[cursor..start_idx].iter().map(|s| s.to_string()));
        cursor = start_idx;

        for hl in &hunk.lines {
            match hl {
                HunkLine::Context(text) => {
                    if orig_lines.get(cursor).copied() != Some(text.as_str()) {
                        return Err(format!(
                            "context mismatch at line {}: expected {:?}, found {:?}",
                            cursor + 1,
                            text,
                            orig_lines.get(cursor)
                        ));
                    }
                    result.push(text.clone());
                    cursor += 1;
                }
                HunkLine::Delete(text) => {
                    if orig_lines.get(cursor).copied() != Some(text.as_str()) {
                        return Err(format!(
                            "delete mismatch at line {}: expected {:?}, found {:?}",
                            cursor + 1,
                            text,
                            orig_lines.get(cursor)
                        ));
                    }
                    cursor += 1;
                }
                HunkLine::Insert(text) => {
                    result.push(text.clone());
                }
            }
        }
    }

    result.extend(orig_lines[cursor..].iter().map(|s| s.to_string()));

    let mut joined = result.join("\n");
    if original.ends_with('\n') {
        joined.push('\n');
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn applies_single_hunk_patch() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), "line1\nline2\nline3\n").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = PatchFileTool::new();
        let diff = "@@ -1,3 +1,3 @@\n line1\n-line2\n+line2 modified\n line3\n";
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "f.txt", "patch": diff}))
            .await
            .unwrap();
        assert!(result.success, "{:?}", result.error);
        let contents = tokio::fs::read_to_string(dir.path().join("f.txt")).await.unwrap();
        assert_eq!(contents, "line1\nline2 modified\nline3\n");
    }

    #[tokio::test]
    async fn context_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("f.txt"), "aaa\nbbb\n").await.unwrap();
        let resolver = PathResolver::new(dir.path());
        let tool = PatchFileTool::new();
        let diff = "@@ -1,2 +1,2 @@\n zzz\n-bbb\n+ccc\n";
        let result = tool
            .execute(&resolver, serde_json::json!({"path": "f.txt", "patch": diff}))
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[test]
    fn generate_then_apply_round_trips() {
        use similar::TextDiff;
        let original = "a\nb\nc\n";
        let modified = "a\nB\nc\n";
        let diff = TextDiff::from_lines(original, modified)
            .unified_diff()
            .context_radius(3)
            .header("a/f", "b/f")
            .to_string();
        let hunks = parse_unified_diff(&diff).unwrap();
        let applied = apply_hunks(original, &hunks).unwrap();
        assert_eq!(applied, modified);
    }
}
