//! The seven ordered parsing tactics. Each is a free function matching
//! the `Tactic` signature in `parser::mod`.

use serde_json::{Map, Value};

use crate::agent::types::ToolCall;

const KNOWN_TOOL_NAMES: &[&str] = &[
    "exec", "read_file", "write_file", "edit_file", "append_file",
    "patch_file", "list_dir", "grep", "search_files",
];

const LANG_EXTENSIONS: &[(&str, &[&str])] = &[
    ("python", &[".py"]),
    ("py", &[".py"]),
    ("rust", &[".rs"]),
    ("rs", &[".rs"]),
    ("html", &[".html", ".htm"]),
    ("javascript", &[".js"]),
    ("js", &[".js"]),
    ("typescript", &[".ts"]),
    ("ts", &[".ts"]),
    ("json", &[".json"]),
    ("yaml", &[".yml", ".yaml"]),
    ("yml", &[".yml", ".yaml"]),
    ("toml", &[".toml"]),
    ("css", &[".css"]),
    ("bash", &[".sh"]),
    ("sh", &[".sh"]),
    ("markdown", &[".md"]),
    ("md", &[".md"]),
];

const COMMAND_PREFIXES: &[&str] = &["go build", "go test", "go run", "ls ", "echo ", "cat ", "pwd", "npm ", "cargo "];

/// 1. Parse the whole text as a JSON object, accepting any known shape.
pub fn whole_text_json(text: &str) -> Option<Vec<ToolCall>> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    try_json_shapes(&value)
}

/// 2. Extract ```json ... ``` fenced blocks and retry tactic 1 on each.
pub fn fenced_json_blocks(text: &str) -> Option<Vec<ToolCall>> {
    for block in fenced_blocks(text, Some("json")) {
        if let Some(calls) = whole_text_json(&block) {
            return Some(calls);
        }
    }
    None
}

/// 3. Extract ```<lang> ... ``` blocks; if preceded by a named output
/// path whose extension matches the block's language, synthesize a
/// `write_file` call.
pub fn fenced_code_block_as_write_file(text: &str) -> Option<Vec<ToolCall>> {
    let bytes = text.as_bytes();
    let mut idx = 0;
    while let Some(start) = text[idx..].find("```") {
        let fence_start = idx + start;
        let after_fence = fence_start + 3;
        let line_end = text[after_fence..].find('\n').map(|p| after_fence + p)?;
        let lang = text[after_fence..line_end].trim().to_lowercase();

        let body_start = line_end + 1;
        let Some(close_rel) = text[body_start..].find("```") else {
            break;
        };
        let body_end = body_start + close_rel;
        let body = &text[body_start..body_end];

        if !lang.is_empty() {
            let preceding = &text[..fence_start];
            if let Some(path) = extract_preceding_output_path(preceding, &lang) {
                let mut args = Map::new();
                args.insert("path".to_string(), Value::String(path));
                args.insert("content".to_string(), Value::String(body.trim_end_matches('\n').to_string()));
                return Some(vec![ToolCall::new(
                    ToolCall::generated_id("synth"),
                    "write_file",
                    Value::Object(args),
                )]);
            }
        }

        idx = body_end + 3;
        if idx >= bytes.len() {
            break;
        }
    }
    None
}

/// 4. Parse `{tool => "name", args => { --flag "value" … } }` shell-style hash syntax.
pub fn shell_style_hash(text: &str) -> Option<Vec<ToolCall>> {
    let tool_pos = text.find("tool")?;
    let after_tool = &text[tool_pos + 4..];
    let arrow_pos = after_tool.find("=>")?;
    let after_arrow = after_tool[arrow_pos + 2..].trim_start();
    let name = extract_quoted_or_bare(after_arrow)?;

    let args_pos = text.find("args")?;
    let after_args = &text[args_pos + 4..];
    let arrow2 = after_args.find("=>")?;
    let rest = after_args[arrow2 + 2..].trim_start();
    let brace_open = rest.find('{')?;
    let brace_close = find_matching_brace(rest, brace_open)?;
    let inner = &rest[brace_open + 1..brace_close];

    let args = parse_flag_value_pairs(inner);

    Some(vec![ToolCall::new(ToolCall::generated_id("synth"), name, Value::Object(args))])
}

/// 5. Parse `[TOOL_CALL] … [/TOOL_CALL]` / `[tool_calls] … [/tool_calls]`
/// wrappers, converting `=>` to `:` first.
pub fn bracket_tool_call_wrapper(text: &str) -> Option<Vec<ToolCall>> {
    for (open, close) in [("[TOOL_CALL]", "[/TOOL_CALL]"), ("[tool_calls]", "[/tool_calls]")] {
        if let Some(start) = text.find(open) {
            let body_start = start + open.len();
            if let Some(end) = text[body_start..].find(close) {
                let inner = &text[body_start..body_start + end];
                let converted = inner.replace("=>", ":");
                if let Some(calls) = whole_text_json(&converted) {
                    return Some(calls);
                }
            }
        }
    }
    None
}

/// 6. Find a balanced `{ … }` substring containing `"tool"` or
/// `"tool_calls"` and retry tactic 1 on it.
pub fn balanced_brace_substring(text: &str) -> Option<Vec<ToolCall>> {
    let mut search_from = 0;
    while let Some(rel_start) = text[search_from..].find('{') {
        let start = search_from + rel_start;
        if let Some(end) = find_matching_brace(text, start) {
            let candidate = &text[start..=end];
            if candidate.contains("\"tool\"") || candidate.contains("\"tool_calls\"") {
                if let Some(calls) = whole_text_json(candidate) {
                    return Some(calls);
                }
            }
            search_from = start + 1;
        } else {
            break;
        }
    }
    None
}

/// 7. Surface-form heuristics: recognize common command prefixes or
/// "run/execute the command …" patterns; emit a single `exec` call.
pub fn surface_form_heuristics(text: &str) -> Option<Vec<ToolCall>> {
    if let Some(cmd) = extract_run_command_phrase(text) {
        return Some(vec![exec_call(&cmd)]);
    }

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(cmd) = extract_backtick_command(trimmed) {
            if COMMAND_PREFIXES.iter().any(|p| cmd.starts_with(p)) {
                return Some(vec![exec_call(&cmd)]);
            }
        }
        if COMMAND_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            return Some(vec![exec_call(trimmed)]);
        }
    }
    None
}

fn exec_call(command: &str) -> ToolCall {
    let mut args = Map::new();
    args.insert("command".to_string(), Value::String(command.to_string()));
    ToolCall::new(ToolCall::generated_id("synth"), "exec", Value::Object(args))
}

fn extract_run_command_phrase(text: &str) -> Option<String> {
    for marker in ["run the command", "execute the command", "run the following command"] {
        if let Some(pos) = text.to_lowercase().find(marker) {
            let rest = &text[pos + marker.len()..];
            if let Some(cmd) = extract_backtick_command(rest.trim_start_matches(':').trim()) {
                return Some(cmd);
            }
            let line = rest.lines().next().unwrap_or("").trim().trim_start_matches(':').trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }
    None
}

fn extract_backtick_command(text: &str) -> Option<String> {
    let rest = text.trim_start_matches(|c: char| !c.is_ascii() || c == ' ' || c == '\t');
    let start = rest.find('`')?;
    let after = &rest[start + 1..];
    let end = after.find('`')?;
    Some(after[..end].to_string())
}

/// Apply the JSON-shape rules from tactic 1 to an already-parsed value.
fn try_json_shapes(value: &Value) -> Option<Vec<ToolCall>> {
    let obj = value.as_object()?;

    // {tool: name, args: {...}} or {tool: name, ...siblings}
    if let Some(Value::String(name)) = obj.get("tool") {
        let args = if let Some(args) = obj.get("args").or_else(|| obj.get("arguments")) {
            args.clone()
        } else {
            let mut siblings = Map::new();
            for (k, v) in obj {
                if k != "tool" {
                    siblings.insert(k.clone(), v.clone());
                }
            }
            Value::Object(siblings)
        };
        return Some(vec![ToolCall::new(ToolCall::generated_id("synth"), name, args)]);
    }

    // {tool_calls: [ {id?, name|function.name, arguments|args} … ]}
    if let Some(Value::Array(entries)) = obj.get("tool_calls") {
        let mut calls = Vec::new();
        for entry in entries {
            let Some(entry_obj) = entry.as_object() else { continue };
            let name = entry_obj
                .get("name")
                .and_then(|v| v.as_str())
                .or_else(|| entry_obj.get("function").and_then(|f| f.get("name")).and_then(|v| v.as_str()));
            let Some(name) = name else { continue };
            let args = entry_obj
                .get("arguments")
                .or_else(|| entry_obj.get("args"))
                .or_else(|| entry_obj.get("function").and_then(|f| f.get("arguments")))
                .cloned()
                .unwrap_or(Value::Object(Map::new()));
            let id = entry_obj
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| ToolCall::generated_id("synth"));
            calls.push(ToolCall::new(id, name, args));
        }
        if !calls.is_empty() {
            return Some(calls);
        }
    }

    // {name, arguments} / {name, args}
    if let Some(Value::String(name)) = obj.get("name") {
        if let Some(args) = obj.get("arguments").or_else(|| obj.get("args")) {
            return Some(vec![ToolCall::new(ToolCall::generated_id("synth"), name, args.clone())]);
        }
    }

    // {<known-tool-name>: {...}}
    for name in KNOWN_TOOL_NAMES {
        if let Some(args) = obj.get(*name) {
            return Some(vec![ToolCall::new(ToolCall::generated_id("synth"), *name, args.clone())]);
        }
    }

    None
}

fn fenced_blocks(text: &str, lang_filter: Option<&str>) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut idx = 0;
    while let Some(rel) = text[idx..].find("```") {
        let fence_start = idx + rel;
        let after_fence = fence_start + 3;
        let Some(line_end) = text[after_fence..].find('\n').map(|p| after_fence + p) else { break };
        let lang = text[after_fence..line_end].trim().to_lowercase();
        let body_start = line_end + 1;
        let Some(close_rel) = text[body_start..].find("```") else { break };
        let body_end = body_start + close_rel;

        if lang_filter.map(|f| lang == f).unwrap_or(true) {
            blocks.push(text[body_start..body_end].to_string());
        }
        idx = body_end + 3;
        if idx >= text.len() {
            break;
        }
    }
    blocks
}

fn extract_preceding_output_path(preceding: &str, lang: &str) -> Option<String> {
    let extensions = LANG_EXTENSIONS.iter().find(|(l, _)| *l == lang)?.1;
    let tail = preceding.lines().rev().take(3).collect::<Vec<_>>().join(" ");
    for token in tail.split(|c: char| c.is_whitespace() || c == '`' || c == '\'' || c == '"') {
        if extensions.iter().any(|ext| token.ends_with(ext)) {
            return Some(token.trim_matches(|c| c == '(' || c == ')' || c == ':' || c == ',').to_string());
        }
    }
    None
}

fn extract_quoted_or_bare(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('"') {
        let end = rest.find('"')?;
        Some(&rest[..end])
    } else {
        let end = trimmed.find(|c: char| c == ',' || c == '}' || c.is_whitespace())?;
        Some(&trimmed[..end])
    }
}

fn find_matching_brace(text: &str, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, &b) in bytes.iter().enumerate().skip(open_idx) {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse `--flag "value"` / `--flag value` pairs from shell-style hash
/// args into a JSON object.
fn parse_flag_value_pairs(inner: &str) -> Map<String, Value> {
    let mut map = Map::new();
    let mut chars = inner.trim().split("--").filter(|s| !s.trim().is_empty());
    for part in &mut chars {
        let part = part.trim();
        let Some(space) = part.find(char::is_whitespace) else {
            map.insert(part.to_string(), Value::Bool(true));
            continue;
        };
        let flag = &part[..space];
        let value = part[space..].trim().trim_matches('"').trim_matches('\'');
        map.insert(flag.to_string(), Value::String(value.to_string()));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_calls_array_shape() {
        let text = r#"{"tool_calls":[{"id":"1","function":{"name":"exec","arguments":"{\"command\":\"ls\"}"}}]}"#;
        let calls = whole_text_json(text).unwrap();
        assert_eq!(calls[0].name, "exec");
    }

    #[test]
    fn known_tool_name_key_shape() {
        let text = r#"{"read_file": {"path": "a.txt"}}"#;
        let calls = whole_text_json(text).unwrap();
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].arguments["path"], "a.txt");
    }

    #[test]
    fn fenced_code_block_with_named_path_synthesizes_write_file() {
        let text = "Save this to app.py:\n```python\nprint('hi')\n```\n";
        let calls = fenced_code_block_as_write_file(text).unwrap();
        assert_eq!(calls[0].name, "write_file");
        assert_eq!(calls[0].arguments["path"], "app.py");
    }

    #[test]
    fn bracket_wrapper_with_fat_arrow() {
        let text = "[TOOL_CALL]{\"tool\" => \"read_file\", \"args\" => {\"path\" => \"a.txt\"}}[/TOOL_CALL]";
        let calls = bracket_tool_call_wrapper(text).unwrap();
        assert_eq!(calls[0].name, "read_file");
    }

    #[test]
    fn balanced_brace_extraction_ignores_surrounding_prose() {
        let text = "Sure, here: {\"tool\": \"list_dir\", \"args\": {\"path\": \".\"}} done.";
        let calls = balanced_brace_substring(text).unwrap();
        assert_eq!(calls[0].name, "list_dir");
    }
}
