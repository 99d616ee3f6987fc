//! Tool-Call Parser — extracts a nonempty sequence of `ToolCall`s from
//! arbitrary model text.
//!
//! Tries a fixed, ordered list of tactics; the first one that produces
//! a nonempty result wins. Each tactic is tolerant of slightly
//! malformed model output — that's the whole point of having seven of
//! them instead of one strict JSON decoder.

use serde_json::Value;

use crate::agent::types::ToolCall;

mod tactics;

/// One parsing strategy. Returns `None` when the tactic doesn't apply
/// or finds nothing; an empty `Vec` never means "try the next tactic"
/// once decoded, so tactics filter down to `None` themselves.
type Tactic = fn(&str) -> Option<Vec<ToolCall>>;

const TACTICS: &[Tactic] = &[
    tactics::whole_text_json,
    tactics::fenced_json_blocks,
    tactics::fenced_code_block_as_write_file,
    tactics::shell_style_hash,
    tactics::bracket_tool_call_wrapper,
    tactics::balanced_brace_substring,
    tactics::surface_form_heuristics,
];

/// Run each tactic in order; the first that returns a nonempty list
/// wins. Returns `None` if no tactic produced anything.
pub fn parse(text: &str) -> Option<Vec<ToolCall>> {
    for tactic in TACTICS {
        if let Some(calls) = tactic(text) {
            if !calls.is_empty() {
                return Some(calls.into_iter().map(normalize_args).collect());
            }
        }
    }
    None
}

/// Unwrap a JSON-encoded string value in `arguments`, and default an
/// entirely missing/empty argument object to `{}`.
fn normalize_args(mut call: ToolCall) -> ToolCall {
    if let Value::String(s) = &call.arguments {
        if let Ok(parsed) = serde_json::from_str::<Value>(s) {
            call.arguments = parsed;
        }
    }
    if call.arguments.is_null() {
        call.arguments = Value::Object(serde_json::Map::new());
    }
    call
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_tool_args_shape() {
        let text = r#"{"tool": "read_file", "args": {"path": "a.txt"}}"#;
        let calls = parse(text).expect("should parse");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].arguments["path"], "a.txt");
    }

    #[test]
    fn parses_fenced_json_block() {
        let text = "Here's the call:\n```json\n{\"tool\": \"exec\", \"args\": {\"command\": \"ls\"}}\n```\n";
        let calls = parse(text).expect("should parse");
        assert_eq!(calls[0].name, "exec");
    }

    #[test]
    fn falls_back_to_surface_heuristic() {
        let text = "I'll run the command now.\n\nrun the command `go build ./...`";
        let calls = parse(text).expect("should parse");
        assert_eq!(calls[0].name, "exec");
        assert_eq!(calls[0].arguments["command"], "go build ./...");
    }

    #[test]
    fn returns_none_for_plain_prose() {
        assert!(parse("I think I'm done here, no action needed.").is_none());
    }

    #[test]
    fn json_encoded_string_arguments_are_unwrapped() {
        let text = r#"{"tool": "read_file", "arguments": "{\"path\": \"a.txt\"}"}"#;
        let calls = parse(text).expect("should parse");
        assert_eq!(calls[0].arguments["path"], "a.txt");
    }
}
