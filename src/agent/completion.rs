//! Completion-signal detection ("Terminal
//! completion sentinel").

/// The literal single-line string that always signals completion, even
/// with no prior tool use.
pub const COMPLETION_SENTINEL: &str = "TASK_COMPLETED";

/// Phrases that only count as completion once at least one tool has
/// run this session — otherwise a model could "talk" its way to done
/// without doing anything.
const COMPLETION_PHRASES: &[&str] = &[
    "task completed",
    "successfully completed",
    "all done",
    "task is complete",
    "task finished",
    "completed successfully",
];

/// True iff the last non-empty line of `text` equals `TASK_COMPLETED`
/// case-insensitively (trailing whitespace tolerated).
pub fn is_sentinel_completion(text: &str) -> bool {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.eq_ignore_ascii_case(COMPLETION_SENTINEL))
        .unwrap_or(false)
}

fn is_phrase_completion(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMPLETION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Detect a completion signal in a no-tool-calls response: the sentinel
/// always counts; a phrase only counts once tools have executed this
/// run.
pub fn detect_completion(text: &str, any_tool_executed: bool) -> bool {
    is_sentinel_completion(text) || (any_tool_executed && is_phrase_completion(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_sentinel_completes_with_no_tools() {
        assert!(detect_completion("TASK_COMPLETED", false));
    }

    #[test]
    fn sentinel_is_case_insensitive_and_tolerates_trailing_whitespace() {
        assert!(is_sentinel_completion("task_completed   \n"));
        assert!(is_sentinel_completion("Here's the summary.\nTASK_COMPLETED\n"));
    }

    #[test]
    fn phrase_alone_does_not_complete_without_tool_use() {
        assert!(!detect_completion("I have successfully completed the task.", false));
    }

    #[test]
    fn phrase_completes_once_a_tool_has_run() {
        assert!(detect_completion("I have successfully completed the task.", true));
    }

    #[test]
    fn unrelated_text_does_not_complete() {
        assert!(!detect_completion("Let me look into this further.", true));
    }
}
