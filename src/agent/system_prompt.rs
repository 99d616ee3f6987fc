//! System prompt assembly: a base prompt plus
//! optional task-category guidance selected by keyword match over the
//! task text.

const BASE_PROMPT: &str = "You are an autonomous coding agent. You work in a loop: think, take one \
action by emitting a single tool call, then observe the result before deciding what to do next. \
You have access to a working directory and a fixed set of tools for reading, writing, patching, \
and searching files, listing directories, and running shell commands. Prefer the smallest tool \
call that makes progress. When the task is fully done, respond with a line containing exactly \
TASK_COMPLETED and nothing else.";

struct Category {
    keywords: &'static [&'static str],
    guidance: &'static str,
}

const CATEGORIES: &[Category] = &[
    Category {
        keywords: &["website", "landing page", "html", "css"],
        guidance: "This task involves building a web page or site. Produce complete, \
self-contained HTML (inline CSS is fine) unless the task asks for separate files, and write it \
with the write_file tool rather than only describing it.",
    },
    Category {
        keywords: &["test", "pytest", "unit test", "testthat"],
        guidance: "This task involves tests. Run the project's test suite (or the test command \
named in the task) after making changes, and do not report completion until it passes.",
    },
    Category {
        keywords: &["refactor", "rename", "clean up"],
        guidance: "This task is a refactor. Preserve existing behavior; check for callers of \
anything you rename or move before finishing.",
    },
    Category {
        keywords: &["bug", "fix", "crash", "error", "fails"],
        guidance: "This task is a bug fix. Reproduce the failure first if you can, then verify \
your fix actually resolves it before reporting completion.",
    },
];

/// Compose the system message: the base prompt, plus each category's
/// guidance whose keywords appear (case-insensitively) in `task`.
pub fn build_system_prompt(task: &str) -> String {
    let lower = task.to_lowercase();
    let mut sections = vec![BASE_PROMPT.to_string()];
    for category in CATEGORIES {
        if category.keywords.iter().any(|k| lower.contains(k)) {
            sections.push(category.guidance.to_string());
        }
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_task_gets_only_base_prompt() {
        let prompt = build_system_prompt("Sum the numbers in a file.");
        assert_eq!(prompt, BASE_PROMPT);
    }

    #[test]
    fn html_task_gets_site_guidance() {
        let prompt = build_system_prompt("Build a landing page for my startup.");
        assert!(prompt.contains("write_file tool"));
    }

    #[test]
    fn multiple_categories_can_apply() {
        let prompt = build_system_prompt("Fix the bug where the test suite fails on CI.");
        assert!(prompt.contains("bug fix"));
        assert!(prompt.contains("test suite"));
    }
}
