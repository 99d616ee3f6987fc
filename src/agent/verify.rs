//! Post-completion verification ("Verification
//! failed" row): once the model signals completion, double-check that
//! any expected output files exist and that verification commands
//! extracted from the task (or found at conventional locations) pass.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Exit markers that count as a verification failure even when the
/// command itself exits 0 (a test runner that swallows its own
/// failures, for instance).
pub const FAILURE_MARKERS: &[&str] = &[": fail", "assertionerror", "traceback", "segmentation fault", "error:"];

const VERIFY_COMMAND_TIMEOUT_SECS: u64 = 15 * 60;

pub fn verification_command_timeout_secs() -> u64 {
    VERIFY_COMMAND_TIMEOUT_SECS
}

fn inline_backtick_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`\n]+)`").expect("static regex"))
}

fn fenced_python_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```python\s*\n(.*?)```").expect("static regex"))
}

fn path_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[./\w-]+\.[A-Za-z0-9]{1,6}").expect("static regex"))
}

/// Pull candidate expected-output file paths out of the task text: any
/// bare path-looking token (has a dotted extension) mentioned near
/// words like "output", "produce", "save", "write", "generate".
pub fn extract_expected_output_paths(task: &str) -> Vec<String> {
    const TRIGGER_WORDS: &[&str] = &["output", "produce", "save", "write", "generate", "create"];
    let mut paths = Vec::new();
    for line in task.lines() {
        let lower = line.to_lowercase();
        if !TRIGGER_WORDS.iter().any(|w| lower.contains(w)) {
            continue;
        }
        for m in path_like_re().find_iter(line) {
            let candidate = m.as_str().trim_matches(|c: char| c == '.' || c == ',');
            if candidate.contains('.') && !paths.iter().any(|p: &String| p == candidate) {
                paths.push(candidate.to_string());
            }
        }
    }
    paths
}

/// Assemble the list of verification commands: inline backticks on
/// lines mentioning verify/test, fenced python blocks marked "should
/// run" (wrapped as a heredoc), a hard-coded X11-free probe when the
/// task says "no X11", an R `test()` invocation when the task mentions
/// R test semantics, plus standard file locations under `root`.
/// Deduplicated, order preserved.
pub fn extract_verification_commands(task: &str, root: &Path) -> Vec<String> {
    let mut commands = Vec::new();
    let lower_task = task.to_lowercase();

    for line in task.lines() {
        let lower_line = line.to_lowercase();
        if !(lower_line.contains("verify") || lower_line.contains("test")) {
            continue;
        }
        for cap in inline_backtick_re().captures_iter(line) {
            push_unique(&mut commands, cap[1].trim().to_string());
        }
    }

    for cap in fenced_python_re().captures_iter(task) {
        let surrounding_start = cap.get(0).map(|m| m.start()).unwrap_or(0);
        let context = &lower_task[surrounding_start.saturating_sub(80)..surrounding_start];
        if context.contains("should run") {
            let body = cap[1].trim();
            if !body.is_empty() {
                push_unique(&mut commands, wrap_python_heredoc(body));
            }
        }
    }

    if lower_task.contains("no x11") {
        push_unique(&mut commands, "python3 -c \"import os; assert not os.environ.get('DISPLAY')\"".to_string());
    }

    if lower_task.contains(" r ") && (lower_task.contains("test()") || lower_task.contains("testthat")) {
        push_unique(&mut commands, "Rscript -e 'testthat::test_dir(\"tests\")'".to_string());
    }

    for rel in ["test_outputs.py", "tests/test_outputs.py", "tests/test.sh"] {
        if root.join(rel).is_file() {
            push_unique(&mut commands, standard_location_command(rel));
        }
    }

    commands
}

fn push_unique(commands: &mut Vec<String>, cmd: String) {
    if !commands.iter().any(|c| c == &cmd) {
        commands.push(cmd);
    }
}

fn wrap_python_heredoc(body: &str) -> String {
    format!("python3 <<'EOF'\n{body}\nEOF")
}

fn standard_location_command(rel: &str) -> String {
    if rel.ends_with(".sh") {
        format!("bash {rel}")
    } else {
        format!("python3 {rel}")
    }
}

/// True if a verification command's outcome counts as a failure: a
/// nonzero exit, or any of `FAILURE_MARKERS` present in its output.
pub fn verification_failed(exit_success: bool, output: &str) -> bool {
    if !exit_success {
        return true;
    }
    let lower = output.to_lowercase();
    FAILURE_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn extracts_output_path_near_trigger_word() {
        let paths = extract_expected_output_paths("Save the result to output.csv when done.");
        assert_eq!(paths, vec!["output.csv".to_string()]);
    }

    #[test]
    fn ignores_paths_without_trigger_context() {
        let paths = extract_expected_output_paths("See README.md for background, no action needed.");
        assert!(paths.is_empty());
    }

    #[test]
    fn extracts_inline_backtick_verification_command() {
        let dir = tempfile::tempdir().unwrap();
        let cmds = extract_verification_commands("Please verify with `pytest tests/`.", dir.path());
        assert!(cmds.iter().any(|c| c == "pytest tests/"));
    }

    #[test]
    fn picks_up_standard_test_outputs_location() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test_outputs.py"), "# placeholder").unwrap();
        let cmds = extract_verification_commands("Build the thing.", dir.path());
        assert!(cmds.iter().any(|c| c.contains("test_outputs.py")));
    }

    #[test]
    fn x11_probe_added_when_task_requires_headless() {
        let dir = tempfile::tempdir().unwrap();
        let cmds = extract_verification_commands("Make sure this runs with no X11 available.", dir.path());
        assert!(cmds.iter().any(|c| c.contains("DISPLAY")));
    }

    #[test]
    fn detects_failure_marker_despite_zero_exit() {
        assert!(verification_failed(true, "1 passed, 1 FAIL: something broke"));
        assert!(!verification_failed(true, "3 passed, 0 failed"));
        assert!(verification_failed(false, "anything"));
    }
}
