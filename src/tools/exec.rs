//! `exec` tool — runs a shell command under `bash -lc`, falling back to
//! `sh -c` when bash is unavailable. Generalizes the system-command
//! execution pattern to category-based timeouts, foreground-server
//! detachment, an HTTP-probe readiness check for user-backgrounded
//! `http.server` runs, and permission-retry paths for docker-group and
//! sudo access.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::traits::{optional_str, optional_u64, require_str, RawToolResult, Tool};
use crate::error::Result;
use crate::pathres::PathResolver;

const VERY_LONG_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);
const LONG_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const SHORT_TIMEOUT: Duration = Duration::from_secs(60);

const VERY_LONG_PREFIXES: &[&str] = &["bench", "benchmark", "cargo bench"];
const LONG_PREFIXES: &[&str] = &[
    "cargo build", "cargo test", "npm install", "npm ci", "npm run build",
    "yarn install", "pip install", "make", "go build", "docker build",
];

const FOREGROUND_SERVER_MARKERS: &[&str] = &[
    "python -m http.server",
    "flask run",
    "rails server",
    "rails s",
    "npm run dev",
    "npm start",
    "yarn dev",
    "yarn start",
    "cargo run",
];

const READINESS_MARKERS: &[&str] = &["listening on", "ready in", "localhost:", "127.0.0.1:"];
const FAILURE_MARKERS: &[&str] = &["eaddrinuse", "address already in use", "command not found"];

const PERMISSION_DENIED_MARKERS: &[&str] = &["permission denied", "eacces", "not permitted"];

const HTTP_SERVER_PATTERNS: &[&str] = &["python -m http.server", "python3 -m http.server"];
const HTTP_PROBE_ATTEMPTS: u32 = 10;
const HTTP_PROBE_INTERVAL: Duration = Duration::from_millis(400);

pub struct ExecTool {
    dangerous_mode: bool,
}

impl ExecTool {
    pub fn new() -> Self {
        Self { dangerous_mode: false }
    }

    pub fn with_dangerous_mode(mut self, dangerous_mode: bool) -> Self {
        self.dangerous_mode = dangerous_mode;
        self
    }

    fn category_timeout(command: &str) -> Duration {
        let lower = command.to_lowercase();
        if VERY_LONG_PREFIXES.iter().any(|p| lower.contains(p)) {
            VERY_LONG_TIMEOUT
        } else if LONG_PREFIXES.iter().any(|p| lower.starts_with(p) || lower.contains(p)) {
            LONG_TIMEOUT
        } else {
            SHORT_TIMEOUT
        }
    }

    fn looks_like_foreground_server(command: &str) -> bool {
        let lower = command.to_lowercase();
        FOREGROUND_SERVER_MARKERS.iter().any(|m| lower.contains(m))
    }

    /// True when `command` is a `python -m http.server` invocation that
    /// the user already backgrounded with a trailing `&`, meaning the
    /// shell returns immediately and the engine must probe the port
    /// itself rather than wrap and detach the process.
    fn looks_like_user_backgrounded_http_server(command: &str) -> bool {
        let trimmed = command.trim();
        let lower = trimmed.to_lowercase();
        trimmed.ends_with('&') && HTTP_SERVER_PATTERNS.iter().any(|p| lower.contains(p))
    }

    /// `python -m http.server [port]` defaults to port 8000 when no
    /// explicit port argument follows.
    fn http_server_port(command: &str) -> u16 {
        command
            .split_whitespace()
            .filter_map(|tok| tok.trim_end_matches('&').parse::<u16>().ok())
            .next()
            .unwrap_or(8000)
    }

    /// Extract a stable marker from the project's `index.html`: the
    /// `<title>` text, else the first `<script src="...">`, else the
    /// first non-generic word token.
    fn index_html_marker(dir: &std::path::Path) -> Option<String> {
        let html = std::fs::read_to_string(dir.join("index.html")).ok()?;

        if let Some(title) = extract_between(&html, "<title>", "</title>") {
            let title = title.trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }

        if let Some(src) = extract_attr(&html, "script", "src") {
            return Some(src);
        }

        const GENERIC: &[&str] = &["<!doctype", "html>", "<html", "<head>", "<body>", "<meta", "<!--"];
        html.split_whitespace()
            .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric()))
            .find(|tok| tok.len() > 2 && !GENERIC.iter().any(|g| tok.eq_ignore_ascii_case(g)))
            .map(|tok| tok.to_string())
    }

    /// Probe `http://127.0.0.1:<port>/` for the stable marker extracted
    /// from `index.html`, retrying for a short window while the server
    /// comes up.
    async fn probe_http_server_with_marker(command: &str, cwd: Option<&PathBuf>, default_dir: &std::path::Path) -> (bool, String) {
        let port = Self::http_server_port(command);
        let dir = cwd.map(|p| p.as_path()).unwrap_or(default_dir);
        let marker = Self::index_html_marker(dir);

        let url = format!("http://127.0.0.1:{port}/");
        let client = reqwest::Client::new();

        for attempt in 0..HTTP_PROBE_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(HTTP_PROBE_INTERVAL).await;
            }
            let Ok(resp) = client.get(&url).send().await else { continue };
            let Ok(body) = resp.text().await else { continue };

            match &marker {
                Some(m) if body.contains(m.as_str()) => {
                    return (true, format!("HTTP server at {url} is serving index.html (marker matched: {m:?})"));
                }
                None => {
                    return (true, format!("HTTP server at {url} responded (no index.html marker to verify against)"));
                }
                Some(_) => continue,
            }
        }

        (false, format!("HTTP server at {url} did not serve a response matching the index.html marker within the probe window"))
    }

    fn shell() -> (&'static str, &'static str) {
        if which_bash_exists() {
            ("bash", "-lc")
        } else {
            ("sh", "-c")
        }
    }

    async fn run_foreground(command: &str, cwd: Option<&PathBuf>, timeout: Duration) -> (bool, String, String) {
        let (shell, flag) = Self::shell();
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(command);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(out)) => (
                out.status.success(),
                String::from_utf8_lossy(&out.stdout).to_string(),
                String::from_utf8_lossy(&out.stderr).to_string(),
            ),
            Ok(Err(e)) => (false, String::new(), format!("Failed to execute command: {e}")),
            Err(_) => (false, String::new(), format!("Command timed out after {timeout:?}")),
        }
    }

    /// Detach `command` into a background process redirected to a
    /// logfile, then poll for a readiness or failure marker within an
    /// ~8 s deadline.
    async fn run_detached(command: &str, cwd: Option<&PathBuf>) -> (bool, String) {
        let logfile = std::env::temp_dir().join(format!("eai-exec-{}.log", uuid::Uuid::new_v4()));
        let wrapped = format!(
            "({command}) > {} 2>&1 < /dev/null & echo $!",
            logfile.display()
        );

        let (shell, flag) = Self::shell();
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(&wrapped);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = match cmd.output().await {
            Ok(o) => o,
            Err(e) => return (false, format!("Failed to launch detached process: {e}")),
        };

        let pid_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let pid: i32 = match pid_str.parse() {
            Ok(p) => p,
            Err(_) => return (false, "Failed to parse detached process PID".to_string()),
        };

        let deadline = tokio::time::Instant::now() + Duration::from_secs(8);
        loop {
            tokio::time::sleep(Duration::from_millis(300)).await;

            let log_tail = tokio::fs::read_to_string(&logfile).await.unwrap_or_default();
            let lower = log_tail.to_lowercase();

            if FAILURE_MARKERS.iter().any(|m| lower.contains(m)) {
                return (false, format!("Detached process failed:\n{}", tail_lines(&log_tail, 40)));
            }
            if READINESS_MARKERS.iter().any(|m| lower.contains(m)) {
                return (true, format!("Process started (pid {pid}), detected ready:\n{}", tail_lines(&log_tail, 20)));
            }
            if !process_is_alive(pid) {
                return (false, format!("Detached process exited before becoming ready:\n{}", tail_lines(&log_tail, 40)));
            }
            if tokio::time::Instant::now() >= deadline {
                return (true, format!("Process started (pid {pid}), readiness undetermined within deadline:\n{}", tail_lines(&log_tail, 20)));
            }
        }
    }
}

impl Default for ExecTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a shell command via bash -lc (falls back to sh -c). Returns stdout, stderr, exit status."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "cwd": {"type": "string", "description": "Optional working directory, relative to the resolver root"},
                "timeout_s": {"type": "integer", "description": "Optional timeout override in seconds"}
            },
            "required": ["command"]
        })
    }

    fn default_timeout(&self) -> Duration {
        SHORT_TIMEOUT
    }

    async fn execute(&self, resolver: &PathResolver, args: Value) -> Result<RawToolResult> {
        let command = require_str(&args, "command")?;
        let cwd = optional_str(&args, "cwd").map(|c| resolver.resolve(c));
        let timeout = optional_u64(&args, "timeout_s")
            .map(Duration::from_secs)
            .unwrap_or_else(|| Self::category_timeout(command));

        if let Some(ref dir) = cwd {
            if resolver.is_outside_root(dir) {
                return Ok(RawToolResult::err("Access denied: cwd outside working root"));
            }
        }

        if Self::looks_like_user_backgrounded_http_server(command) {
            let (launched, launch_output) = Self::run_foreground(command, cwd.as_ref(), timeout).await;
            if !launched {
                return Ok(RawToolResult::err(launch_output));
            }
            let (success, output) = Self::probe_http_server_with_marker(command, cwd.as_ref(), resolver.root()).await;
            return Ok(if success { RawToolResult::ok(output) } else { RawToolResult::err(output) });
        }

        if Self::looks_like_foreground_server(command) {
            let (success, output) = Self::run_detached(command, cwd.as_ref()).await;
            return Ok(if success { RawToolResult::ok(output) } else { RawToolResult::err(output) });
        }

        let (mut success, mut stdout, mut stderr) = Self::run_foreground(command, cwd.as_ref(), timeout).await;

        if !success {
            let combined = format!("{stdout}{stderr}").to_lowercase();

            if self.dangerous_mode && PERMISSION_DENIED_MARKERS.iter().any(|m| combined.contains(m)) {
                if let Ok(sudo_password) = std::env::var("EAI_DESKTOP_SUDO_PASSWORD") {
                    let retry = format!("echo {sudo_password} | sudo -S {command}");
                    let (s2, out2, err2) = Self::run_foreground(&retry, cwd.as_ref(), timeout).await;
                    success = s2;
                    stdout = out2;
                    stderr = err2;
                } else if sg_docker_available() {
                    let retry = format!("sg docker -c {}", shell_quote(command));
                    let (s2, out2, err2) = Self::run_foreground(&retry, cwd.as_ref(), timeout).await;
                    success = s2;
                    stdout = out2;
                    stderr = err2;
                }
            } else if combined.contains("docker")
                && PERMISSION_DENIED_MARKERS.iter().any(|m| combined.contains(m))
                && sg_docker_available()
            {
                let retry = format!("sg docker -c {}", shell_quote(command));
                let (s2, out2, err2) = Self::run_foreground(&retry, cwd.as_ref(), timeout).await;
                success = s2;
                stdout = out2;
                stderr = err2;
            }
        }

        let mut content = String::new();
        if !stdout.is_empty() {
            content.push_str("STDOUT:\n");
            content.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str("STDERR:\n");
            content.push_str(&stderr);
        }

        Ok(if success {
            RawToolResult::ok(content)
        } else {
            RawToolResult {
                success: false,
                output: content,
                error: Some(if stderr.is_empty() { "command failed".to_string() } else { stderr }),
                file_path: None,
                change_type: None,
                old_content: None,
                new_content: None,
            }
        })
    }
}

fn extract_between(html: &str, open: &str, close: &str) -> Option<String> {
    let lower = html.to_lowercase();
    let start = lower.find(open)? + open.len();
    let end = start + lower[start..].find(close)?;
    Some(html[start..end].to_string())
}

fn extract_attr(html: &str, tag: &str, attr: &str) -> Option<String> {
    let lower = html.to_lowercase();
    let tag_start = lower.find(&format!("<{tag}"))?;
    let tag_end = tag_start + lower[tag_start..].find('>')?;
    let tag_text = &html[tag_start..tag_end];
    let attr_marker = format!("{attr}=\"");
    let lower_tag = tag_text.to_lowercase();
    let attr_start = lower_tag.find(&attr_marker)? + attr_marker.len();
    let attr_end = attr_start + tag_text[attr_start..].find('"')?;
    Some(tag_text[attr_start..attr_end].to_string())
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn which_bash_exists() -> bool {
    std::path::Path::new("/bin/bash").exists() || std::path::Path::new("/usr/bin/bash").exists()
}

fn sg_docker_available() -> bool {
    std::path::Path::new("/usr/bin/sg").exists() || std::path::Path::new("/bin/sg").exists()
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(unix)]
fn process_is_alive(pid: i32) -> bool {
    // Signal 0 performs no-op permission/existence checks only.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn process_is_alive(_pid: i32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_simple_command() {
        let resolver = PathResolver::new("/tmp");
        let tool = ExecTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"command": "echo hello"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("hello"));
    }

    #[tokio::test]
    async fn failing_command_is_reported() {
        let resolver = PathResolver::new("/tmp");
        let tool = ExecTool::new();
        let result = tool
            .execute(&resolver, serde_json::json!({"command": "exit 1"}))
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[test]
    fn build_commands_get_long_timeout() {
        assert_eq!(ExecTool::category_timeout("cargo build --release"), LONG_TIMEOUT);
        assert_eq!(ExecTool::category_timeout("echo hi"), SHORT_TIMEOUT);
        assert_eq!(ExecTool::category_timeout("cargo bench"), VERY_LONG_TIMEOUT);
    }

    #[test]
    fn detects_foreground_server_commands() {
        assert!(ExecTool::looks_like_foreground_server("python -m http.server 8000"));
        assert!(ExecTool::looks_like_foreground_server("flask run --port 5000"));
        assert!(!ExecTool::looks_like_foreground_server("ls -la"));
    }

    #[test]
    fn detects_user_backgrounded_http_server() {
        assert!(ExecTool::looks_like_user_backgrounded_http_server("python -m http.server 8000 &"));
        assert!(ExecTool::looks_like_user_backgrounded_http_server("python3 -m http.server &"));
        assert!(!ExecTool::looks_like_user_backgrounded_http_server("python -m http.server 8000"));
        assert!(!ExecTool::looks_like_user_backgrounded_http_server("npm run dev &"));
    }

    #[test]
    fn http_server_port_parses_explicit_port_else_defaults() {
        assert_eq!(ExecTool::http_server_port("python -m http.server 9000 &"), 9000);
        assert_eq!(ExecTool::http_server_port("python -m http.server &"), 8000);
    }

    #[test]
    fn index_html_marker_prefers_title() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><head><title>Cat Cafe</title></head></html>").unwrap();
        assert_eq!(ExecTool::index_html_marker(dir.path()), Some("Cat Cafe".to_string()));
    }

    #[test]
    fn index_html_marker_falls_back_to_script_src() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><head><script src=\"app.js\"></script></head></html>").unwrap();
        assert_eq!(ExecTool::index_html_marker(dir.path()), Some("app.js".to_string()));
    }

    #[test]
    fn index_html_marker_none_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ExecTool::index_html_marker(dir.path()), None);
    }
}
