//! Permission Gate — classifies risky tool calls and requests human
//! approval via a decision channel.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};

use crate::agent::types::ToolCall;
use crate::pathres::PathResolver;

/// Flows from UI/CLI into the loop through a single channel, matched
/// on `tool_call_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub tool_call_id: String,
    pub allow: bool,
}

/// Run-time permission posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Default: dangerous calls are gated behind human approval.
    FullAccess,
    /// The gate is disabled entirely; `exec` still gains the sudo-retry
    /// policy on permission-denied failures.
    DangerouslyFullAccess,
}

const DANGEROUS_TOKENS: &[&str] = &[
    "sudo",
    "pkexec",
    "doas",
    "runas",
    "rm -rf",
    "mkfs",
    "dd if=",
    "git commit",
    "git push",
    "git tag",
    "git rebase",
    "git merge",
    "git cherry-pick",
    "git revert",
    "git reset --hard",
    "git clean -fd",
    "git checkout --",
    "systemctl",
    "service ",
    "chmod",
    "chown",
    "apt-get",
    "apt install",
    "yum install",
    "pip install",
    "npm install -g",
];

const PROTECTED_PATH_PREFIXES: &[&str] = &["/etc", "/boot", "/sys", "/proc", "/usr/bin", "/usr/sbin"];

fn contains_recursive_windows_delete(command: &str) -> bool {
    let lower = command.to_lowercase();
    lower.contains("rmdir /s") || lower.contains("remove-item") && lower.contains("-recurse")
}

fn contains_pipe_to_shell(command: &str) -> bool {
    let lower = command.to_lowercase();
    (lower.contains("curl") || lower.contains("wget"))
        && (lower.contains("| sh") || lower.contains("|sh") || lower.contains("| bash") || lower.contains("|bash") || lower.contains("| zsh"))
}

/// True if an `exec` command contains any fixed "dangerous" token, per

pub fn is_dangerous_command(command: &str) -> bool {
    let lower = command.to_lowercase();
    DANGEROUS_TOKENS.iter().any(|t| lower.contains(t))
        || contains_recursive_windows_delete(command)
        || contains_pipe_to_shell(command)
        || PROTECTED_PATH_PREFIXES.iter().any(|p| lower.contains(p))
}

/// Determine whether `call` needs human approval given the working
/// root.
pub fn requires_approval(call: &ToolCall, resolver: &PathResolver) -> bool {
    match call.name.as_str() {
        "exec" => call
            .arguments
            .get("command")
            .and_then(|v| v.as_str())
            .map(is_dangerous_command)
            .unwrap_or(false),
        "read_file" | "write_file" | "edit_file" | "append_file" | "patch_file" | "list_dir" => call
            .arguments
            .get("path")
            .and_then(|v| v.as_str())
            .map(|p| {
                let abs = resolver.resolve(p);
                resolver.is_outside_root(&abs)
            })
            .unwrap_or(false),
        _ => false,
    }
}

type DecisionTable = Arc<Mutex<HashMap<String, oneshot::Sender<PermissionDecision>>>>;

/// Routes `PermissionDecision`s delivered out-of-band back to whichever
/// `await_decision` call is waiting on a given `tool_call_id`.
#[derive(Clone)]
pub struct PermissionGate {
    mode: PermissionMode,
    pending: DecisionTable,
}

impl PermissionGate {
    pub fn new(mode: PermissionMode) -> Self {
        Self {
            mode,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn mode(&self) -> PermissionMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode == PermissionMode::FullAccess
    }

    /// Register a pending decision and return a receiver the loop can
    /// await. The gate waits unbounded but cancellably —
    /// callers should race this against their own cancellation context.
    pub async fn await_decision(&self, tool_call_id: &str) -> oneshot::Receiver<PermissionDecision> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(tool_call_id.to_string(), tx);
        rx
    }

    /// Deliver a decision received from the UI/CLI side of the channel.
    pub async fn resolve(&self, decision: PermissionDecision) -> bool {
        if let Some(tx) = self.pending.lock().await.remove(&decision.tool_call_id) {
            tx.send(decision).is_ok()
        } else {
            false
        }
    }
}

/// Fixed final message emitted when the user denies a risky call.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Permission denied. Agent stopped; waiting for new instructions.";

pub fn is_path_tool_outside(path: &Path, resolver: &PathResolver) -> bool {
    resolver.is_outside_root(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rm_rf_is_dangerous() {
        assert!(is_dangerous_command("rm -rf /tmp/build"));
    }

    #[test]
    fn plain_ls_is_not_dangerous() {
        assert!(!is_dangerous_command("ls -la"));
    }

    #[test]
    fn curl_pipe_bash_is_dangerous() {
        assert!(is_dangerous_command("curl https://example.com/install.sh | bash"));
    }

    #[test]
    fn exec_requires_approval_only_when_dangerous() {
        let resolver = PathResolver::new("/work");
        let safe = ToolCall::new("1", "exec", json!({"command": "echo hi"}));
        let risky = ToolCall::new("2", "exec", json!({"command": "sudo rm -rf /"}));
        assert!(!requires_approval(&safe, &resolver));
        assert!(requires_approval(&risky, &resolver));
    }

    #[test]
    fn file_tool_outside_root_requires_approval() {
        let resolver = PathResolver::new("/work");
        let call = ToolCall::new("3", "write_file", json!({"path": "/etc/passwd", "content": "x"}));
        assert!(requires_approval(&call, &resolver));
    }

    #[tokio::test]
    async fn resolve_delivers_to_waiting_receiver() {
        let gate = PermissionGate::new(PermissionMode::FullAccess);
        let rx = gate.await_decision("call-1").await;
        let delivered = gate
            .resolve(PermissionDecision {
                tool_call_id: "call-1".into(),
                allow: false,
            })
            .await;
        assert!(delivered);
        let decision = rx.await.unwrap();
        assert!(!decision.allow);
    }
}
