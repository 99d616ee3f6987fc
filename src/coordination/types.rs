//! Coordination Store data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A run-scoped multi-agent bus entry. `id` is a monotonic per-database
/// sequence, not per-run — pollers compare against the last id they've
/// seen, not a count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollabMessage {
    pub id: i64,
    pub run_id: String,
    pub session_id: Option<String>,
    pub from_agent: String,
    pub to_agent: Option<String>,
    pub kind: String,
    pub scope: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A lease on `scope` within `run_id`. Unique per `(run_id, scope)`;
/// ownership transfers only when the holder matches or the lease has
/// expired.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollabClaim {
    pub run_id: String,
    pub scope: String,
    pub claimed_by: String,
    pub claimed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CollabClaim {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A coordination run. `root_id` anchors the run to a filesystem root
/// when the caller's session has one; otherwise it mirrors `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Run {
    pub run_id: String,
    pub session_id: Option<String>,
    pub root_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of `PollMessages`: the page of messages plus the watermark
/// callers should pass as `since_id` on their next poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<CollabMessage>,
    pub watermark: i64,
}

/// Result of `ClaimScope`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOutcome {
    pub got_it: bool,
    pub current_owner: String,
}

pub const MAX_BODY_CHARS: usize = 2200;
pub const DEFAULT_POLL_LIMIT: i64 = 50;
pub const MAX_POLL_LIMIT: i64 = 200;
pub const DEFAULT_CLAIM_TTL_SECS: i64 = 120;
pub const DUPLICATE_WINDOW_SECS: i64 = 10;

/// Kinds an agent may post without holding a scope claim.
pub const SCOPELESS_KINDS: &[&str] = &["announce", "status", "question"];

/// Truncates `body` to `MAX_BODY_CHARS`, appending an ellipsis marker
/// when truncation occurs. Operates on chars, not bytes, so multi-byte
/// UTF-8 never gets split mid-codepoint.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
    truncated.push('\u{2026}');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_passes_through() {
        assert_eq!(truncate_body("hello"), "hello");
    }

    #[test]
    fn long_body_is_truncated_with_ellipsis() {
        let body = "a".repeat(MAX_BODY_CHARS + 50);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.chars().count(), MAX_BODY_CHARS + 1);
        assert!(truncated.ends_with('\u{2026}'));
    }

    #[test]
    fn claim_expiry_is_inclusive() {
        let now = Utc::now();
        let claim = CollabClaim {
            run_id: "r".into(),
            scope: "s".into(),
            claimed_by: "a".into(),
            claimed_at: now,
            expires_at: now,
        };
        assert!(claim.is_expired(now));
    }
}
