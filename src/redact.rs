//! Redactor — replaces known secret substrings in any outbound string.
//!
//! Every path that writes to disk, emits to the progress sink, or appends
//! to the transcript passes strings through a `Redactor` first. See
//! `agent::loop_::AgentLoop` for the call sites.

const PLACEHOLDER: &str = "[REDACTED]";

/// Holds the deduplicated, nonempty, trimmed set of secret values to strip
/// from outbound text.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Build a redactor from a set of candidate secret values (API keys,
    /// passwords, connection-string credentials, ...). Empty and
    /// whitespace-only values are dropped; duplicates are collapsed.
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for raw in secrets {
            let s = raw.into();
            let trimmed = s.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !seen.iter().any(|existing: &String| existing == trimmed) {
                seen.push(trimmed.to_string());
            }
        }
        Self { secrets: seen }
    }

    /// Register an additional secret value after construction.
    pub fn add(&mut self, secret: impl Into<String>) {
        let s = secret.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return;
        }
        if !self.secrets.iter().any(|existing| existing == trimmed) {
            self.secrets.push(trimmed.to_string());
        }
    }

    /// Replace every occurrence of every configured secret with
    /// `[REDACTED]`. Idempotent: `redact(redact(x)) == redact(x)`, since
    /// the placeholder itself never matches a (nonempty) secret value.
    pub fn redact(&self, input: &str) -> String {
        if input.is_empty() || self.secrets.is_empty() {
            return input.to_string();
        }
        let mut out = input.to_string();
        for secret in &self.secrets {
            if secret.is_empty() {
                continue;
            }
            out = out.replace(secret.as_str(), PLACEHOLDER);
        }
        out
    }

    /// Redact an `Option<String>` in place, preserving `None`.
    pub fn redact_opt(&self, input: Option<&str>) -> Option<String> {
        input.map(|s| self.redact(s))
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_passes_through() {
        let r = Redactor::new(["sk-secret"]);
        assert_eq!(r.redact(""), "");
    }

    #[test]
    fn replaces_all_occurrences() {
        let r = Redactor::new(["sk-secret"]);
        let out = r.redact("key=sk-secret and again sk-secret");
        assert_eq!(out, "key=[REDACTED] and again [REDACTED]");
    }

    #[test]
    fn empty_and_whitespace_secrets_are_dropped() {
        let r = Redactor::new(["", "   ", "real-secret"]);
        assert_eq!(r.redact("nothing here"), "nothing here");
        assert_eq!(r.redact("has real-secret inside"), "has [REDACTED] inside");
    }

    #[test]
    fn is_idempotent() {
        let r = Redactor::new(["tok_abc123"]);
        let once = r.redact("value is tok_abc123");
        let twice = r.redact(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn deduplicates_secrets() {
        let r = Redactor::new(["dup", "dup", "dup"]);
        assert_eq!(r.redact("dup dup"), "[REDACTED] [REDACTED]");
    }
}
