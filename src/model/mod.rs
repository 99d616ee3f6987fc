//! Model Provider — the external boundary the agent loop drives. Kept
//! deliberately thin: the loop only ever needs a completion and its
//! finish reason, plus an optional streaming channel for reasoning
//! tokens.

mod openrouter;

pub use openrouter::{OpenRouterConfig, OpenRouterProvider};

use async_trait::async_trait;

use crate::agent::types::{GenerationOptions, Usage};
use crate::error::Result;
use crate::progress::ProgressSink;

/// One model completion. `finish_reason` is compared only
/// case-insensitively against `"length"` by the loop (truncation
/// detection) — providers are free to use their own vocabulary
/// otherwise.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// `Complete(ctx, prompt) → (text, meta)` / `CompleteWithObserver(ctx,
/// prompt, reasoning_sink) → (text, meta, err)`. `prompt` is whatever
/// `prompt::assemble` produced — already budget-bounded, already a
/// flat string. The provider owns how it wraps that into its wire
/// format (a single user message, a system+user pair, raw completion,
/// whatever the backend wants).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<Completion>;

    /// Same as `complete`, but streams reasoning/thinking tokens to
    /// `sink` as they arrive (provider-dependent; a provider with no
    /// reasoning stream may just emit nothing and fall back to
    /// `complete`'s behavior).
    async fn complete_with_observer(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        sink: &dyn ProgressSink,
    ) -> Result<Completion> {
        let _ = sink;
        self.complete(prompt, options).await
    }
}

/// True iff a provider's `finish_reason` signals the response was cut
/// off by the model's context/output limit ("the loop only
/// inspects case-insensitive equality to `length`").
pub fn is_length_truncated(finish_reason: Option<&str>) -> bool {
    finish_reason.map(|r| r.eq_ignore_ascii_case("length")).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_truncation_is_case_insensitive() {
        assert!(is_length_truncated(Some("LENGTH")));
        assert!(is_length_truncated(Some("Length")));
        assert!(!is_length_truncated(Some("stop")));
        assert!(!is_length_truncated(None));
    }
}
