//! Prompt Assembler — turns message history into a single prompt
//! string within a byte budget, preserving system + user head and
//! recent tail.

use crate::agent::types::Message;

pub const DEFAULT_BUDGET_BYTES: usize = 120 * 1024;
pub const DEFAULT_MESSAGE_CAP_BYTES: usize = 20 * 1024;
const MIN_MESSAGE_CAP_BYTES: usize = 4 * 1024;

/// Result of assembling a prompt: the concatenated text plus the
/// ascending indices of the messages that made it in.
pub struct Assembled {
    pub text: String,
    pub selected_indices: Vec<usize>,
}

/// Assemble `messages` into one prompt string within `budget_bytes`.
///
/// Always includes the first two messages (system + initial user) even
/// if together they exceed the budget. Then, iterating from newest to
/// oldest of the remainder, greedily includes each message whose block
/// fits the remaining budget — skipping (not stopping) ones that don't.
pub fn assemble(messages: &[Message], budget_bytes: usize) -> Assembled {
    let per_message_cap = message_cap(budget_bytes);

    let mut blocks: Vec<(usize, String)> = Vec::with_capacity(messages.len());
    for (i, m) in messages.iter().enumerate() {
        blocks.push((i, render_block(m, per_message_cap)));
    }

    let mut selected: Vec<usize> = Vec::new();
    let mut used_bytes = 0usize;

    let head_count = blocks.len().min(2);
    for (idx, block) in blocks.iter().take(head_count) {
        used_bytes += block.len();
        selected.push(*idx);
    }

    if blocks.len() > 2 {
        for (idx, block) in blocks[2..].iter().rev() {
            if used_bytes.saturating_add(block.len()) <= budget_bytes {
                used_bytes += block.len();
                selected.push(*idx);
            }
        }
    }

    selected.sort_unstable();

    let text = selected
        .iter()
        .map(|i| blocks[*i].1.as_str())
        .collect::<Vec<_>>()
        .join("");

    Assembled {
        text,
        selected_indices: selected,
    }
}

fn message_cap(budget_bytes: usize) -> usize {
    let half_budget = budget_bytes / 2;
    DEFAULT_MESSAGE_CAP_BYTES.min(half_budget).max(MIN_MESSAGE_CAP_BYTES.min(half_budget))
}

fn render_block(message: &Message, cap: usize) -> String {
    let role = match message.role {
        crate::agent::types::Role::System => "system",
        crate::agent::types::Role::User => "user",
        crate::agent::types::Role::Assistant => "assistant",
    };
    let content = tail_truncate(&message.content, cap);
    format!("[{role}]\n{content}\n\n")
}

/// Tail-truncate `text` to `cap` bytes, keeping the end and annotating
/// the cut with a marker (mirrors the output-truncation convention used
/// by the Tool Engine).
fn tail_truncate(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let marker = format!("[truncated: {} -> {} bytes]\n", text.len(), cap);
    let keep = cap.saturating_sub(marker.len());
    let start = floor_char_boundary(text, text.len().saturating_sub(keep));
    format!("{marker}{}", &text[start..])
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::Message;

    fn msgs(n: usize) -> Vec<Message> {
        let mut v = vec![Message::system("sys"), Message::user("task")];
        for i in 0..n {
            v.push(Message::assistant(format!("turn {i}")));
        }
        v
    }

    #[test]
    fn always_includes_first_two() {
        let messages = msgs(0);
        let result = assemble(&messages, 10);
        assert_eq!(result.selected_indices, vec![0, 1]);
    }

    #[test]
    fn includes_newest_first_within_budget() {
        let messages = msgs(5);
        let big_budget = 10_000;
        let result = assemble(&messages, big_budget);
        assert_eq!(result.selected_indices, (0..messages.len()).collect::<Vec<_>>());
    }

    #[test]
    fn skips_messages_that_dont_fit_but_keeps_going() {
        let mut messages = vec![Message::system("s"), Message::user("u")];
        messages.push(Message::assistant("x".repeat(50)));
        messages.push(Message::assistant("y".repeat(5)));
        // budget fits head plus only the small last message, not the big one
        let budget = "[system]\ns\n\n".len() + "[user]\nu\n\n".len() + "[assistant]\nyyyyy\n\n".len() + 5;
        let result = assemble(&messages, budget);
        assert!(result.selected_indices.contains(&3));
        assert!(!result.selected_indices.contains(&2));
    }

    #[test]
    fn long_single_message_is_tail_truncated() {
        let long = "a".repeat(100_000);
        let messages = vec![Message::system("s"), Message::user(long)];
        let result = assemble(&messages, DEFAULT_BUDGET_BYTES);
        assert!(result.text.contains("[truncated:"));
    }

    #[test]
    fn selected_indices_are_ascending() {
        let messages = msgs(3);
        let result = assemble(&messages, DEFAULT_BUDGET_BYTES);
        let mut sorted = result.selected_indices.clone();
        sorted.sort_unstable();
        assert_eq!(result.selected_indices, sorted);
    }
}
