//! Shared output-truncation policy applied by the Tool Engine to every
//! result's output/error fields (output post-processing).

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Tail-preserve `text` to at most `max_bytes`, annotating the cut
/// with `[output truncated: N -> M bytes]`. Output exactly at the
/// limit passes through verbatim.
pub fn truncate_tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let marker = format!("[output truncated: {} -> {} bytes]\n", text.len(), max_bytes);
    if marker.len() >= max_bytes {
        return marker[..floor_char_boundary(&marker, max_bytes)].to_string();
    }
    let keep = max_bytes - marker.len();
    let start = floor_char_boundary(text, text.len().saturating_sub(keep));
    format!("{marker}{}", &text[start..])
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && idx <= s.len() && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx.min(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_size_passes_through() {
        let text = "a".repeat(10);
        assert_eq!(truncate_tail(&text, 10), text);
    }

    #[test]
    fn one_byte_over_is_truncated_with_marker() {
        let text = "a".repeat(11);
        let out = truncate_tail(&text, 10);
        assert!(out.starts_with("[output truncated: 11 -> 10 bytes]"));
    }

    #[test]
    fn preserves_tail_content() {
        let text = format!("{}{}", "x".repeat(100), "END");
        let out = truncate_tail(&text, 20);
        assert!(out.ends_with("END"));
    }
}
