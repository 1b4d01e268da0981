//! UTF-8-safe truncation helpers.
//!
//! Command output is capped before it lands in a result. Byte slicing can
//! panic when the cut falls inside a multi-byte character, so truncation
//! goes through these helpers.

/// Return a UTF-8-safe prefix whose byte length is at most `max_bytes`.
pub fn safe_prefix_by_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Truncate by bytes and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_bytes(text: &str, max_bytes: usize, suffix: &str) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let prefix = safe_prefix_by_bytes(text, max_bytes);
    format!("{prefix}{suffix}")
}

/// Cap command output, noting how many bytes were dropped.
pub fn cap_output(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let dropped = text.len() - safe_prefix_by_bytes(text, max_bytes).len();
    truncate_with_suffix_by_bytes(text, max_bytes, &format!("\n...[{dropped} bytes truncated]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_prefix_by_bytes_keeps_full_ascii_when_short() {
        assert_eq!(safe_prefix_by_bytes("hello", 10), "hello");
    }

    #[test]
    fn safe_prefix_by_bytes_avoids_mid_codepoint_cut() {
        let s = "a\u{e9}\u{1f642}";
        assert_eq!(safe_prefix_by_bytes(s, 2), "a");
        assert_eq!(safe_prefix_by_bytes(s, 3), "a\u{e9}");
    }

    #[test]
    fn truncate_with_suffix_by_bytes_handles_unicode() {
        let s = "\u{1f642}\u{1f642}\u{1f642}";
        let out = truncate_with_suffix_by_bytes(s, 5, "...[truncated]");
        assert_eq!(out, "\u{1f642}...[truncated]");
    }

    #[test]
    fn cap_output_reports_dropped_bytes() {
        assert_eq!(cap_output("short", 100), "short");
        let out = cap_output("abcdefghij", 4);
        assert_eq!(out, "abcd\n...[6 bytes truncated]");
    }
}
