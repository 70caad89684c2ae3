//! Small shared helpers.

/// Truncate a string to at most `max_chars` characters for log output,
/// appending an ellipsis marker when anything was cut.
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{cut}…")
}

/// Count ASCII digits in a string (phone number validation).
pub fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_unchanged() {
        assert_eq!(truncate_for_log("hello", 10), "hello");
    }

    #[test]
    fn long_string_truncated_with_marker() {
        assert_eq!(truncate_for_log("hello world", 5), "hello…");
    }

    #[test]
    fn multibyte_counted_as_chars() {
        assert_eq!(truncate_for_log("あいうえお", 3), "あいう…");
    }

    #[test]
    fn digits_counted_across_punctuation() {
        assert_eq!(digit_count("+1 (555) 867-5309"), 11);
    }

    #[test]
    fn no_digits() {
        assert_eq!(digit_count("none"), 0);
    }
}
