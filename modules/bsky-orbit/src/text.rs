/// Collapse line breaks to spaces, trim, and cap at `max` characters. Text
/// that had to be cut ends in `...`, which counts toward the limit.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace("\r\n", " ").replace(&['\n', '\r'][..], " ");
    let flat = flat.trim();
    if flat.chars().count() <= max {
        return flat.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_only_trimmed() {
        assert_eq!(truncate("  hello  ", 10), "hello");
    }

    #[test]
    fn newlines_become_spaces() {
        assert_eq!(truncate("line one\nline two\r\nthree", 100), "line one line two three");
    }

    #[test]
    fn long_text_is_cut_with_ellipsis() {
        let bio = "a".repeat(150);
        let out = truncate(&bio, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..97], &bio[..97]);
    }

    #[test]
    fn exact_length_is_untouched() {
        let bio = "b".repeat(100);
        assert_eq!(truncate(&bio, 100), bio);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let bio = "🦋".repeat(30);
        let out = truncate(&bio, 26);
        assert_eq!(out.chars().count(), 26);
        assert!(out.starts_with("🦋"));
        assert_eq!(truncate(&"é".repeat(20), 26), "é".repeat(20));
    }
}
