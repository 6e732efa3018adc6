use sha2::{Digest, Sha256};
use url::Url;

/// SHA-256 of `input`, hex encoded and cut to 32 characters.
pub fn content_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(32);
    hex
}

pub fn is_valid_url(candidate: &str) -> bool {
    !candidate.trim().is_empty() && Url::parse(candidate).is_ok()
}

/// Cuts `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let a = content_hash("hello");
        assert_eq!(a.len(), 32);
        assert_eq!(a, content_hash("hello"));
        assert_ne!(a, content_hash("hello "));
        assert_eq!(a, "2cf24dba5fb0a30e26e83b2ac5b9e29e");
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com/story"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("ñandú", 2), "ña...");
    }
}
