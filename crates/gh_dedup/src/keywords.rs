//! Headline keyword extraction used as a coarse grouping key.

use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "can", "about", "after",
    "says", "new", "just", "said", "also", "more", "than", "other",
];

/// Tokens this short never count as keywords.
const MIN_KEYWORD_CHARS: usize = 4;

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Lowercases `text` and drops everything that is neither a word character nor whitespace.
///
/// Word characters are ASCII only, so accented letters are removed rather than kept:
/// "Zürich" normalizes to "zrich".
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// Returns up to `limit` salient tokens of `text`, most frequent first.
///
/// Ties keep the order in which the tokens first appear.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let normalized = normalize(text);
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for token in normalized.split_whitespace() {
        if token.chars().count() < MIN_KEYWORD_CHARS || is_stop_word(token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // `order` is first-occurrence order and sort_by is stable.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(limit).map(str::to_string).collect()
}

/// Bucket key for a title: its top `n` keywords sorted and joined by a space.
pub fn bucket_key(title: &str, n: usize) -> String {
    let mut keywords = extract_keywords(title, n);
    keywords.sort();
    keywords.join(" ")
}
