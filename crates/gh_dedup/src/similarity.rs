//! Lexical title similarity (Dice coefficient over character bigrams).

use std::collections::HashMap;

fn squeeze(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn bigrams(chars: &[char]) -> HashMap<(char, char), usize> {
    let mut counts = HashMap::with_capacity(chars.len());
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Case-insensitive similarity in `[0, 1]`; whitespace is ignored.
///
/// Identical inputs always score `1.0`. Inputs shorter than two characters
/// have no bigrams and score `0.0` against anything but themselves.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = squeeze(a);
    let b = squeeze(b);

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let a_bigrams = bigrams(&a);
    let b_bigrams = bigrams(&b);

    let shared: usize = a_bigrams
        .iter()
        .filter_map(|(pair, count)| b_bigrams.get(pair).map(|other| (*count).min(*other)))
        .sum();

    let total = (a.len() - 1) + (b.len() - 1);
    (2 * shared) as f64 / total as f64
}
