//! Drops re-published items before grouping.

use std::collections::HashSet;

use gh_core::RawArticle;

use crate::similarity::similarity;

/// Removes exact and near-identical titles, keeping the first occurrence.
///
/// Exact matches compare trimmed, lowercased titles. Near matches compare every
/// survivor against the items already kept and drop it when the similarity
/// reaches `threshold`.
pub fn filter_duplicate_titles(articles: &[RawArticle], threshold: f64) -> Vec<&RawArticle> {
    let mut seen = HashSet::with_capacity(articles.len());
    let exact: Vec<&RawArticle> = articles
        .iter()
        .filter(|article| seen.insert(article.title.trim().to_lowercase()))
        .collect();

    let mut kept: Vec<&RawArticle> = Vec::with_capacity(exact.len());
    for article in exact {
        let title = article.title.to_lowercase();
        let duplicate = kept
            .iter()
            .any(|existing| similarity(&title, &existing.title.to_lowercase()) >= threshold);
        if !duplicate {
            kept.push(article);
        }
    }
    kept
}
