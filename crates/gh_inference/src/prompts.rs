//! Prompt text for the hosted model and parsers for its replies.

use gh_core::text::truncate_with_ellipsis;
use gh_core::{Category, StoryGroup};
use gh_dedup::extract_keywords;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::{IMPACT_MAX_CHARS, SUMMARY_MAX_CHARS};

lazy_static! {
    static ref QUALITY_LINE: Regex = Regex::new(r"^(\d+):\s*(.+)$").unwrap();
    static ref JSON_FENCE: Regex = Regex::new(r"(?i)```json").unwrap();
}

/// Score given when the model's rating cannot be read.
pub const FALLBACK_QUALITY_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityVerdict {
    pub score: u8,
    pub reason: String,
}

impl QualityVerdict {
    pub fn fallback(reason: &str) -> Self {
        Self {
            score: FALLBACK_QUALITY_SCORE,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDraft {
    pub summary: String,
    pub image_prompt: Option<String>,
}

pub fn quality_prompt(story: &StoryGroup) -> String {
    format!(
        r#"You are a news quality evaluator. Rate this article on a scale of 1-10 based on:
- Newsworthiness and relevance (is it actually news?)
- Clarity and completeness of information
- Significance to readers' daily lives
- NOT celebrity gossip, clickbait, or purely promotional content

Title: {}
Description: {}

Respond ONLY with a number from 1-10, followed by a colon and one short sentence explaining why.
Example: "7: Important economic policy change affecting consumers."

Your rating:"#,
        story.title, story.description
    )
}

pub fn category_prompt(story: &StoryGroup) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Classify this news article into ONE of these categories: {}\n\nTitle: {}\nDescription: {}\n\nRespond with ONLY the category name, nothing else.",
        categories.join(", "),
        story.title,
        story.description
    )
}

pub fn summary_prompt(story: &StoryGroup, category: Category) -> String {
    let content = if story.combined_description.is_empty() {
        &story.description
    } else {
        &story.combined_description
    };
    format!(
        r#"You are a professional news summarizer and visual editor for "The GlassHouse", a news platform that provides clear, actionable insights.

Your tasks:
1) Write a clear, neutral 2-3 sentence summary covering what happened, who is involved, when and where it occurred, and why it matters.

2) Propose a SHORT image prompt (3-10 words) for a representative photo or illustration that would fit this article. Keep it concrete and visual (e.g., "shoppers browsing thrift store clothing racks"), not abstract.

Respond ONLY with valid JSON in this format (no markdown, no extra text):
{{
  "summary": "...",
  "imagePrompt": "..."
}}

Title: {}
Source: {}
Category: {}
Content: {}
"#,
        story.title, story.source, category, content
    )
}

pub fn impact_prompt(story: &StoryGroup, category: Category, summary: &str) -> String {
    format!(
        r#"You are an analyst for "The GlassHouse" explaining how news affects everyday people.

Based on this news article, explain in 2-3 practical sentences how it could impact someone's daily life. Consider costs, taxes, savings and jobs; public health and safety; laws, services and rights; daily routines, travel and technology use; and local effects on communities.

Be SPECIFIC and PRACTICAL. Use concrete examples when possible.

If the news has NO meaningful impact on daily life (e.g., pure entertainment, ceremonial events), respond with exactly: "N/A"

Title: {}
Category: {}
Summary: {}

Daily Life Impact:"#,
        story.title, category, summary
    )
}

/// Reads a `"N: reason"` rating; anything else yields the fallback verdict.
pub fn parse_quality(response: &str) -> QualityVerdict {
    let Some(caps) = QUALITY_LINE.captures(response.trim()) else {
        return QualityVerdict::fallback("Could not evaluate");
    };
    match caps[1].parse::<u32>() {
        Ok(score) => QualityVerdict {
            score: score.min(10) as u8,
            reason: caps[2].trim().to_string(),
        },
        Err(_) => QualityVerdict::fallback("Could not evaluate"),
    }
}

pub fn parse_category(response: &str) -> Option<Category> {
    response.trim().parse().ok()
}

#[derive(Deserialize)]
struct SummaryReply {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default, rename = "imagePrompt")]
    image_prompt: Option<String>,
}

/// Parses the summary/image-prompt JSON, tolerating markdown fences.
///
/// Unparseable replies become the summary verbatim. An empty summary falls
/// back to `fallback`.
pub fn parse_summary(response: &str, fallback: &str) -> SummaryDraft {
    let stripped = JSON_FENCE.replace_all(response.trim(), "");
    let raw = stripped.replace("```", "");
    let raw = raw.trim();

    let Ok(reply) = serde_json::from_str::<SummaryReply>(raw) else {
        return SummaryDraft {
            summary: truncate_with_ellipsis(raw, SUMMARY_MAX_CHARS),
            image_prompt: None,
        };
    };

    let summary = reply.summary.unwrap_or_default();
    let summary = match summary.trim() {
        "" => fallback.trim(),
        text => text,
    };
    let image_prompt = reply
        .image_prompt
        .map(|p| p.trim().to_string())
        .filter(|p| p.chars().count() >= 3);

    SummaryDraft {
        summary: truncate_with_ellipsis(summary, SUMMARY_MAX_CHARS),
        image_prompt,
    }
}

/// `None` for `N/A` and replies too short to say anything.
pub fn parse_impact(response: &str) -> Option<String> {
    let impact = response.trim();
    if impact == "N/A" || impact.chars().count() < 10 {
        return None;
    }
    Some(truncate_with_ellipsis(impact, IMPACT_MAX_CHARS))
}

/// Stock-photo search terms built from the title without a model call.
pub fn image_keywords(title: &str, category: Category) -> String {
    let mut keywords = extract_keywords(title, 3);
    if category != Category::General {
        keywords.push(category.to_string());
    }
    keywords.truncate(3);
    if keywords.is_empty() {
        return "news".to_string();
    }
    keywords.join(" ")
}

/// Whether the daily-impact step runs for a story.
pub fn wants_impact(score: u8, category: Category) -> bool {
    score >= 6 || !matches!(category, Category::Sports | Category::Entertainment)
}
