//! Field-level merge rules for a story group.

use chrono::{DateTime, Utc};
use gh_core::{Category, RawArticle, SourceLink, StoryGroup};
use url::Url;

struct Member {
    source: String,
    description: String,
    link: SourceLink,
    category: Category,
    pub_date: DateTime<Utc>,
}

impl Member {
    fn of(article: &RawArticle) -> Self {
        Self {
            source: article.source.clone(),
            description: article.description.clone(),
            link: SourceLink {
                source: article.source.clone(),
                url: article.link.to_string(),
            },
            category: article.category,
            pub_date: article.pub_date,
        }
    }
}

/// Accumulates the members of one group, seeded from its anchor article.
pub struct StoryGroupBuilder {
    title: String,
    description: String,
    link: Url,
    source: String,
    original_id: String,
    image_url: Option<String>,
    pub_date: DateTime<Utc>,
    category: Category,
    members: Vec<Member>,
}

impl StoryGroupBuilder {
    pub fn new(anchor: &RawArticle) -> Self {
        Self {
            title: anchor.title.clone(),
            description: anchor.description.clone(),
            link: anchor.link.clone(),
            source: anchor.source.clone(),
            original_id: anchor.original_id.clone(),
            image_url: anchor.image_url.clone().filter(|url| !url.is_empty()),
            pub_date: anchor.pub_date,
            category: anchor.category,
            members: vec![Member::of(anchor)],
        }
    }

    /// Adds `candidate` as a member.
    ///
    /// A longer description replaces the representative one; an image is only
    /// adopted while the group has none.
    pub fn merge(&mut self, candidate: &RawArticle) -> &mut Self {
        if !candidate.description.is_empty()
            && candidate.description.chars().count() > self.description.chars().count()
        {
            self.description = candidate.description.clone();
        }

        if self.image_url.is_none() {
            self.image_url = candidate.image_url.clone().filter(|url| !url.is_empty());
        }

        self.members.push(Member::of(candidate));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn finish(self) -> StoryGroup {
        let size = self.members.len();
        let mut sources = Vec::with_capacity(size);
        let mut descriptions = Vec::with_capacity(size);
        let mut links = Vec::with_capacity(size);
        let mut categories = Vec::with_capacity(size);
        let mut pub_dates = Vec::with_capacity(size);

        for member in self.members {
            sources.push(member.source);
            descriptions.push(member.description);
            links.push(member.link);
            categories.push(member.category);
            pub_dates.push(member.pub_date);
        }

        let mut unique_categories: Vec<Category> = Vec::new();
        for category in &categories {
            if !unique_categories.contains(category) {
                unique_categories.push(*category);
            }
        }

        let combined_description = descriptions.join(" ");

        StoryGroup {
            title: self.title,
            description: self.description,
            link: self.link,
            source: self.source,
            original_id: self.original_id,
            image_url: self.image_url,
            pub_date: self.pub_date,
            category: self.category,
            source_diversity: sources.len(),
            sources,
            descriptions,
            links,
            categories,
            pub_dates,
            unique_categories,
            combined_description,
        }
    }
}

/// A group holding `article` alone.
pub fn singleton(article: &RawArticle) -> StoryGroup {
    StoryGroupBuilder::new(article).finish()
}
