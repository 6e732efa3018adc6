//! Cross-source deduplication of RSS items into story groups.
//!
//! A batch goes through an exact/near-duplicate title filter, is sorted newest
//! first, bucketed by its top title keywords and then merged pairwise inside
//! each bucket against the newest article not yet claimed by a group.

pub mod config;
pub mod error;
pub mod grouping;
pub mod keywords;
pub mod merge;
pub mod prefilter;
pub mod similarity;

pub use config::DedupConfig;
pub use error::DedupError;
pub use grouping::{DedupReport, Deduplicator};
pub use keywords::{bucket_key, extract_keywords};
pub use merge::StoryGroupBuilder;
pub use prefilter::filter_duplicate_titles;
pub use similarity::similarity;

pub mod prelude {
    pub use super::{DedupConfig, DedupReport, Deduplicator};
    pub use gh_core::{RawArticle, StoryGroup};
}
