pub mod error;
pub mod models;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use models::{Enricher, FeedReader};
pub use storage::{LikeStatus, SaveReport, SortOrder, StoryPage, StoryQuery, StoryStorage};
pub use types::{
    Category, Comment, Engagement, Enrichment, NewComment, RawArticle, SourceLink, StoredStory,
    StoryGroup,
};
