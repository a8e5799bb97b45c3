//! Places a story can be loaded from

pub mod json_source;
pub mod static_source;

use async_trait::async_trait;
use sm_core::Story;

pub use json_source::JsonStorySource;
pub use static_source::StaticStorySource;

/// Something that yields a validated story
#[async_trait]
pub trait StorySource: Send + Sync {
    /// Load the story
    async fn load(&self) -> anyhow::Result<Story>;

    /// Get the source name/path
    fn source_name(&self) -> &str;
}
