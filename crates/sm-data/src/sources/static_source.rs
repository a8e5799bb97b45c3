use async_trait::async_trait;
use sm_core::Story;

use super::StorySource;

/// Story already held in memory
pub struct StaticStorySource {
    name: String,
    story: Story,
}

impl StaticStorySource {
    pub fn new(name: impl Into<String>, story: Story) -> Self {
        Self {
            name: name.into(),
            story,
        }
    }
}

#[async_trait]
impl StorySource for StaticStorySource {
    async fn load(&self) -> anyhow::Result<Story> {
        Ok(self.story.clone())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_story;

    #[tokio::test]
    async fn test_static_source_returns_story() {
        let source = StaticStorySource::new("sample", sample_story());
        assert_eq!(source.source_name(), "sample");
        assert_eq!(source.load().await.unwrap().len(), 4);
    }
}
