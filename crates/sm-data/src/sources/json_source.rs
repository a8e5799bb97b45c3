use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use sm_core::Story;
use tracing::info;

use super::StorySource;
use crate::parse_story;

/// Story stored as a GeoJSON file on disk
pub struct JsonStorySource {
    path: PathBuf,
    name: String,
}

impl JsonStorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl StorySource for JsonStorySource {
    async fn load(&self) -> anyhow::Result<Story> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading story from {}", self.name))?;
        let story = parse_story(&text).with_context(|| format!("parsing story from {}", self.name))?;
        info!("Loaded {} story steps from {}", story.len(), self.name);
        Ok(story)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
