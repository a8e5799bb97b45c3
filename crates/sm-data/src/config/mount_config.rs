//! Mount-time configuration of a story view

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sm_core::{EngineOptions, Story};

use super::map_config::MapConfig;
use crate::validate::validation_errors;
use crate::StoryDataError;

/// Configuration handed to a binding when it mounts a story
///
/// Action overrides are code and are passed separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub map: MapConfig,
    pub story: Story,
    pub engine: EngineOptions,
}

impl MountConfig {
    pub fn new(map: MapConfig, story: Story) -> Self {
        Self {
            map,
            story,
            engine: EngineOptions::default(),
        }
    }

    /// Parse a JSON configuration. The `story` member goes through the
    /// structural validator before it is deserialized.
    pub fn from_json_str(text: &str) -> Result<Self, StoryDataError> {
        let value: Value = serde_json::from_str(text)?;
        if let Some(story) = value.get("story") {
            let issues = validation_errors(story);
            if !issues.is_empty() {
                return Err(StoryDataError::Invalid(issues));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a JSON configuration file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoryDataError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, StoryDataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapLibrary;
    use crate::sample::sample_story;

    #[test]
    fn test_round_trip_through_json() {
        let config = MountConfig::new(
            MapConfig::default().with_library(MapLibrary::Maplibre),
            sample_story(),
        );

        let text = config.to_json_string().unwrap();
        let parsed = MountConfig::from_json_str(&text).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_story_is_reported() {
        let text = r#"{ "story": { "type": "FeatureCollection", "features": [ { "type": "Feature" } ] } }"#;

        match MountConfig::from_json_str(text) {
            Err(StoryDataError::Invalid(issues)) => assert_eq!(issues.len(), 1),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = MountConfig::from_json_str("{}").unwrap();
        assert!(config.story.is_empty());
        assert_eq!(config.map, MapConfig::default());
    }
}
