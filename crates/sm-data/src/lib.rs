//! Story documents, their validation and the configuration a view mounts with

pub mod config;
pub mod sample;
pub mod sources;
pub mod validate;

use serde_json::Value;
use sm_core::Story;
use thiserror::Error;

pub use config::{MapConfig, MapLibrary, MountConfig};
pub use sample::sample_story;
pub use sources::{JsonStorySource, StaticStorySource, StorySource};
pub use validate::{validate_story, validation_errors, ValidationIssue};

/// Errors that can occur while loading story data
#[derive(Error, Debug)]
pub enum StoryDataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid story: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),

    #[error("Other error: {0}")]
    Other(String),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse story JSON, checking its structure before deserializing
pub fn parse_story(text: &str) -> Result<Story, StoryDataError> {
    let value: Value = serde_json::from_str(text)?;
    story_from_value(value)
}

/// Validate then deserialize an already-parsed story document
pub fn story_from_value(value: Value) -> Result<Story, StoryDataError> {
    let issues = validation_errors(&value);
    if !issues.is_empty() {
        return Err(StoryDataError::Invalid(issues));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_core::StepGeometry;

    #[test]
    fn test_parse_story() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-122.4194, 37.7749] },
                    "properties": { "title": "Start", "action": "flyTo", "zoom": 13 }
                }
            ]
        }"#;

        let story = parse_story(text).unwrap();
        assert_eq!(story.len(), 1);

        let step = story.get(0).unwrap();
        assert_eq!(step.title(), Some("Start"));
        assert_eq!(step.properties.number("zoom"), Some(13.0));
        assert!(matches!(step.geometry, StepGeometry::Point(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_structure() {
        let err = parse_story(r#"{ "type": "FeatureCollection" }"#).unwrap_err();
        assert!(matches!(err, StoryDataError::Invalid(_)));
        assert!(err.to_string().contains("features"));
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": { "type": "Point", "coordinates": "here" }, "properties": {} }
            ]
        }"#;
        assert!(matches!(parse_story(text), Err(StoryDataError::Json(_))));
    }

    #[test]
    fn test_loads_every_valid_story() {
        let value = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": {}, "properties": { "title": "No shape" } },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-122.4194, 37.7749] },
                    "properties": { "title": 42 }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-122.4183, 37.8199] },
                    "properties": { "title": "Bridge", "action": null }
                }
            ]
        });
        assert!(validate_story(&value));

        let story = story_from_value(value).unwrap();
        assert_eq!(story.len(), 3);

        let shapeless = story.get(0).unwrap();
        assert_eq!(shapeless.title(), Some("No shape"));
        assert!(matches!(shapeless.geometry, StepGeometry::Other { .. }));

        let numbered = story.get(1).unwrap();
        assert!(numbered.title().is_none());
        assert_eq!(numbered.properties.number("title"), Some(42.0));

        let bridge = story.get(2).unwrap();
        assert_eq!(bridge.title(), Some("Bridge"));
        assert!(bridge.action().is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(parse_story("{"), Err(StoryDataError::Json(_))));
    }
}
