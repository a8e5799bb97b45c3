//! Structural validation of story documents
//!
//! Only the GeoJSON envelope is checked: coordinates, geometry/action
//! compatibility and property types are left alone.

use std::fmt;

use serde_json::Value;

/// Type tag of a story document
pub const FEATURE_COLLECTION: &str = "FeatureCollection";

/// Type tag of a story step
pub const FEATURE: &str = "Feature";

/// Why a candidate is not a story
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    NotAnObject,
    WrongCollectionType { found: Option<String> },
    MissingFeatures,
    FeatureNotAnObject { index: usize },
    WrongFeatureType { index: usize, found: Option<String> },
    MissingGeometry { index: usize },
    MissingProperties { index: usize },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NotAnObject => write!(f, "story is not an object"),
            ValidationIssue::WrongCollectionType { found } => {
                write!(f, "expected type \"{}\", found {:?}", FEATURE_COLLECTION, found)
            }
            ValidationIssue::MissingFeatures => write!(f, "\"features\" is not an array"),
            ValidationIssue::FeatureNotAnObject { index } => {
                write!(f, "feature {} is not an object", index)
            }
            ValidationIssue::WrongFeatureType { index, found } => {
                write!(f, "feature {}: expected type \"{}\", found {:?}", index, FEATURE, found)
            }
            ValidationIssue::MissingGeometry { index } => {
                write!(f, "feature {}: \"geometry\" is not an object", index)
            }
            ValidationIssue::MissingProperties { index } => {
                write!(f, "feature {}: \"properties\" is not an object", index)
            }
        }
    }
}

/// Whether `candidate` is a well-formed story document
pub fn validate_story(candidate: &Value) -> bool {
    validation_errors(candidate).is_empty()
}

/// Every structural problem of `candidate`. Envelope problems stop the
/// check; otherwise the first problem of each feature is reported.
pub fn validation_errors(candidate: &Value) -> Vec<ValidationIssue> {
    let Some(object) = candidate.as_object() else {
        return vec![ValidationIssue::NotAnObject];
    };

    let kind = object.get("type").and_then(Value::as_str);
    if kind != Some(FEATURE_COLLECTION) {
        return vec![ValidationIssue::WrongCollectionType {
            found: kind.map(str::to_string),
        }];
    }

    let Some(features) = object.get("features").and_then(Value::as_array) else {
        return vec![ValidationIssue::MissingFeatures];
    };

    features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| feature_issue(index, feature))
        .collect()
}

fn feature_issue(index: usize, feature: &Value) -> Option<ValidationIssue> {
    let Some(feature) = feature.as_object() else {
        return Some(ValidationIssue::FeatureNotAnObject { index });
    };

    let kind = feature.get("type").and_then(Value::as_str);
    if kind != Some(FEATURE) {
        return Some(ValidationIssue::WrongFeatureType {
            index,
            found: kind.map(str::to_string),
        });
    }

    if !feature.get("geometry").map(Value::is_object).unwrap_or(false) {
        return Some(ValidationIssue::MissingGeometry { index });
    }

    if !feature.get("properties").map(Value::is_object).unwrap_or(false) {
        return Some(ValidationIssue::MissingProperties { index });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_minimal_story() {
        let story = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": {}, "properties": {} }
            ]
        });
        assert!(validate_story(&story));
    }

    #[test]
    fn test_accepts_empty_story() {
        assert!(validate_story(&json!({ "type": "FeatureCollection", "features": [] })));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(!validate_story(&Value::Null));
        assert!(!validate_story(&json!("FeatureCollection")));
        assert!(!validate_story(&json!([])));
        assert_eq!(validation_errors(&json!(42)), vec![ValidationIssue::NotAnObject]);
    }

    #[test]
    fn test_rejects_wrong_collection_type() {
        let issues = validation_errors(&json!({ "type": "Feature", "features": [] }));
        assert_eq!(
            issues,
            vec![ValidationIssue::WrongCollectionType { found: Some("Feature".to_string()) }]
        );
    }

    #[test]
    fn test_rejects_missing_features() {
        let issues = validation_errors(&json!({ "type": "FeatureCollection", "features": {} }));
        assert_eq!(issues, vec![ValidationIssue::MissingFeatures]);
    }

    #[test]
    fn test_reports_each_bad_feature() {
        let story = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": {}, "properties": {} },
                null,
                { "type": "Point", "geometry": {}, "properties": {} },
                { "type": "Feature", "properties": {} },
                { "type": "Feature", "geometry": {}, "properties": null }
            ]
        });

        assert_eq!(
            validation_errors(&story),
            vec![
                ValidationIssue::FeatureNotAnObject { index: 1 },
                ValidationIssue::WrongFeatureType { index: 2, found: Some("Point".to_string()) },
                ValidationIssue::MissingGeometry { index: 3 },
                ValidationIssue::MissingProperties { index: 4 },
            ]
        );
        assert!(!validate_story(&story));
    }
}
