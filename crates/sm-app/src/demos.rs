//! Demo stories shipped with the viewer

use sm_core::actions::{FIT_BOUNDS, FLY_TO};
use sm_core::{ActionError, ActionOverrides, Position, Story, StoryStep, StyleSpec};
use sm_data::{sample_story, MapConfig, MapLibrary, MountConfig};

use crate::custom_actions::{
    draw_circle, enable_3d, show_alcatraz_popup, show_step_popup, switch_to_satellite, DRAW_CIRCLE,
    ENABLE_3D, SATELLITE_STYLE, SHOW_POPUP, SWITCH_TO_SATELLITE,
};

/// A story with the map settings and actions it is meant to run with
pub struct Demo {
    pub name: &'static str,
    pub summary: &'static str,
    pub story: Story,
    pub style: Option<&'static str>,
    pub zoom: f64,
    overrides: fn() -> Result<ActionOverrides, ActionError>,
}

impl Demo {
    pub fn overrides(&self) -> Result<ActionOverrides, ActionError> {
        (self.overrides)()
    }

    /// Mount configuration for this demo. Without an access token the map
    /// falls back to MapLibre with its OpenStreetMap style.
    pub fn mount_config(&self, access_token: Option<&str>) -> MountConfig {
        let map = match access_token {
            Some(token) => MapConfig {
                style: self.style.map(|url| StyleSpec::Url(url.to_string())),
                zoom: self.zoom,
                ..MapConfig::default().with_access_token(token)
            },
            None => MapConfig {
                zoom: self.zoom,
                ..MapConfig::default().with_library(MapLibrary::Maplibre)
            },
        };
        MountConfig::new(map, self.story.clone())
    }
}

fn no_overrides() -> Result<ActionOverrides, ActionError> {
    Ok(ActionOverrides::new())
}

fn popup_overrides() -> Result<ActionOverrides, ActionError> {
    ActionOverrides::new().with(SHOW_POPUP, show_step_popup)
}

fn advanced_overrides() -> Result<ActionOverrides, ActionError> {
    ActionOverrides::new()
        .with(ENABLE_3D, enable_3d)?
        .with(SWITCH_TO_SATELLITE, switch_to_satellite)?
        .with(DRAW_CIRCLE, draw_circle)?
        .with(SHOW_POPUP, show_alcatraz_popup)
}

fn custom_actions_story() -> Story {
    let financial_district = vec![
        Position::new(-122.4353, 37.7749),
        Position::new(-122.4053, 37.7749),
        Position::new(-122.4053, 37.7949),
        Position::new(-122.4353, 37.7949),
        Position::new(-122.4353, 37.7749),
    ];

    vec![
        StoryStep::polygon(financial_district)
            .with_title("Financial District")
            .with_description("Using fitBounds to frame a neighborhood polygon.")
            .with_action(FIT_BOUNDS),
        StoryStep::point(-122.4183, 37.8199)
            .with_title("Golden Gate Bridge")
            .with_description("Custom action adds a popup marker.")
            .with_action(SHOW_POPUP),
        StoryStep::point(-122.4194, 37.7749)
            .with_title("Union Square")
            .with_description("Standard flyTo action with custom zoom level.")
            .with_action(FLY_TO)
            .with_property("zoom", 15),
    ]
    .into_iter()
    .collect()
}

fn advanced_actions_story() -> Story {
    vec![
        StoryStep::point(-122.4194, 37.7749)
            .with_title("Downtown San Francisco")
            .with_description("Enabling 3D buildings layer to see the skyline.")
            .with_action(ENABLE_3D),
        StoryStep::point(-122.4183, 37.8199)
            .with_title("Golden Gate Bridge")
            .with_description("Switching to satellite view to see terrain.")
            .with_action(SWITCH_TO_SATELLITE),
        StoryStep::point(-122.4177, 37.8099)
            .with_title("Presidio")
            .with_description("Drawing a 500m radius circle around the Presidio.")
            .with_action(DRAW_CIRCLE)
            .with_property("radius", 500),
        StoryStep::point(-122.4230, 37.8267)
            .with_title("Alcatraz Island")
            .with_description("Showing a custom popup with rich HTML content.")
            .with_action(SHOW_POPUP),
    ]
    .into_iter()
    .collect()
}

pub fn demo_catalog() -> Vec<Demo> {
    vec![
        Demo {
            name: "San Francisco tour",
            summary: "Four landmarks, each reached with flyTo.",
            story: sample_story(),
            style: Some("mapbox://styles/mapbox/dark-v11"),
            zoom: 12.0,
            overrides: no_overrides,
        },
        Demo {
            name: "Satellite tour",
            summary: "The same tour with a satellite map style.",
            story: sample_story(),
            style: Some(SATELLITE_STYLE),
            zoom: 11.0,
            overrides: no_overrides,
        },
        Demo {
            name: "Custom actions",
            summary: "Polygon fitBounds, a popup action and a flyTo with custom zoom.",
            story: custom_actions_story(),
            style: Some("mapbox://styles/mapbox/dark-v11"),
            zoom: 12.0,
            overrides: popup_overrides,
        },
        Demo {
            name: "Advanced actions",
            summary: "3D buildings, style switching, drawn geometry and rich popups.",
            story: advanced_actions_story(),
            style: Some("mapbox://styles/mapbox/dark-v11"),
            zoom: 12.0,
            overrides: advanced_overrides,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_core::ActionRegistry;
    use sm_data::validate_story;

    #[test]
    fn test_demo_stories_are_valid() {
        for demo in demo_catalog() {
            let value = serde_json::to_value(&demo.story).unwrap();
            assert!(validate_story(&value), "{} is not a valid story", demo.name);
        }
    }

    #[test]
    fn test_every_named_action_resolves() {
        for demo in demo_catalog() {
            let registry = ActionRegistry::merge(demo.overrides().unwrap());
            for step in demo.story.iter() {
                if let Some(action) = step.action() {
                    assert!(registry.contains(action), "{}: no handler for {}", demo.name, action);
                }
            }
        }
    }

    #[test]
    fn test_mount_config_picks_library_from_token() {
        let demo = &demo_catalog()[1];

        let mapbox = demo.mount_config(Some("pk.test"));
        assert_eq!(mapbox.map.library, MapLibrary::Mapbox);
        assert_eq!(mapbox.map.style, Some(StyleSpec::Url(SATELLITE_STYLE.to_string())));
        assert_eq!(mapbox.map.zoom, 11.0);

        let maplibre = demo.mount_config(None);
        assert_eq!(maplibre.map.library, MapLibrary::Maplibre);
        assert_eq!(maplibre.map.style, None);
        assert_eq!(maplibre.story.len(), 4);
    }
}
