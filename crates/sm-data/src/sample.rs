//! Demo story data

use sm_core::actions::FLY_TO;
use sm_core::{Story, StoryStep};

/// A four-stop tour of San Francisco landmarks
pub fn sample_story() -> Story {
    vec![
        StoryStep::point(-122.4194, 37.7749)
            .with_title("Welcome to San Francisco")
            .with_description("Our journey begins in the heart of the city.")
            .with_action(FLY_TO),
        StoryStep::point(-122.4183, 37.8199)
            .with_title("Golden Gate Bridge")
            .with_description("An iconic landmark spanning the Golden Gate strait.")
            .with_action(FLY_TO),
        StoryStep::point(-122.4177, 37.8099)
            .with_title("Presidio")
            .with_description("A historic military post turned national park.")
            .with_action(FLY_TO),
        StoryStep::point(-122.4058, 37.8021)
            .with_title("Fort Mason")
            .with_description("A former US Army post with stunning bay views.")
            .with_action(FLY_TO),
    ]
    .into_iter()
    .collect()
}
