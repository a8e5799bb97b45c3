//! egui components for story maps
//!
//! Renders a [`sm_views::StoryMount`]: the map viewport with the story drawn
//! over it, and the step controls underneath.

pub mod controls;
pub mod theme;
pub mod viewport;

pub use controls::{StoryCommand, StoryControls, StoryControlsConfig};
pub use theme::{apply_theme, Palette, Theme};
pub use viewport::{MapViewport, Projection};

/// Panel IDs
pub mod panel_ids {
    pub const CONTROLS: &str = "story_controls";
    pub const STORY_PICKER: &str = "story_picker";
}
