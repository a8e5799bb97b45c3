//! Core of the narrative map story engine
//!
//! This crate owns the story model, the contract a live map must satisfy,
//! the action registry and the navigation engine that walks a map through
//! the steps of a story.

pub mod actions;
pub mod map;
pub mod navigation;
pub mod story;

#[cfg(test)]
mod test_map;

// Re-export commonly used types
pub use actions::{ActionError, ActionOverrides, ActionRegistry, MapAction, SharedAction};
pub use map::{
    Camera, CameraOptions, FitBoundsOptions, LayerSpec, LngLatBounds, MapError, MapHandle, Popup,
    StyleLoadCallback, StyleSpec,
};
pub use navigation::{
    EngineOptions, EngineStatus, StepChange, StoryEngine, StorySubscriber, SubscriberSet, Subscription,
};
pub use story::{GeometryError, Position, Ring, StepGeometry, StepProperties, Story, StoryStep};
