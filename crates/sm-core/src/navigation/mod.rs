use serde::{Deserialize, Serialize};

mod engine;
mod state;
mod subscriber;

pub use engine::StoryEngine;
pub use subscriber::{StorySubscriber, SubscriberSet, Subscription};

/// Lifecycle status of a story engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    /// No map attached yet
    Uninitialized,
    /// Map attached; navigation is live
    Ready,
    /// Torn down; terminal
    Disposed,
}

/// Payload delivered to subscribers after a successful navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepChange {
    pub index: usize,
}

/// Engine behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Run the first step's action when the map becomes ready.
    /// No notification is emitted for it.
    pub play_first_step_on_ready: bool,
}
