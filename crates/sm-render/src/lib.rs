//! Map surfaces and their lifecycle
//!
//! A [`MapBackend`] knows how to build one kind of map surface. A
//! [`MapLifecycle`] owns a single map slot and turns a backend's load event
//! into a readiness future that resolves exactly once.

pub mod backend;
pub mod headless;
pub mod lifecycle;

use sm_core::MapError;
use thiserror::Error;

pub use backend::{
    mapbox_default_style, maplibre_default_style, HeadlessBackend, MapBackend, PendingMap,
    MAPBOX_DEFAULT_STYLE,
};
pub use headless::{world_fraction, HeadlessMap, MapSnapshot};
pub use lifecycle::{LifecycleState, MapLifecycle};

/// Errors that end a map creation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Map initialization failed: {0}")]
    Initialization(#[from] MapError),

    #[error("Map creation was cancelled")]
    Cancelled,

    #[error("Map surface went away before loading")]
    ReadinessDropped,
}
