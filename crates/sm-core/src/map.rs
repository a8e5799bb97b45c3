//! Contract between the story engine and a live map surface
//!
//! The engine never creates or destroys a map. It only receives a ready
//! [`MapHandle`] and lets step actions drive it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::story::Position;

/// Callback fired once when a (re)loaded style becomes usable
pub type StyleLoadCallback = Box<dyn FnOnce() + Send + 'static>;

/// Errors reported by map surfaces
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("Map has been removed")]
    Removed,

    #[error("Source '{0}' already exists")]
    DuplicateSource(String),

    #[error("Source '{0}' not found")]
    UnknownSource(String),

    #[error("Layer '{0}' already exists")]
    DuplicateLayer(String),

    #[error("Layer '{0}' not found")]
    UnknownLayer(String),

    #[error("Layer '{layer}' references missing source '{source_id}'")]
    MissingLayerSource { layer: String, source_id: String },

    #[error("Source '{0}' is still used by a layer")]
    SourceInUse(String),

    #[error("Invalid style: {0}")]
    Style(String),

    #[error("Map container '{0}' is unavailable")]
    Container(String),

    #[error("Access token rejected: {0}")]
    AccessToken(String),
}

/// A map style: either a style URL or an inline style document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleSpec {
    Url(String),
    Document(Value),
}

/// Current camera of a map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: Position,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

/// Target of a camera move. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraOptions {
    pub center: Option<Position>,
    pub zoom: Option<f64>,
    pub bearing: Option<f64>,
    pub pitch: Option<f64>,
    /// Animation length in milliseconds
    pub duration_ms: Option<u64>,
}

/// Options for [`MapHandle::fit_bounds`]
#[derive(Debug, Clone, PartialEq)]
pub struct FitBoundsOptions {
    /// Padding around the bounds, in pixels
    pub padding: f64,
    pub max_zoom: Option<f64>,
    pub duration_ms: Option<u64>,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            padding: 40.0,
            max_zoom: None,
            duration_ms: None,
        }
    }
}

/// Axis-aligned geographic bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLatBounds {
    pub south_west: Position,
    pub north_east: Position,
}

impl LngLatBounds {
    pub fn new(south_west: Position, north_east: Position) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.south_west.lng + self.north_east.lng) / 2.0,
            (self.south_west.lat + self.north_east.lat) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.north_east.lng - self.south_west.lng
    }

    pub fn height(&self) -> f64 {
        self.north_east.lat - self.south_west.lat
    }
}

/// A style layer definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub id: String,

    /// Layer type (`fill`, `line`, `raster`, `fill-extrusion`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Remaining style-spec fields (`paint`, `layout`, filters, ...)
    #[serde(flatten)]
    pub definition: serde_json::Map<String, Value>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            source: None,
            definition: serde_json::Map::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.definition.insert(key.into(), value.into());
        self
    }
}

/// An informational popup anchored at a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popup {
    pub position: Position,
    pub html: String,
}

/// A ready, interactive map surface
///
/// Mutating calls on a removed map are ignored; fallible calls return
/// [`MapError::Removed`].
pub trait MapHandle: Send + Sync {
    /// Name of the map library driving this surface
    fn library_name(&self) -> &str;

    fn camera(&self) -> Camera;

    /// Animated camera move
    fn fly_to(&self, options: CameraOptions);

    /// Instant camera move
    fn jump_to(&self, options: CameraOptions);

    fn fit_bounds(&self, bounds: LngLatBounds, options: FitBoundsOptions);

    /// Replace the style. Sources and layers added at runtime are dropped.
    fn set_style(&self, style: StyleSpec);

    fn style(&self) -> Option<StyleSpec>;

    fn is_style_loaded(&self) -> bool;

    /// Run `callback` the next time the style finishes loading
    fn once_style_load(&self, callback: StyleLoadCallback);

    fn add_source(&self, id: &str, source: Value) -> Result<(), MapError>;

    fn remove_source(&self, id: &str) -> Result<(), MapError>;

    fn has_source(&self, id: &str) -> bool;

    fn add_layer(&self, layer: LayerSpec) -> Result<(), MapError>;

    fn remove_layer(&self, id: &str) -> Result<(), MapError>;

    fn has_layer(&self, id: &str) -> bool;

    fn add_popup(&self, popup: Popup);

    /// Tear the surface down. Idempotent.
    fn remove(&self);

    fn is_removed(&self) -> bool;
}
