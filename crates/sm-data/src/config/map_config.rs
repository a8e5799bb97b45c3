//! Map construction configuration

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sm_core::{Position, StyleSpec};

/// Default map centre (downtown San Francisco)
pub const DEFAULT_CENTER: Position = Position::new(-122.4194, 37.7749);

/// Default initial zoom
pub const DEFAULT_ZOOM: f64 = 12.0;

/// Map rendering library backing a map slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapLibrary {
    #[default]
    Mapbox,
    Maplibre,
}

impl MapLibrary {
    pub fn name(&self) -> &'static str {
        match self {
            MapLibrary::Mapbox => "mapbox",
            MapLibrary::Maplibre => "maplibre",
        }
    }
}

impl fmt::Display for MapLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MapLibrary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mapbox" | "mapbox-gl" => Ok(MapLibrary::Mapbox),
            "maplibre" | "maplibre-gl" => Ok(MapLibrary::Maplibre),
            other => Err(format!("Unknown map library '{}'", other)),
        }
    }
}

/// Everything needed to create one map instance
///
/// The access token lives here, scoped to the instance, rather than in any
/// library-wide setting.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Identifier of the container the map renders into
    pub container: String,

    /// Base style; each library falls back to its own default
    pub style: Option<StyleSpec>,

    pub center: Position,

    pub zoom: f64,

    pub access_token: Option<String>,

    pub library: MapLibrary,

    /// Simulated time until the load event, for headless surfaces
    pub load_delay_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            container: "map".to_string(),
            style: None,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            access_token: None,
            library: MapLibrary::default(),
            load_delay_ms: 50,
        }
    }
}

impl MapConfig {
    pub fn with_library(mut self, library: MapLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_style(mut self, style: StyleSpec) -> Self {
        self.style = Some(style);
        self
    }

    /// Whether switching from `self` to `other` needs a fresh map.
    /// Camera fields can be applied to a live map; nothing else can.
    pub fn requires_recreate(&self, other: &MapConfig) -> bool {
        self.container != other.container
            || self.style != other.style
            || self.access_token != other.access_token
            || self.library != other.library
    }
}

impl fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapConfig")
            .field("container", &self.container)
            .field("style", &self.style)
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("library", &self.library)
            .field("load_delay_ms", &self.load_delay_ms)
            .finish()
    }
}
