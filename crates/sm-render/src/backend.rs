//! Map backends: one per supported map library

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::json;
use sm_core::{MapError, MapHandle, StyleSpec};
use sm_data::{MapConfig, MapLibrary};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::headless::HeadlessMap;

/// Style used by Mapbox maps that do not name one
pub const MAPBOX_DEFAULT_STYLE: &str = "mapbox://styles/mapbox/dark-v11";

pub fn mapbox_default_style() -> StyleSpec {
    StyleSpec::Url(MAPBOX_DEFAULT_STYLE.to_string())
}

/// OpenStreetMap raster tiles, used by MapLibre maps that do not name a style
pub fn maplibre_default_style() -> StyleSpec {
    StyleSpec::Document(json!({
        "version": 8,
        "sources": {
            "osm-tiles": {
                "type": "raster",
                "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
                "tileSize": 256,
                "attribution": "© OpenStreetMap contributors"
            }
        },
        "layers": [
            {
                "id": "osm-tiles",
                "type": "raster",
                "source": "osm-tiles",
                "minzoom": 0,
                "maxzoom": 19
            }
        ]
    }))
}

/// A freshly constructed map that has not loaded yet
pub struct PendingMap {
    pub handle: Arc<dyn MapHandle>,

    /// Fires once with the outcome of the initial load
    pub ready: oneshot::Receiver<Result<(), MapError>>,
}

/// Builds map surfaces for one library
pub trait MapBackend: Send + Sync {
    fn library(&self) -> MapLibrary;

    /// Construct a map. Configuration problems that are known up front are
    /// returned directly; everything else arrives through `ready`.
    fn create(&self, config: &MapConfig) -> Result<PendingMap, MapError>;
}

/// Backend producing [`HeadlessMap`] surfaces that behave like the given
/// library
pub struct HeadlessBackend {
    library: MapLibrary,
    latest: Mutex<Option<Weak<HeadlessMap>>>,
}

impl HeadlessBackend {
    pub fn new(library: MapLibrary) -> Self {
        Self {
            library,
            latest: Mutex::new(None),
        }
    }

    pub fn mapbox() -> Self {
        Self::new(MapLibrary::Mapbox)
    }

    pub fn maplibre() -> Self {
        Self::new(MapLibrary::Maplibre)
    }

    /// The most recently created surface, while it is still alive
    pub fn latest_surface(&self) -> Option<Arc<HeadlessMap>> {
        self.latest.lock().as_ref().and_then(Weak::upgrade)
    }

    pub fn default_style(&self) -> StyleSpec {
        match self.library {
            MapLibrary::Mapbox => mapbox_default_style(),
            MapLibrary::Maplibre => maplibre_default_style(),
        }
    }
}

impl MapBackend for HeadlessBackend {
    fn library(&self) -> MapLibrary {
        self.library
    }

    fn create(&self, config: &MapConfig) -> Result<PendingMap, MapError> {
        if config.container.trim().is_empty() {
            return Err(MapError::Container(config.container.clone()));
        }

        if self.library == MapLibrary::Mapbox {
            let has_token = config
                .access_token
                .as_deref()
                .map(|token| !token.trim().is_empty())
                .unwrap_or(false);
            if !has_token {
                return Err(MapError::AccessToken(
                    "Mapbox maps need an access token in their configuration".to_string(),
                ));
            }
        }

        if config.library != self.library {
            debug!(
                "Configuration asks for {} but this backend builds {} maps",
                config.library, self.library
            );
        }

        let style = config.style.clone().unwrap_or_else(|| self.default_style());
        let map = HeadlessMap::new(self.library.name(), config, style);
        let ready = map.begin_load();
        *self.latest.lock() = Some(Arc::downgrade(&map));

        info!("Created {} map in container '{}'", self.library, config.container);

        Ok(PendingMap { handle: map, ready })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapbox_requires_token() {
        let backend = HeadlessBackend::mapbox();

        let missing = backend.create(&MapConfig::default());
        assert!(matches!(missing, Err(MapError::AccessToken(_))));

        let blank = backend.create(&MapConfig::default().with_access_token("  "));
        assert!(matches!(blank, Err(MapError::AccessToken(_))));

        let config = MapConfig::default().with_access_token("pk.test");
        let pending = backend.create(&config).unwrap();
        assert_eq!(pending.handle.library_name(), "mapbox");
        assert_eq!(pending.handle.style(), Some(mapbox_default_style()));
    }

    #[test]
    fn test_maplibre_needs_no_token_and_uses_osm() {
        let backend = HeadlessBackend::maplibre();
        let config = MapConfig::default().with_library(MapLibrary::Maplibre);

        let mut pending = backend.create(&config).unwrap();
        assert_eq!(pending.ready.try_recv().unwrap(), Ok(()));
        assert_eq!(pending.handle.style(), Some(maplibre_default_style()));
        assert!(pending.handle.has_source("osm-tiles"));
        assert!(pending.handle.has_layer("osm-tiles"));
    }

    #[test]
    fn test_missing_container_is_rejected() {
        let backend = HeadlessBackend::maplibre();
        let config = MapConfig {
            container: String::new(),
            ..MapConfig::default()
        };
        assert!(matches!(backend.create(&config), Err(MapError::Container(_))));
    }

    #[test]
    fn test_explicit_style_wins() {
        let backend = HeadlessBackend::mapbox();
        let style = StyleSpec::Url("mapbox://styles/mapbox/streets-v12".into());
        let config = MapConfig::default()
            .with_access_token("pk.test")
            .with_style(style.clone());

        let pending = backend.create(&config).unwrap();
        assert_eq!(pending.handle.style(), Some(style));
    }

    #[test]
    fn test_latest_surface_tracks_live_map() {
        let backend = HeadlessBackend::maplibre();
        assert!(backend.latest_surface().is_none());

        let pending = backend.create(&MapConfig::default()).unwrap();
        assert!(backend.latest_surface().is_some());

        drop(pending);
        assert!(backend.latest_surface().is_none());
    }
}
