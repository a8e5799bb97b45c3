//! In-memory map surface
//!
//! Keeps camera, style, sources, layers and popups the way a browser map
//! would, without drawing anything. Load events are emitted on the tokio
//! runtime after a configurable delay.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::Mutex;
use serde_json::Value;
use sm_core::{
    Camera, CameraOptions, FitBoundsOptions, LayerSpec, LngLatBounds, MapError, MapHandle, Popup,
    Position, StyleLoadCallback, StyleSpec,
};
use sm_data::MapConfig;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Width of a world tile in pixels
pub const TILE_SIZE: f64 = 512.0;

pub const MAX_ZOOM: f64 = 22.0;

const DEFAULT_VIEWPORT: [f64; 2] = [800.0, 600.0];

/// Web-Mercator position of `position` as a fraction of the world, origin
/// top-left
pub fn world_fraction(position: Position) -> [f64; 2] {
    let x = (position.lng + 180.0) / 360.0;
    let sin = position.lat.to_radians().sin().clamp(-0.9999, 0.9999);
    let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI);
    [x, y]
}

/// Everything a viewer needs to draw the surface
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub library: String,
    pub camera: Camera,
    pub style: Option<StyleSpec>,
    pub style_loaded: bool,
    /// Sources sorted by id
    pub sources: Vec<(String, Value)>,
    /// Layers in draw order
    pub layers: Vec<LayerSpec>,
    pub popups: Vec<Popup>,
    pub viewport: [f64; 2],
    pub removed: bool,
}

struct SurfaceState {
    camera: Camera,
    style: Option<StyleSpec>,
    style_loaded: bool,
    style_generation: u64,
    sources: AHashMap<String, Value>,
    layers: Vec<LayerSpec>,
    popups: Vec<Popup>,
    style_callbacks: Vec<StyleLoadCallback>,
    viewport: [f64; 2],
    removed: bool,
}

/// A map surface living entirely in memory
pub struct HeadlessMap {
    library: String,
    container: String,
    load_delay: Duration,
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessMap {
    /// A surface positioned per `config`, with `style` not yet loaded
    pub fn new(library: impl Into<String>, config: &MapConfig, style: StyleSpec) -> Arc<Self> {
        let state = SurfaceState {
            camera: Camera {
                center: config.center,
                zoom: config.zoom,
                bearing: 0.0,
                pitch: 0.0,
            },
            style: Some(style),
            style_loaded: false,
            style_generation: 0,
            sources: AHashMap::new(),
            layers: Vec::new(),
            popups: Vec::new(),
            style_callbacks: Vec::new(),
            viewport: DEFAULT_VIEWPORT,
            removed: false,
        };

        Arc::new(Self {
            library: library.into(),
            container: config.container.clone(),
            load_delay: Duration::from_millis(config.load_delay_ms),
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Start loading the current style. The receiver fires once with the
    /// outcome of this load.
    pub fn begin_load(&self) -> oneshot::Receiver<Result<(), MapError>> {
        let generation = {
            let mut state = self.state.lock();
            state.style_generation += 1;
            state.style_loaded = false;
            state.sources.clear();
            state.layers.clear();
            state.style_generation
        };

        let (tx, rx) = oneshot::channel();
        let state = self.state.clone();
        let delay = self.load_delay;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let _ = tx.send(finish_load(&state, generation));
                });
            }
            Err(_) => {
                let _ = tx.send(finish_load(&state, generation));
            }
        }

        rx
    }

    /// Resize the area camera fits are computed against
    pub fn set_viewport_size(&self, width: f64, height: f64) {
        self.state.lock().viewport = [width.max(1.0), height.max(1.0)];
    }

    pub fn clear_popups(&self) {
        self.state.lock().popups.clear();
    }

    pub fn snapshot(&self) -> MapSnapshot {
        let state = self.state.lock();
        let mut sources: Vec<(String, Value)> = state
            .sources
            .iter()
            .map(|(id, source)| (id.clone(), source.clone()))
            .collect();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        MapSnapshot {
            library: self.library.clone(),
            camera: state.camera,
            style: state.style.clone(),
            style_loaded: state.style_loaded,
            sources,
            layers: state.layers.clone(),
            popups: state.popups.clone(),
            viewport: state.viewport,
            removed: state.removed,
        }
    }

    fn move_camera(&self, options: CameraOptions, animated: bool) {
        let mut state = self.state.lock();
        if state.removed {
            return;
        }

        let camera = &mut state.camera;
        if let Some(center) = options.center {
            camera.center = center;
        }
        if let Some(zoom) = options.zoom {
            camera.zoom = zoom.clamp(0.0, MAX_ZOOM);
        }
        if let Some(bearing) = options.bearing {
            camera.bearing = bearing;
        }
        if let Some(pitch) = options.pitch {
            camera.pitch = pitch.clamp(0.0, 85.0);
        }

        debug!(
            "Camera {} to {:?} (duration {:?}ms)",
            if animated { "flew" } else { "jumped" },
            camera,
            options.duration_ms
        );
    }
}

/// Resolve a style into its base sources and layers
fn style_contents(style: &StyleSpec) -> Result<(AHashMap<String, Value>, Vec<LayerSpec>), MapError> {
    match style {
        StyleSpec::Url(url) if url.trim().is_empty() => Err(MapError::Style("empty style URL".into())),
        StyleSpec::Url(_) => Ok((AHashMap::new(), Vec::new())),
        StyleSpec::Document(document) => {
            if document.get("version").and_then(Value::as_u64) != Some(8) {
                return Err(MapError::Style("style document must declare version 8".into()));
            }

            let sources = match document.get("sources") {
                None => AHashMap::new(),
                Some(Value::Object(sources)) => {
                    sources.iter().map(|(id, s)| (id.clone(), s.clone())).collect()
                }
                Some(_) => return Err(MapError::Style("\"sources\" must be an object".into())),
            };

            let layers = match document.get("layers") {
                None => Vec::new(),
                Some(layers) => serde_json::from_value::<Vec<LayerSpec>>(layers.clone())
                    .map_err(|e| MapError::Style(e.to_string()))?,
            };

            Ok((sources, layers))
        }
    }
}

fn finish_load(state: &Mutex<SurfaceState>, generation: u64) -> Result<(), MapError> {
    let callbacks = {
        let mut state = state.lock();
        if state.removed {
            return Err(MapError::Removed);
        }
        if state.style_generation != generation {
            // A newer style load owns the surface now
            return Ok(());
        }

        let style = state
            .style
            .clone()
            .ok_or_else(|| MapError::Style("no style set".into()))?;
        let (sources, layers) = style_contents(&style).map_err(|err| {
            warn!("Style failed to load: {}", err);
            err
        })?;

        state.sources = sources;
        state.layers = layers;
        state.style_loaded = true;
        std::mem::take(&mut state.style_callbacks)
    };

    for callback in callbacks {
        callback();
    }
    Ok(())
}

impl MapHandle for HeadlessMap {
    fn library_name(&self) -> &str {
        &self.library
    }

    fn camera(&self) -> Camera {
        self.state.lock().camera
    }

    fn fly_to(&self, options: CameraOptions) {
        self.move_camera(options, true);
    }

    fn jump_to(&self, options: CameraOptions) {
        self.move_camera(options, false);
    }

    fn fit_bounds(&self, bounds: LngLatBounds, options: FitBoundsOptions) {
        let viewport = self.state.lock().viewport;

        let sw = world_fraction(bounds.south_west);
        let ne = world_fraction(bounds.north_east);
        let dx = (ne[0] - sw[0]).abs().max(1e-9);
        let dy = (ne[1] - sw[1]).abs().max(1e-9);
        let width = (viewport[0] - 2.0 * options.padding).max(1.0);
        let height = (viewport[1] - 2.0 * options.padding).max(1.0);

        let zoom = (width / (dx * TILE_SIZE))
            .min(height / (dy * TILE_SIZE))
            .log2()
            .clamp(0.0, options.max_zoom.unwrap_or(MAX_ZOOM).max(0.0));

        self.move_camera(
            CameraOptions {
                center: Some(bounds.center()),
                zoom: Some(zoom),
                bearing: None,
                pitch: None,
                duration_ms: options.duration_ms,
            },
            true,
        );
    }

    fn set_style(&self, style: StyleSpec) {
        {
            let mut state = self.state.lock();
            if state.removed {
                return;
            }
            state.style = Some(style);
        }
        // Nobody waits on a restyle; failures are logged by the loader
        drop(self.begin_load());
    }

    fn style(&self) -> Option<StyleSpec> {
        self.state.lock().style.clone()
    }

    fn is_style_loaded(&self) -> bool {
        self.state.lock().style_loaded
    }

    fn once_style_load(&self, callback: StyleLoadCallback) {
        let mut state = self.state.lock();
        if !state.removed {
            state.style_callbacks.push(callback);
        }
    }

    fn add_source(&self, id: &str, source: Value) -> Result<(), MapError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(MapError::Removed);
        }
        if state.sources.contains_key(id) {
            return Err(MapError::DuplicateSource(id.to_string()));
        }
        state.sources.insert(id.to_string(), source);
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<(), MapError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(MapError::Removed);
        }
        if !state.sources.contains_key(id) {
            return Err(MapError::UnknownSource(id.to_string()));
        }
        if state.layers.iter().any(|layer| layer.source.as_deref() == Some(id)) {
            return Err(MapError::SourceInUse(id.to_string()));
        }
        state.sources.remove(id);
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.lock().sources.contains_key(id)
    }

    fn add_layer(&self, layer: LayerSpec) -> Result<(), MapError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(MapError::Removed);
        }
        if state.layers.iter().any(|existing| existing.id == layer.id) {
            return Err(MapError::DuplicateLayer(layer.id));
        }
        if let Some(source) = &layer.source {
            if !state.sources.contains_key(source) {
                return Err(MapError::MissingLayerSource {
                    layer: layer.id.clone(),
                    source_id: source.clone(),
                });
            }
        }
        state.layers.push(layer);
        Ok(())
    }

    fn remove_layer(&self, id: &str) -> Result<(), MapError> {
        let mut state = self.state.lock();
        if state.removed {
            return Err(MapError::Removed);
        }
        let before = state.layers.len();
        state.layers.retain(|layer| layer.id != id);
        if state.layers.len() == before {
            return Err(MapError::UnknownLayer(id.to_string()));
        }
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.lock().layers.iter().any(|layer| layer.id == id)
    }

    fn add_popup(&self, popup: Popup) {
        let mut state = self.state.lock();
        if !state.removed {
            state.popups.push(popup);
        }
    }

    fn remove(&self) {
        let mut state = self.state.lock();
        if state.removed {
            return;
        }
        state.removed = true;
        state.sources.clear();
        state.layers.clear();
        state.popups.clear();
        state.style_callbacks.clear();
        debug!("Removed {} map from '{}'", self.library, self.container);
    }

    fn is_removed(&self) -> bool {
        self.state.lock().removed
    }
}
