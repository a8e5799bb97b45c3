//! Caller-defined story actions used by the demo stories

use std::sync::Arc;

use serde_json::json;
use sm_core::{CameraOptions, LayerSpec, MapHandle, Popup, Position, StepGeometry, StoryStep, StyleSpec};
use tracing::warn;

pub const SHOW_POPUP: &str = "showPopup";
pub const DRAW_CIRCLE: &str = "drawCircle";
pub const ENABLE_3D: &str = "enable3D";
pub const SWITCH_TO_SATELLITE: &str = "switchToSatellite";

pub const SATELLITE_STYLE: &str = "mapbox://styles/mapbox/satellite-v9";

const CIRCLE_SOURCE: &str = "circle-source";
const CIRCLE_FILL: &str = "circle-layer";
const CIRCLE_OUTLINE: &str = "circle-outline";
const BUILDINGS_LAYER: &str = "3d-buildings";
const CIRCLE_COLOR: &str = "#0f766e";
const DEFAULT_RADIUS_M: f64 = 500.0;

const ALCATRAZ_HTML: &str = r#"<div style="padding: 8px;">
  <h3 style="margin: 0 0 8px 0; font-size: 16px; font-weight: 600;">Alcatraz Island</h3>
  <p style="margin: 0; font-size: 14px;">Famous federal prison from 1934-1963. Now a popular tourist destination.</p>
</div>"#;

fn point_of(step: &StoryStep) -> Option<Position> {
    match step.geometry {
        StepGeometry::Point(position) => Some(position),
        _ => None,
    }
}

fn fly(map: &Arc<dyn MapHandle>, center: Position, zoom: f64, pitch: f64, bearing: Option<f64>, duration_ms: u64) {
    map.fly_to(CameraOptions {
        center: Some(center),
        zoom: Some(zoom),
        bearing,
        pitch: Some(pitch),
        duration_ms: Some(duration_ms),
    });
}

/// Run `work` once the style can take sources and layers
fn when_style_ready(map: &Arc<dyn MapHandle>, work: impl FnOnce(&Arc<dyn MapHandle>) + Send + 'static) {
    if map.is_style_loaded() {
        work(map);
        return;
    }
    let weak = Arc::downgrade(map);
    map.once_style_load(Box::new(move || {
        if let Some(map) = weak.upgrade() {
            work(&map);
        }
    }));
}

/// Closed ring approximating a circle of `radius_m` metres around `center`
pub fn circle_ring(center: Position, radius_m: f64, steps: usize) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = (0..steps)
        .map(|i| {
            let angle = (i as f64 / steps as f64) * std::f64::consts::TAU;
            let dx = radius_m * angle.cos();
            let dy = radius_m * angle.sin();
            [center.lng + dx / 111_320.0, center.lat + dy / 110_540.0]
        })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

/// Popup built from the step's own title and description
pub fn show_step_popup(map: &Arc<dyn MapHandle>, step: &StoryStep) {
    let Some(center) = point_of(step) else {
        warn!("{}: step has no point to anchor a popup", SHOW_POPUP);
        return;
    };

    map.add_popup(Popup {
        position: center,
        html: format!(
            "<h3>{}</h3><p>{}</p>",
            step.title().unwrap_or_default(),
            step.description().unwrap_or_default()
        ),
    });
    map.fly_to(CameraOptions {
        center: Some(center),
        zoom: Some(14.0),
        duration_ms: Some(2000),
        ..CameraOptions::default()
    });
}

/// Fixed Alcatraz popup
pub fn show_alcatraz_popup(map: &Arc<dyn MapHandle>, step: &StoryStep) {
    let Some(center) = point_of(step) else {
        warn!("{}: step has no point to anchor a popup", SHOW_POPUP);
        return;
    };

    fly(map, center, 14.0, 0.0, Some(0.0), 2000);
    when_style_ready(map, move |map| {
        map.add_popup(Popup {
            position: center,
            html: ALCATRAZ_HTML.to_string(),
        });
    });
}

/// Shade a circle of `radius` metres (default 500) around the step
pub fn draw_circle(map: &Arc<dyn MapHandle>, step: &StoryStep) {
    let Some(center) = point_of(step) else {
        warn!("{}: step has no point to centre a circle on", DRAW_CIRCLE);
        return;
    };
    let radius = step
        .properties
        .number("radius")
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(DEFAULT_RADIUS_M);

    fly(map, center, 14.0, 0.0, None, 2000);
    when_style_ready(map, move |map| {
        if map.has_source(CIRCLE_SOURCE) {
            for layer in [CIRCLE_FILL, CIRCLE_OUTLINE] {
                if map.has_layer(layer) {
                    let _ = map.remove_layer(layer);
                }
            }
            let _ = map.remove_source(CIRCLE_SOURCE);
        }

        let source = json!({
            "type": "geojson",
            "data": {
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [circle_ring(center, radius, 64)] },
                "properties": {}
            }
        });
        let fill = LayerSpec::new(CIRCLE_FILL, "fill")
            .with_source(CIRCLE_SOURCE)
            .with("paint", json!({ "fill-color": CIRCLE_COLOR, "fill-opacity": 0.3 }));
        let outline = LayerSpec::new(CIRCLE_OUTLINE, "line")
            .with_source(CIRCLE_SOURCE)
            .with("paint", json!({ "line-color": CIRCLE_COLOR, "line-width": 2 }));

        let result = map
            .add_source(CIRCLE_SOURCE, source)
            .and_then(|_| map.add_layer(fill))
            .and_then(|_| map.add_layer(outline));
        if let Err(err) = result {
            warn!("{}: {}", DRAW_CIRCLE, err);
        }
    });
}

/// Tilt the camera and extrude buildings
pub fn enable_3d(map: &Arc<dyn MapHandle>, step: &StoryStep) {
    let Some(center) = point_of(step) else {
        warn!("{}: step has no point to look at", ENABLE_3D);
        return;
    };

    fly(map, center, 16.0, 60.0, Some(-17.6), 3000);
    when_style_ready(map, |map| {
        if map.has_layer(BUILDINGS_LAYER) {
            return;
        }
        if !map.has_source("composite") {
            let streets = json!({ "type": "vector", "url": "mapbox://mapbox.mapbox-streets-v8" });
            if let Err(err) = map.add_source("composite", streets) {
                warn!("{}: {}", ENABLE_3D, err);
                return;
            }
        }

        let buildings = LayerSpec::new(BUILDINGS_LAYER, "fill-extrusion")
            .with_source("composite")
            .with("source-layer", "building")
            .with("filter", json!(["==", "extrude", "true"]))
            .with("minzoom", 15)
            .with(
                "paint",
                json!({
                    "fill-extrusion-color": "#aaa",
                    "fill-extrusion-height": ["interpolate", ["linear"], ["zoom"], 15, 0, 15.05, ["get", "height"]],
                    "fill-extrusion-base": ["interpolate", ["linear"], ["zoom"], 15, 0, 15.05, ["get", "min_height"]],
                    "fill-extrusion-opacity": 0.6
                }),
            );
        if let Err(err) = map.add_layer(buildings) {
            warn!("{}: {}", ENABLE_3D, err);
        }
    });
}

/// Swap to the satellite style, then fly in once it has loaded
pub fn switch_to_satellite(map: &Arc<dyn MapHandle>, step: &StoryStep) {
    let Some(center) = point_of(step) else {
        warn!("{}: step has no point to fly to", SWITCH_TO_SATELLITE);
        return;
    };

    map.set_style(StyleSpec::Url(SATELLITE_STYLE.to_string()));
    let weak = Arc::downgrade(map);
    map.once_style_load(Box::new(move || {
        if let Some(map) = weak.upgrade() {
            fly(&map, center, 15.0, 0.0, Some(0.0), 3000);
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_data::MapConfig;
    use sm_render::{maplibre_default_style, HeadlessMap};
    use tokio::sync::oneshot;

    async fn ready_map() -> (Arc<HeadlessMap>, Arc<dyn MapHandle>) {
        let config = MapConfig {
            load_delay_ms: 0,
            ..MapConfig::default()
        };
        let surface = HeadlessMap::new("maplibre", &config, maplibre_default_style());
        surface.begin_load().await.unwrap().unwrap();
        let handle: Arc<dyn MapHandle> = surface.clone();
        (surface, handle)
    }

    async fn next_style_load(map: &Arc<dyn MapHandle>) {
        let (tx, rx) = oneshot::channel();
        map.once_style_load(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.await.unwrap();
    }

    #[test]
    fn test_circle_ring_is_closed() {
        let center = Position::new(-122.4177, 37.8099);
        let ring = circle_ring(center, 500.0, 64);

        assert_eq!(ring.len(), 65);
        assert_eq!(ring.first(), ring.last());
        assert!((ring[0][0] - (center.lng + 500.0 / 111_320.0)).abs() < 1e-12);
        assert!((ring[16][1] - (center.lat + 500.0 / 110_540.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_draw_circle_replaces_previous_circle() {
        let (_surface, map) = ready_map().await;
        let step = StoryStep::point(-122.4177, 37.8099).with_property("radius", 250);

        draw_circle(&map, &step);
        draw_circle(&map, &step);

        assert!(map.has_source(CIRCLE_SOURCE));
        assert!(map.has_layer(CIRCLE_FILL));
        assert!(map.has_layer(CIRCLE_OUTLINE));
        assert_eq!(map.camera().zoom, 14.0);
    }

    #[tokio::test]
    async fn test_enable_3d_adds_buildings_once() {
        let (_surface, map) = ready_map().await;
        let step = StoryStep::point(-122.4194, 37.7749);

        enable_3d(&map, &step);
        enable_3d(&map, &step);

        assert!(map.has_layer(BUILDINGS_LAYER));
        let camera = map.camera();
        assert_eq!(camera.pitch, 60.0);
        assert_eq!(camera.bearing, -17.6);
    }

    #[tokio::test]
    async fn test_switch_to_satellite_flies_after_style_load() {
        let (_surface, map) = ready_map().await;
        let step = StoryStep::point(-122.4183, 37.8199);

        switch_to_satellite(&map, &step);
        next_style_load(&map).await;

        assert_eq!(map.style(), Some(StyleSpec::Url(SATELLITE_STYLE.to_string())));
        let camera = map.camera();
        assert_eq!(camera.center, Position::new(-122.4183, 37.8199));
        assert_eq!(camera.zoom, 15.0);
    }

    #[tokio::test]
    async fn test_popups() {
        let (surface, map) = ready_map().await;
        let step = StoryStep::point(-122.4230, 37.8267)
            .with_title("Golden Gate Bridge")
            .with_description("Custom action adds a popup marker.");

        show_alcatraz_popup(&map, &step);
        show_step_popup(&map, &step);

        let popups = surface.snapshot().popups;
        assert_eq!(popups.len(), 2);
        assert!(popups[0].html.contains("Alcatraz Island"));
        assert_eq!(
            popups[1].html,
            "<h3>Golden Gate Bridge</h3><p>Custom action adds a popup marker.</p>"
        );
        assert_eq!(map.camera().center, Position::new(-122.4230, 37.8267));
    }

    #[tokio::test]
    async fn test_point_actions_ignore_polygons() {
        let (_surface, map) = ready_map().await;
        let before = map.camera();
        let step = StoryStep::polygon(vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 0.0),
        ]);

        draw_circle(&map, &step);
        enable_3d(&map, &step);
        switch_to_satellite(&map, &step);

        assert_eq!(map.camera(), before);
        assert!(!map.has_source(CIRCLE_SOURCE));
    }
}
