//! Draws a headless map surface and the story on top of it

use egui::{Align2, Color32, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, Ui, Vec2};
use serde_json::Value;
use sm_core::{Camera, Position, StepGeometry, Story, StyleSpec};
use sm_render::{headless::TILE_SIZE, world_fraction, MapSnapshot};

use crate::theme::Palette;

/// Screen projection of a camera onto a rectangle
///
/// Bearing and pitch are not rendered.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    center: [f64; 2],
    scale: f64,
    rect: Rect,
}

impl Projection {
    pub fn new(camera: &Camera, rect: Rect) -> Self {
        let scale = TILE_SIZE * 2f64.powf(camera.zoom);
        let center = world_fraction(camera.center);
        Self {
            center: [center[0] * scale, center[1] * scale],
            scale,
            rect,
        }
    }

    pub fn to_screen(&self, position: Position) -> Pos2 {
        let world = world_fraction(position);
        let dx = world[0] * self.scale - self.center[0];
        let dy = world[1] * self.scale - self.center[1];
        self.rect.center() + Vec2::new(dx as f32, dy as f32)
    }
}

/// Parse `#rgb` or `#rrggbb`
pub fn parse_hex_color(text: &str) -> Option<Color32> {
    let hex = text.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = hex.chars().map(|c| channel(&format!("{c}{c}")));
            Some(Color32::from_rgb(rgb.next()??, rgb.next()??, rgb.next()??))
        }
        6 => Some(Color32::from_rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

/// Popup text with markup removed
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Outer rings of every polygon in a GeoJSON value
pub fn geojson_rings(value: &Value) -> Vec<Vec<Position>> {
    let mut rings = Vec::new();
    collect_rings(value, &mut rings);
    rings
}

fn collect_rings(value: &Value, rings: &mut Vec<Vec<Position>>) {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            for feature in value.get("features").and_then(Value::as_array).into_iter().flatten() {
                collect_rings(feature, rings);
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry") {
                collect_rings(geometry, rings);
            }
        }
        Some("Polygon") => {
            if let Some(ring) = value.pointer("/coordinates/0").and_then(ring_positions) {
                rings.push(ring);
            }
        }
        Some("MultiPolygon") => {
            for polygon in value.get("coordinates").and_then(Value::as_array).into_iter().flatten() {
                if let Some(ring) = polygon.get(0).and_then(ring_positions) {
                    rings.push(ring);
                }
            }
        }
        _ => {}
    }
}

fn ring_positions(ring: &Value) -> Option<Vec<Position>> {
    ring.as_array()?
        .iter()
        .map(|point| {
            let lng = point.get(0)?.as_f64()?;
            let lat = point.get(1)?.as_f64()?;
            Some(Position::new(lng, lat))
        })
        .collect()
}

fn style_name(style: Option<&StyleSpec>) -> String {
    match style {
        Some(StyleSpec::Url(url)) => url.rsplit('/').next().unwrap_or(url).to_string(),
        Some(StyleSpec::Document(_)) => "inline style".to_string(),
        None => "no style".to_string(),
    }
}

fn background_color(style: Option<&StyleSpec>) -> Color32 {
    match style {
        Some(StyleSpec::Url(url)) if url.contains("satellite") => Color32::from_rgb(38, 52, 40),
        Some(StyleSpec::Url(url)) if url.contains("light") || url.contains("streets") => {
            Color32::from_rgb(236, 232, 224)
        }
        Some(StyleSpec::Document(_)) => Color32::from_rgb(242, 239, 233),
        _ => Color32::from_rgb(28, 30, 36),
    }
}

/// Map viewport widget
pub struct MapViewport {
    palette: Palette,
    marker_radius: f32,
}

impl MapViewport {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            marker_radius: 6.0,
        }
    }

    /// Fill the available space with the map. `snapshot` is `None` while the
    /// map is loading or when it failed.
    pub fn ui(
        &self,
        ui: &mut Ui,
        snapshot: Option<&MapSnapshot>,
        story: &Story,
        current: Option<usize>,
    ) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let painter = ui.painter_at(rect);

        let Some(snapshot) = snapshot.filter(|s| !s.removed) else {
            painter.rect_filled(rect, 0.0, Color32::from_rgb(28, 30, 36));
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Map unavailable",
                FontId::proportional(16.0),
                self.palette.text.gamma_multiply(0.6),
            );
            return response;
        };

        let style = snapshot.style.as_ref();
        painter.rect_filled(rect, 0.0, background_color(style));
        let projection = Projection::new(&snapshot.camera, rect);

        self.draw_sources(&painter, &projection, snapshot);
        self.draw_story(&painter, &projection, story, current);

        for popup in &snapshot.popups {
            let anchor = projection.to_screen(popup.position);
            let text = strip_html(&popup.html);
            let galley = painter.layout_no_wrap(text, FontId::proportional(13.0), Color32::BLACK);
            let bubble = Rect::from_center_size(
                anchor - Vec2::new(0.0, galley.size().y + 12.0),
                galley.size() + Vec2::splat(12.0),
            );
            painter.rect_filled(bubble, 4.0, Color32::WHITE);
            painter.galley(bubble.min + Vec2::splat(6.0), galley);
        }

        let mut status = format!(
            "{} · {} · z{:.1}",
            snapshot.library,
            style_name(style),
            snapshot.camera.zoom
        );
        if snapshot.layers.iter().any(|layer| layer.kind == "fill-extrusion") {
            status.push_str(" · 3D");
        }
        if !snapshot.style_loaded {
            status.push_str(" · loading style");
        }
        painter.text(
            rect.left_top() + Vec2::splat(8.0),
            Align2::LEFT_TOP,
            status,
            FontId::monospace(11.0),
            self.palette.text,
        );

        response
    }

    fn draw_sources(&self, painter: &egui::Painter, projection: &Projection, snapshot: &MapSnapshot) {
        for layer in &snapshot.layers {
            let Some(source_id) = layer.source.as_deref() else {
                continue;
            };
            let Some((_, source)) = snapshot.sources.iter().find(|(id, _)| id == source_id) else {
                continue;
            };
            let Some(data) = source.get("data") else {
                continue;
            };

            let paint = layer.definition.get("paint");
            let paint_color = |key: &str| {
                paint
                    .and_then(|p| p.get(key))
                    .and_then(Value::as_str)
                    .and_then(parse_hex_color)
                    .unwrap_or(self.palette.primary)
            };

            for ring in geojson_rings(data) {
                let points: Vec<Pos2> = ring.iter().map(|p| projection.to_screen(*p)).collect();
                match layer.kind.as_str() {
                    "fill" | "fill-extrusion" => {
                        let opacity = paint
                            .and_then(|p| p.get(format!("{}-opacity", layer.kind)))
                            .and_then(Value::as_f64)
                            .unwrap_or(0.3) as f32;
                        let color = paint_color(&format!("{}-color", layer.kind));
                        painter.add(Shape::convex_polygon(
                            points,
                            color.gamma_multiply(opacity),
                            Stroke::NONE,
                        ));
                    }
                    "line" => {
                        let width = paint
                            .and_then(|p| p.get("line-width"))
                            .and_then(Value::as_f64)
                            .unwrap_or(1.0) as f32;
                        painter.add(Shape::closed_line(points, Stroke::new(width, paint_color("line-color"))));
                    }
                    _ => {}
                }
            }
        }
    }

    fn draw_story(&self, painter: &egui::Painter, projection: &Projection, story: &Story, current: Option<usize>) {
        for (index, step) in story.iter().enumerate() {
            let active = current == Some(index);
            let color = if active { self.palette.primary } else { self.palette.text };

            match &step.geometry {
                StepGeometry::Point(position) => {
                    let center = projection.to_screen(*position);
                    let radius = if active { self.marker_radius * 1.5 } else { self.marker_radius };
                    painter.circle(center, radius, color.gamma_multiply(0.8), Stroke::new(2.0, Color32::WHITE));
                }
                StepGeometry::Polygon(rings) => {
                    for ring in rings {
                        let points: Vec<Pos2> = ring.iter().map(|p| projection.to_screen(*p)).collect();
                        let width = if active { 3.0 } else { 1.5 };
                        painter.add(Shape::closed_line(points, Stroke::new(width, color)));
                    }
                }
                StepGeometry::Other { .. } => {}
            }
        }
    }
}

impl Default for MapViewport {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}
