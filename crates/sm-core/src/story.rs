//! Story model: an ordered collection of GeoJSON-shaped steps

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::map::LngLatBounds;

/// A longitude/latitude pair. Serialized as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
}

impl Position {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Read a position from a GeoJSON coordinate array. Values past the
    /// second (altitude) are ignored.
    fn from_value(value: &Value) -> Option<Self> {
        let coords = value.as_array()?;
        if coords.len() < 2 {
            return None;
        }
        Some(Self::new(coords[0].as_f64()?, coords[1].as_f64()?))
    }
}

impl From<[f64; 2]> for Position {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

impl From<Position> for [f64; 2] {
    fn from(position: Position) -> Self {
        [position.lng, position.lat]
    }
}

impl From<Position> for geo_types::Coord<f64> {
    fn from(position: Position) -> Self {
        geo_types::coord! { x: position.lng, y: position.lat }
    }
}

/// A closed (or closable) ring of positions
pub type Ring = Vec<Position>;

/// Errors raised while reading a step geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Point coordinates must be an array of at least two numbers")]
    InvalidPoint,

    #[error("Polygon coordinates must be a non-empty array of rings")]
    EmptyPolygon,

    #[error("Polygon ring {0} is not an array of [lng, lat] pairs")]
    InvalidRing(usize),
}

/// Geometry anchoring a step on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry", into = "RawGeometry")]
pub enum StepGeometry {
    Point(Position),
    Polygon(Vec<Ring>),
    /// Any other geometry type, kept verbatim. Has no camera default.
    Other { kind: String, coordinates: Value },
}

impl StepGeometry {
    /// GeoJSON type tag
    pub fn kind(&self) -> &str {
        match self {
            StepGeometry::Point(_) => "Point",
            StepGeometry::Polygon(_) => "Polygon",
            StepGeometry::Other { kind, .. } => kind,
        }
    }

    /// Bounding box of the geometry, if it has a known shape
    pub fn bounds(&self) -> Option<LngLatBounds> {
        use geo::BoundingRect;

        match self {
            StepGeometry::Point(position) => Some(LngLatBounds::new(*position, *position)),
            StepGeometry::Polygon(rings) => {
                let mut rings = rings.iter().map(|ring| {
                    geo_types::LineString::from(
                        ring.iter().copied().map(geo_types::Coord::from).collect::<Vec<_>>(),
                    )
                });
                let exterior = rings.next()?;
                let polygon = geo_types::Polygon::new(exterior, rings.collect());
                let rect = polygon.bounding_rect()?;
                Some(LngLatBounds::new(
                    Position::new(rect.min().x, rect.min().y),
                    Position::new(rect.max().x, rect.max().y),
                ))
            }
            StepGeometry::Other { .. } => None,
        }
    }

    /// The point a camera should centre on for this geometry
    pub fn anchor(&self) -> Option<Position> {
        match self {
            StepGeometry::Point(position) => Some(*position),
            _ => self.bounds().map(|bounds| bounds.center()),
        }
    }
}

/// Wire shape of a geometry: `{ "type": ..., "coordinates": ... }`
#[derive(Serialize, Deserialize)]
struct RawGeometry {
    /// Missing type yields an `Other` geometry with an empty kind
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl TryFrom<RawGeometry> for StepGeometry {
    type Error = GeometryError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "Point" => Position::from_value(&raw.coordinates)
                .map(StepGeometry::Point)
                .ok_or(GeometryError::InvalidPoint),
            "Polygon" => parse_rings(&raw.coordinates).map(StepGeometry::Polygon),
            _ => Ok(StepGeometry::Other {
                kind: raw.kind,
                coordinates: raw.coordinates,
            }),
        }
    }
}

impl From<StepGeometry> for RawGeometry {
    fn from(geometry: StepGeometry) -> Self {
        let position = |p: &Position| Value::from(vec![p.lng, p.lat]);
        match geometry {
            StepGeometry::Point(p) => RawGeometry {
                kind: "Point".to_string(),
                coordinates: position(&p),
            },
            StepGeometry::Polygon(rings) => RawGeometry {
                kind: "Polygon".to_string(),
                coordinates: Value::Array(
                    rings
                        .iter()
                        .map(|ring| Value::Array(ring.iter().map(position).collect()))
                        .collect(),
                ),
            },
            StepGeometry::Other { kind, coordinates } => RawGeometry { kind, coordinates },
        }
    }
}

/// Accepts both `[[ [x,y], ... ], ...]` and a bare ring `[[x,y], ...]`.
fn parse_rings(value: &Value) -> Result<Vec<Ring>, GeometryError> {
    let outer = value.as_array().filter(|a| !a.is_empty()).ok_or(GeometryError::EmptyPolygon)?;

    let is_bare_ring = outer[0]
        .as_array()
        .and_then(|first| first.first())
        .map(Value::is_number)
        .unwrap_or(false);

    if is_bare_ring {
        return parse_ring(outer, 0).map(|ring| vec![ring]);
    }

    outer
        .iter()
        .enumerate()
        .map(|(idx, ring)| {
            let ring = ring.as_array().ok_or(GeometryError::InvalidRing(idx))?;
            parse_ring(ring, idx)
        })
        .collect()
}

fn parse_ring(values: &[Value], idx: usize) -> Result<Ring, GeometryError> {
    values
        .iter()
        .map(|v| Position::from_value(v).ok_or(GeometryError::InvalidRing(idx)))
        .collect()
}

/// Property bag of a step
///
/// `title`, `description` and `action` are only taken when they are strings;
/// any other value stays in `extra` under its own key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct StepProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Identifier of the action to run when the step becomes current
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Caller-defined fields consumed by custom actions
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for StepProperties {
    fn from(mut extra: Map<String, Value>) -> Self {
        let mut take_string = |key: &str| {
            if extra.get(key).map_or(false, Value::is_string) {
                extra.remove(key).and_then(|v| v.as_str().map(str::to_string))
            } else {
                None
            }
        };
        let title = take_string("title");
        let description = take_string("description");
        let action = take_string("action");

        Self {
            title,
            description,
            action,
            extra,
        }
    }
}

impl StepProperties {
    /// Numeric caller-defined field
    pub fn number(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(Value::as_f64)
    }

    /// String caller-defined field
    pub fn string(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureCollectionTag {
    #[default]
    FeatureCollection,
}

/// One point or region of interest in a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryStep {
    #[serde(rename = "type")]
    tag: FeatureTag,
    pub geometry: StepGeometry,
    pub properties: StepProperties,
}

impl StoryStep {
    pub fn new(geometry: StepGeometry, properties: StepProperties) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties,
        }
    }

    /// A point step with empty properties
    pub fn point(lng: f64, lat: f64) -> Self {
        Self::new(StepGeometry::Point(Position::new(lng, lat)), StepProperties::default())
    }

    /// A single-ring polygon step with empty properties
    pub fn polygon(ring: Ring) -> Self {
        Self::new(StepGeometry::Polygon(vec![ring]), StepProperties::default())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.properties.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.properties.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.properties.action = Some(action.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.extra.insert(key.into(), value.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.properties.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.properties.description.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.properties.action.as_deref()
    }
}

/// Ordered, immutable sequence of steps. Order defines navigation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(rename = "type")]
    tag: FeatureCollectionTag,
    features: Vec<StoryStep>,
}

impl Story {
    pub fn new(steps: Vec<StoryStep>) -> Self {
        Self {
            tag: FeatureCollectionTag::FeatureCollection,
            features: steps,
        }
    }

    pub fn steps(&self) -> &[StoryStep] {
        &self.features
    }

    pub fn get(&self, index: usize) -> Option<&StoryStep> {
        self.features.get(index)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StoryStep> {
        self.features.iter()
    }
}

impl FromIterator<StoryStep> for Story {
    fn from_iter<I: IntoIterator<Item = StoryStep>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
