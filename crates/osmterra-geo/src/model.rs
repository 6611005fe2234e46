//! Geo feature model: coordinates, features and query results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag key/value mapping attached to a feature.
pub type Tags = HashMap<String, String>;

// ============================================================================
// Coordinates
// ============================================================================

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude (positive = east).
    pub lon: f64,
    /// Latitude (positive = north).
    pub lat: f64,
}

impl Coordinate {
    /// Create a coordinate from longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Check whether both axes are within `tolerance` degrees of `other`.
    pub fn approx_eq(&self, other: &Coordinate, tolerance: f64) -> bool {
        (self.lon - other.lon).abs() <= tolerance && (self.lat - other.lat).abs() <= tolerance
    }
}

/// Geographic bounding box, in Overpass (south, west, north, east) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude.
    pub south: f64,
    /// Minimum longitude.
    pub west: f64,
    /// Maximum latitude.
    pub north: f64,
    /// Maximum longitude.
    pub east: f64,
}

impl BoundingBox {
    /// Create a bounding box from its edges.
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Smallest box enclosing all coordinates, or `None` for an empty slice.
    pub fn from_coordinates(coords: &[Coordinate]) -> Option<Self> {
        let first = coords.first()?;
        let mut bbox = BoundingBox::new(first.lat, first.lon, first.lat, first.lon);
        for c in &coords[1..] {
            bbox.south = bbox.south.min(c.lat);
            bbox.north = bbox.north.max(c.lat);
            bbox.west = bbox.west.min(c.lon);
            bbox.east = bbox.east.max(c.lon);
        }
        Some(bbox)
    }

    /// Check if a coordinate lies within the box (edges inclusive).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lat >= self.south
            && coord.lat <= self.north
            && coord.lon >= self.west
            && coord.lon <= self.east
    }
}

// ============================================================================
// Features
// ============================================================================

/// Source entity kind of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// A single OSM way.
    Way,
    /// A relation assembled from member ways.
    Relation,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Way => write!(f, "way"),
            FeatureKind::Relation => write!(f, "relation"),
        }
    }
}

/// Whether a feature bounds an area or traces a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    /// A closed area.
    Polygon,
    /// An open or closed polyline.
    LineString,
}

/// One parsed vector entity.
///
/// A `Polygon` feature always has at least 3 coordinates in `coordinates`;
/// every feature has at least 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// OSM identifier.
    pub id: i64,
    /// Source entity kind.
    pub kind: FeatureKind,
    /// Area or line.
    pub geometry: GeometryKind,
    /// Primary ring (or line) coordinates.
    pub coordinates: Vec<Coordinate>,
    /// Tags copied from the source element.
    pub tags: Tags,
    /// Inner rings (holes).
    pub holes: Vec<Vec<Coordinate>>,
    /// Additional disjoint outer rings of a multipolygon.
    pub parts: Vec<Vec<Coordinate>>,
}

impl Feature {
    /// Look up a tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Check whether the primary ring is closed.
    pub fn is_closed(&self) -> bool {
        crate::classify::is_closed(&self.coordinates)
    }

    /// Bounding box of the primary ring and all parts.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut bbox = BoundingBox::from_coordinates(&self.coordinates)?;
        for part in &self.parts {
            if let Some(b) = BoundingBox::from_coordinates(part) {
                bbox.south = bbox.south.min(b.south);
                bbox.north = bbox.north.max(b.north);
                bbox.west = bbox.west.min(b.west);
                bbox.east = bbox.east.max(b.east);
            }
        }
        Some(bbox)
    }
}

// ============================================================================
// Query Result
// ============================================================================

/// The outcome of one parse call.
///
/// Counters are computed from the feature list at construction and never drift,
/// since the result cannot be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    bbox: BoundingBox,
    timestamp: DateTime<Utc>,
    features: Vec<Feature>,
    way_count: usize,
    relation_count: usize,
}

impl QueryResult {
    /// Build a result, deriving the way and relation counters from `features`.
    pub fn new(bbox: BoundingBox, timestamp: DateTime<Utc>, features: Vec<Feature>) -> Self {
        let way_count = features.iter().filter(|f| f.kind == FeatureKind::Way).count();
        let relation_count = features.len() - way_count;
        Self {
            bbox,
            timestamp,
            features,
            way_count,
            relation_count,
        }
    }

    /// Bounding box the query was issued for.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Data timestamp of the query response.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// All features in document order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Features that came from ways.
    pub fn ways(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.kind == FeatureKind::Way)
    }

    /// Features that came from relations.
    pub fn relations(&self) -> impl Iterator<Item = &Feature> {
        self.features
            .iter()
            .filter(|f| f.kind == FeatureKind::Relation)
    }

    /// Number of way features.
    pub fn way_count(&self) -> usize {
        self.way_count
    }

    /// Number of relation features.
    pub fn relation_count(&self) -> usize {
        self.relation_count
    }

    /// Consume the result, returning its features.
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }
}
