//! Overpass query response parsing.
//!
//! ## Document shape
//!
//! ```text
//! {
//!   "osm3s":    { "timestamp_osm_base": "2024-05-01T12:00:00Z" },   (optional)
//!   "elements": [
//!     { "type": "way", "id": 1, "tags": {..}, "geometry": [{"lat":..,"lon":..}, ..] },
//!     { "type": "relation", "id": 2, "tags": {..},
//!       "members": [{ "type": "way", "role": "outer", "geometry": [..] }, ..] }
//!   ]
//! }
//! ```
//!
//! A document that is not JSON, or whose top level is not shaped like the above,
//! fails as a whole. Elements inside a well-formed document that cannot be used
//! (unknown type, missing id, too few points) are skipped individually.

use crate::classify::classify;
use crate::model::{BoundingBox, Coordinate, Feature, FeatureKind, GeometryKind, QueryResult, Tags};
use crate::rings::RingAssembler;
use crate::{QueryError, Result};
use chrono::{DateTime, Utc};
use osmterra_metrics::metric_defs;
use serde::Deserialize;
use std::cmp::Reverse;
use tracing::{debug, trace};

// ============================================================================
// JSON Schema Types (matching the Overpass `out geom` response)
// ============================================================================

/// Root structure of a query response.
#[derive(Debug, Deserialize)]
struct RawDocument {
    /// Elements are decoded one at a time so a bad element cannot fail the document.
    elements: Option<Vec<serde_json::Value>>,
    osm3s: Option<serde_json::Value>,
}

/// A single way or relation element.
#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: Option<String>,
    id: Option<i64>,
    tags: Option<Tags>,
    geometry: Option<Vec<Option<RawPoint>>>,
    members: Option<Vec<RawMember>>,
}

/// A relation member with inline geometry.
#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(rename = "type")]
    kind: Option<String>,
    role: Option<String>,
    geometry: Option<Vec<Option<RawPoint>>>,
}

/// A geometry vertex. Overpass writes `null` for nodes it could not resolve.
#[derive(Debug, Clone, Copy, Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

fn to_coordinates(points: Option<Vec<Option<RawPoint>>>) -> Vec<Coordinate> {
    points
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|p| Coordinate::new(p.lon, p.lat))
        .collect()
}

/// Why an element produced no feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    Malformed,
    UnknownType,
    MissingId,
    TooFewPoints,
}

impl SkipReason {
    fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Malformed => "malformed",
            SkipReason::UnknownType => "unknown_type",
            SkipReason::MissingId => "missing_id",
            SkipReason::TooFewPoints => "too_few_points",
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parse a query response with default assembly settings.
pub fn parse_query(json: &str, bbox: BoundingBox) -> Result<QueryResult> {
    QueryParser::default().parse(json, bbox)
}

/// Converts query responses into [`QueryResult`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParser {
    /// Assembler used to join relation member ways.
    pub assembler: RingAssembler,
}

impl QueryParser {
    /// Create a parser using the given ring assembler.
    pub fn new(assembler: RingAssembler) -> Self {
        Self { assembler }
    }

    /// Parse a JSON document held in a string.
    pub fn parse(&self, json: &str, bbox: BoundingBox) -> Result<QueryResult> {
        let document: RawDocument = serde_json::from_str(json)?;
        self.build(document, bbox)
    }

    /// Parse a JSON document held in a byte slice.
    pub fn parse_slice(&self, json: &[u8], bbox: BoundingBox) -> Result<QueryResult> {
        let document: RawDocument = serde_json::from_slice(json)?;
        self.build(document, bbox)
    }

    /// Parse a JSON document from a reader.
    pub fn parse_reader<R: std::io::Read>(&self, reader: R, bbox: BoundingBox) -> Result<QueryResult> {
        let document: RawDocument = serde_json::from_reader(reader)?;
        self.build(document, bbox)
    }

    fn build(&self, document: RawDocument, bbox: BoundingBox) -> Result<QueryResult> {
        let timestamp = match document.osm3s.as_ref() {
            Some(meta) => osm_base_timestamp(meta)?,
            None => None,
        }
        .unwrap_or_else(Utc::now);

        let Some(elements) = document.elements else {
            debug!("query document has no elements");
            return Ok(QueryResult::new(bbox, timestamp, Vec::new()));
        };

        let mut features = Vec::with_capacity(elements.len());
        for value in elements {
            match self.element_to_feature(value) {
                Ok(feature) => {
                    metrics::counter!(
                        metric_defs::QUERY_FEATURES_PARSED.name,
                        "kind" => feature.kind.to_string()
                    )
                    .increment(1);
                    features.push(feature);
                }
                Err(reason) => {
                    metrics::counter!(
                        metric_defs::QUERY_ELEMENTS_SKIPPED.name,
                        "reason" => reason.as_str()
                    )
                    .increment(1);
                }
            }
        }

        let result = QueryResult::new(bbox, timestamp, features);
        debug!(
            ways = result.way_count(),
            relations = result.relation_count(),
            "parsed query result"
        );
        Ok(result)
    }

    fn element_to_feature(&self, value: serde_json::Value) -> std::result::Result<Feature, SkipReason> {
        let element: RawElement = serde_json::from_value(value).map_err(|e| {
            trace!(error = %e, "skipping malformed element");
            SkipReason::Malformed
        })?;

        let kind = match element.kind.as_deref() {
            Some("way") => FeatureKind::Way,
            Some("relation") => FeatureKind::Relation,
            other => {
                trace!(kind = ?other, "skipping element with unsupported type");
                return Err(SkipReason::UnknownType);
            }
        };
        let Some(id) = element.id else {
            trace!(%kind, "skipping element without id");
            return Err(SkipReason::MissingId);
        };
        let tags = element.tags.unwrap_or_default();

        let feature = match kind {
            FeatureKind::Way => {
                let coordinates = to_coordinates(element.geometry);
                if coordinates.len() < 2 {
                    trace!(id, points = coordinates.len(), "skipping short way");
                    return Err(SkipReason::TooFewPoints);
                }
                let geometry = polygon_guard(classify(&tags, &coordinates, false), &coordinates);
                Feature {
                    id,
                    kind,
                    geometry,
                    coordinates,
                    tags,
                    holes: Vec::new(),
                    parts: Vec::new(),
                }
            }
            FeatureKind::Relation => {
                self.relation_to_feature(id, tags, element.members.unwrap_or_default())?
            }
        };
        Ok(feature)
    }

    fn relation_to_feature(
        &self,
        id: i64,
        tags: Tags,
        members: Vec<RawMember>,
    ) -> std::result::Result<Feature, SkipReason> {
        let mut outer_segments = Vec::new();
        let mut inner_segments = Vec::new();

        for member in members {
            if member.kind.as_deref() != Some("way") {
                continue;
            }
            let target = match member.role.as_deref().unwrap_or("") {
                "" | "outer" => &mut outer_segments,
                "inner" => &mut inner_segments,
                _ => continue,
            };
            let coords = to_coordinates(member.geometry);
            if coords.len() >= 2 {
                target.push(coords);
            }
        }

        let mut outers = self.assembler.assemble(outer_segments);
        let holes = self.assembler.assemble(inner_segments);

        // Point count stands in for ring size when picking the primary ring.
        outers.sort_by_key(|ring| Reverse(ring.len()));
        let mut outers = outers.into_iter();
        let coordinates = outers.next().unwrap_or_default();
        if coordinates.len() < 2 {
            trace!(id, "skipping relation without a usable outer ring");
            return Err(SkipReason::TooFewPoints);
        }
        let parts: Vec<_> = outers.collect();

        let geometry = polygon_guard(classify(&tags, &coordinates, true), &coordinates);
        Ok(Feature {
            id,
            kind: FeatureKind::Relation,
            geometry,
            coordinates,
            tags,
            holes,
            parts,
        })
    }
}

/// A polygon needs at least three vertices; anything shorter is a line.
fn polygon_guard(kind: GeometryKind, coords: &[Coordinate]) -> GeometryKind {
    if kind == GeometryKind::Polygon && coords.len() < 3 {
        GeometryKind::LineString
    } else {
        kind
    }
}

/// Read `osm3s.timestamp_osm_base`, if present.
fn osm_base_timestamp(meta: &serde_json::Value) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = meta.get("timestamp_osm_base") else {
        return Ok(None);
    };
    let text = raw
        .as_str()
        .ok_or_else(|| QueryError::malformed("osm3s.timestamp_osm_base is not a string"))?;
    DateTime::parse_from_rfc3339(text)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| QueryError::malformed(format!("invalid osm3s.timestamp_osm_base '{}': {}", text, e)))
}
