//! Tag-driven area/line classification.
//!
//! OSM tagging conventions use different closure semantics per theme, so the
//! decision is an ordered rule list where the first matching rule wins:
//!
//! 1. Relation tagged `type=multipolygon` or `type=boundary` → polygon
//! 2. Explicit `area=yes` → polygon, `area=no` → line
//! 3. Area-signalling keys ([`AREA_TAGS`]) → polygon if closed or a relation
//! 4. `natural=coastline` → line; other `natural` → polygon if closed or a relation
//! 5. `waterway=riverbank` → polygon; other `waterway` → line
//! 6. `highway` or `railway` → line, even when closed
//! 7. Otherwise → polygon if closed

use crate::model::{Coordinate, GeometryKind, Tags};

/// Tolerance in degrees for treating the first and last coordinate as equal.
pub const CLOSURE_TOLERANCE: f64 = 1e-7;

/// Keys whose presence signals an area.
pub const AREA_TAGS: &[&str] = &["building", "landuse", "leisure", "amenity", "boundary"];

/// Check whether a coordinate sequence ends where it starts.
pub fn is_closed(coords: &[Coordinate]) -> bool {
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 => {
            first.approx_eq(last, CLOSURE_TOLERANCE)
        }
        _ => false,
    }
}

/// Decide whether a geometry is an area or a line.
///
/// Relations count as closed for the closure-sensitive rules because ring
/// assembly tolerance may leave their primary ring slightly open.
pub fn classify(tags: &Tags, coords: &[Coordinate], is_relation: bool) -> GeometryKind {
    let closed = is_closed(coords);
    let closed_or_relation = if closed || is_relation {
        GeometryKind::Polygon
    } else {
        GeometryKind::LineString
    };

    if is_relation {
        if let Some("multipolygon" | "boundary") = tags.get("type").map(String::as_str) {
            return GeometryKind::Polygon;
        }
    }

    match tags.get("area").map(String::as_str) {
        Some("yes") => return GeometryKind::Polygon,
        Some("no") => return GeometryKind::LineString,
        _ => {}
    }

    if AREA_TAGS.iter().any(|key| tags.contains_key(*key)) {
        return closed_or_relation;
    }

    if let Some(natural) = tags.get("natural") {
        return if natural == "coastline" {
            GeometryKind::LineString
        } else {
            closed_or_relation
        };
    }

    if let Some(waterway) = tags.get("waterway") {
        return if waterway == "riverbank" {
            GeometryKind::Polygon
        } else {
            GeometryKind::LineString
        };
    }

    if tags.contains_key("highway") || tags.contains_key("railway") {
        return GeometryKind::LineString;
    }

    if closed {
        GeometryKind::Polygon
    } else {
        GeometryKind::LineString
    }
}
