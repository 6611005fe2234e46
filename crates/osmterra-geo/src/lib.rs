//! # osmterra-geo
//!
//! Vector feature ingestion for the osmterra pipeline.
//!
//! This crate turns an Overpass-style JSON query response into typed
//! [`Feature`]s with assembled polygon geometry:
//!
//! - [`QueryParser`] walks the `elements` array, building features from ways
//!   directly and from relations via ring assembly
//! - [`RingAssembler`] joins way fragments that share endpoints into rings
//! - [`classify`] decides whether a geometry is an area or a line from its tags
//!
//! No network I/O happens here; fetching the document is the caller's job.
//!
//! ## Example
//!
//! ```
//! use osmterra_geo::{parse_query, BoundingBox, GeometryKind};
//!
//! let json = r#"{
//!     "elements": [{
//!         "type": "way",
//!         "id": 42,
//!         "tags": { "building": "yes" },
//!         "geometry": [
//!             { "lat": 0.0, "lon": 0.0 },
//!             { "lat": 0.0, "lon": 1.0 },
//!             { "lat": 1.0, "lon": 1.0 },
//!             { "lat": 0.0, "lon": 0.0 }
//!         ]
//!     }]
//! }"#;
//!
//! let result = parse_query(json, BoundingBox::new(0.0, 0.0, 1.0, 1.0))?;
//! assert_eq!(result.way_count(), 1);
//! assert_eq!(result.features()[0].geometry, GeometryKind::Polygon);
//! # Ok::<(), osmterra_geo::QueryError>(())
//! ```

mod classify;
mod error;
mod model;
mod overpass;
mod rings;

pub use classify::{classify, is_closed, AREA_TAGS, CLOSURE_TOLERANCE};
pub use error::QueryError;
pub use model::{BoundingBox, Coordinate, Feature, FeatureKind, GeometryKind, QueryResult, Tags};
pub use overpass::{parse_query, QueryParser};
pub use rings::{RingAssembler, DEFAULT_MAX_ITERATIONS, ENDPOINT_TOLERANCE};

/// Result type for query parsing.
pub type Result<T> = std::result::Result<T, QueryError>;
