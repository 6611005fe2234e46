//! osmterra: OpenStreetMap query results to game terrain.
//!
//! This crate ties the pipeline together:
//!
//! - [`osmterra_geo`] parses Overpass JSON into classified features, joining
//!   multipolygon fragments into rings.
//! - [`osmterra_terrain`] holds the terrain grid, the compositor and the
//!   versioned binary terrain format.
//! - [`Pipeline`] configures both from a single [`PipelineConfig`].
//!
//! # Example
//!
//! ```
//! use osmterra::{BoundingBox, Pipeline, TerrainCell, TerrainGrid};
//!
//! let pipeline = Pipeline::new();
//! let json = r#"{"elements": [{"type": "way", "id": 1, "tags": {"building": "yes"},
//!     "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 1.0},
//!                  {"lat": 1.0, "lon": 1.0}, {"lat": 0.0, "lon": 0.0}]}]}"#;
//! let result = pipeline.parse_query(json, BoundingBox::new(0.0, 0.0, 1.0, 1.0)).unwrap();
//! assert_eq!(result.way_count(), 1);
//!
//! let mut grid = TerrainGrid::square(4);
//! grid.add_material("grass");
//! grid.fill(TerrainCell::new(12.0, 0));
//! let bytes = pipeline.encode(&grid).unwrap();
//! assert_eq!(pipeline.decode(&bytes).unwrap().materials(), ["grass"]);
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{PipelineConfig, QueryConfig, TerrainConfig, DEFAULT_MAX_HEIGHT};
pub use error::PipelineError;
pub use pipeline::Pipeline;

pub use osmterra_geo::{
    BoundingBox, Coordinate, Feature, FeatureKind, GeometryKind, QueryError, QueryResult,
};
pub use osmterra_terrain::{
    GridRect, HeightmapProjector, ImageProjector, MaterialMapProjector, TerrainCell,
    TerrainCodec, TerrainError, TerrainGrid,
};

/// Register descriptions for every metric emitted by the pipeline.
pub fn describe_metrics() {
    osmterra_metrics::describe_metrics();
}
