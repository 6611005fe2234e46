//! # osmterra-terrain
//!
//! Terrain grid model and the versioned binary terrain format.
//!
//! ## Overview
//!
//! - [`TerrainGrid`] holds a dense row-major array of [`TerrainCell`]s
//!   (height, material index, hole flag) and an ordered material name table.
//! - [`draw`] composites a region of one grid onto another, resampling
//!   nearest-cell and merging the material name tables.
//! - [`TerrainCodec`] reads and writes the compact binary record (format
//!   version 9), quantizing heights to 16 bits.
//! - [`ImageProjector`] implementations turn raster imagery into height and
//!   material arrays for a grid.
//!
//! ## Example
//!
//! ```
//! use osmterra_terrain::{TerrainCell, TerrainCodec, TerrainGrid};
//!
//! let mut grid = TerrainGrid::square(64);
//! let grass = grid.add_material("grass");
//! grid.fill(TerrainCell::new(12.0, grass));
//!
//! let codec = TerrainCodec::new(500.0);
//! let bytes = codec.encode(&grid)?;
//! let decoded = codec.decode(&bytes)?;
//!
//! assert_eq!(decoded.materials(), ["grass"]);
//! assert!((decoded.cell(3, 4).unwrap().height - 12.0).abs() <= 500.0 / 65535.0);
//! # Ok::<(), osmterra_terrain::TerrainError>(())
//! ```

mod codec;
mod compositor;
mod error;
mod grid;
mod projector;

pub use codec::{
    calc_approx_size, dequantize_height, deserialize, quantize_height, serialize, TerrainCodec,
    FORMAT_VERSION, HOLE_MATERIAL, MAX_MATERIAL_INDEX, MAX_NAME_LEN,
};
pub use compositor::{draw, merge_material_names};
pub use error::TerrainError;
pub use grid::{GridRect, TerrainCell, TerrainGrid};
pub use projector::{HeightmapProjector, ImageProjector, MaterialMapProjector, Projection};

/// Result type for terrain operations.
pub type Result<T> = std::result::Result<T, TerrainError>;
