//! Projecting raster imagery onto a terrain grid.
//!
//! An [`ImageProjector`] resamples some raster source to the grid's resolution
//! and returns row-major arrays that [`TerrainGrid::apply_projection`] writes
//! into the cells. Decoding image files is left to the caller; projectors here
//! work on in-memory rasters.
//!
//! [`TerrainGrid::apply_projection`]: crate::TerrainGrid::apply_projection

use crate::{Result, TerrainError};

/// Row-major arrays produced by a projector, sized to the target grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Absolute heights, one per cell.
    pub heights: Option<Vec<f32>>,
    /// Indices into `material_names`, one per cell; `None` marks a hole.
    pub materials: Option<Vec<Option<usize>>>,
    /// Material names referenced by `materials`.
    pub material_names: Vec<String>,
}

/// Source of height and/or material data for a grid.
pub trait ImageProjector {
    /// Produce arrays for a `width` x `height` grid.
    fn project(&self, width: usize, height: usize) -> Result<Projection>;
}

/// Map a grid index onto continuous raster coordinates, edge to edge.
fn raster_position(index: usize, grid_len: usize, raster_len: usize) -> f64 {
    if grid_len <= 1 {
        return 0.0;
    }
    index as f64 / (grid_len - 1) as f64 * (raster_len - 1) as f64
}

fn check_raster(width: usize, height: usize, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(TerrainError::InvalidRaster(format!(
            "raster dimensions {}x{} are empty",
            width, height
        )));
    }
    if len != width * height {
        return Err(TerrainError::LengthMismatch {
            what: "raster samples",
            expected: width * height,
            actual: len,
        });
    }
    Ok(())
}

// ============================================================================
// Heightmap
// ============================================================================

/// Bilinear heightmap projector.
///
/// Heights are `sample * scale + offset`, where samples are typically
/// normalized greyscale values.
#[derive(Debug, Clone)]
pub struct HeightmapProjector {
    width: usize,
    height: usize,
    samples: Vec<f32>,
    /// Multiplier applied to each sample.
    pub scale: f32,
    /// Added after scaling.
    pub offset: f32,
}

impl HeightmapProjector {
    /// Wrap a row-major raster of `width` x `height` samples.
    pub fn new(width: usize, height: usize, samples: Vec<f32>) -> Result<Self> {
        check_raster(width, height, samples.len())?;
        Ok(Self {
            width,
            height,
            samples,
            scale: 1.0,
            offset: 0.0,
        })
    }

    /// Set the height scale and offset.
    pub fn with_scale(mut self, scale: f32, offset: f32) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    fn pixel(&self, x: usize, y: usize) -> f64 {
        self.samples[y * self.width + x] as f64
    }

    /// Bilinear sample at continuous raster coordinates.
    fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        self.pixel(x0, y0) * (1.0 - fx) * (1.0 - fy)
            + self.pixel(x1, y0) * fx * (1.0 - fy)
            + self.pixel(x0, y1) * (1.0 - fx) * fy
            + self.pixel(x1, y1) * fx * fy
    }
}

impl ImageProjector for HeightmapProjector {
    fn project(&self, width: usize, height: usize) -> Result<Projection> {
        let mut heights = Vec::with_capacity(width * height);
        for gy in 0..height {
            let ry = raster_position(gy, height, self.height);
            for gx in 0..width {
                let rx = raster_position(gx, width, self.width);
                heights.push(self.sample(rx, ry) as f32 * self.scale + self.offset);
            }
        }
        Ok(Projection {
            heights: Some(heights),
            ..Projection::default()
        })
    }
}

// ============================================================================
// Material Map
// ============================================================================

/// Nearest-neighbour projector for 8-bit class rasters.
///
/// Each class value maps to a material name through the palette; cells whose
/// class has no palette entry become holes.
#[derive(Debug, Clone)]
pub struct MaterialMapProjector {
    width: usize,
    height: usize,
    classes: Vec<u8>,
    palette: Vec<(u8, String)>,
}

impl MaterialMapProjector {
    /// Wrap a row-major class raster of `width` x `height` values.
    pub fn new(width: usize, height: usize, classes: Vec<u8>) -> Result<Self> {
        check_raster(width, height, classes.len())?;
        Ok(Self {
            width,
            height,
            classes,
            palette: Vec::new(),
        })
    }

    /// Map a class value to a material name, replacing any earlier mapping.
    pub fn with_class(mut self, class: u8, material: impl Into<String>) -> Self {
        self.palette.retain(|(c, _)| *c != class);
        self.palette.push((class, material.into()));
        self
    }
}

impl ImageProjector for MaterialMapProjector {
    fn project(&self, width: usize, height: usize) -> Result<Projection> {
        let mut material_names: Vec<String> = Vec::new();
        let mut lookup = [None; 256];
        for (class, name) in &self.palette {
            let index = match material_names.iter().position(|n| n == name) {
                Some(index) => index,
                None => {
                    material_names.push(name.clone());
                    material_names.len() - 1
                }
            };
            lookup[*class as usize] = Some(index);
        }

        let mut materials = Vec::with_capacity(width * height);
        for gy in 0..height {
            let ry = raster_position(gy, height, self.height).round() as usize;
            for gx in 0..width {
                let rx = raster_position(gx, width, self.width).round() as usize;
                let class = self.classes[ry * self.width + rx];
                materials.push(lookup[class as usize]);
            }
        }

        Ok(Projection {
            heights: None,
            materials: Some(materials),
            material_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TerrainCell, TerrainGrid};
    use approx::assert_relative_eq;

    #[test]
    fn test_heightmap_bilinear() {
        // 2x2 raster, upsampled to 3x3: centre is the mean of the corners.
        let projector = HeightmapProjector::new(2, 2, vec![0.0, 1.0, 2.0, 3.0])
            .unwrap()
            .with_scale(10.0, 5.0);
        let projection = projector.project(3, 3).unwrap();
        let heights = projection.heights.unwrap();

        assert_relative_eq!(heights[0], 5.0);
        assert_relative_eq!(heights[2], 15.0);
        assert_relative_eq!(heights[4], 20.0);
        assert_relative_eq!(heights[8], 35.0);
        assert!(projection.materials.is_none());
    }

    #[test]
    fn test_raster_length_checked() {
        assert!(HeightmapProjector::new(2, 2, vec![0.0; 3]).is_err());
        assert!(MaterialMapProjector::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_material_map_palette() {
        let projector = MaterialMapProjector::new(2, 1, vec![7, 9])
            .unwrap()
            .with_class(7, "grass");
        let projection = projector.project(2, 2).unwrap();

        assert_eq!(projection.material_names, vec!["grass".to_string()]);
        assert_eq!(
            projection.materials.unwrap(),
            vec![Some(0), None, Some(0), None]
        );
    }

    #[test]
    fn test_apply_projection_merges_names() {
        let mut grid = TerrainGrid::square(2);
        grid.add_material("rock");
        grid.fill(TerrainCell::new(1.0, 0));

        let projector = MaterialMapProjector::new(2, 2, vec![1, 2, 2, 3])
            .unwrap()
            .with_class(1, "rock")
            .with_class(2, "sand");
        let projection = projector.project(2, 2).unwrap();
        grid.apply_projection(&projection).unwrap();

        assert_eq!(grid.materials(), ["rock", "sand"]);
        let materials: Vec<(usize, bool)> =
            grid.cells().iter().map(|c| (c.material, c.is_hole)).collect();
        assert_eq!(materials, vec![(0, false), (1, false), (1, false), (0, true)]);
        // Heights untouched by a material-only projection.
        assert!(grid.cells().iter().all(|c| c.height == 1.0));
    }

    #[test]
    fn test_apply_projection_length_mismatch() {
        let mut grid = TerrainGrid::square(2);
        let projection = Projection {
            heights: Some(vec![1.0; 3]),
            ..Projection::default()
        };
        assert!(matches!(
            grid.apply_projection(&projection),
            Err(TerrainError::LengthMismatch { expected: 4, actual: 3, .. })
        ));
        assert!(grid.cells().iter().all(|c| c.height == 0.0));
    }
}
