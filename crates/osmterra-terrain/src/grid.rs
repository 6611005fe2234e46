//! In-memory terrain grid.

use crate::compositor::merge_material_names;
use crate::projector::Projection;
use crate::{Result, TerrainError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// One grid unit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TerrainCell {
    /// Absolute height in world units.
    pub height: f32,
    /// Index into the grid's material name table.
    pub material: usize,
    /// A hole has no collidable surface, whatever its height or material.
    pub is_hole: bool,
}

impl TerrainCell {
    /// Create a solid cell.
    pub const fn new(height: f32, material: usize) -> Self {
        Self {
            height,
            material,
            is_hole: false,
        }
    }

    /// Create a hole cell.
    pub const fn hole() -> Self {
        Self {
            height: 0.0,
            material: 0,
            is_hole: true,
        }
    }
}

/// An axis-aligned cell rectangle.
///
/// The origin is signed so a destination rectangle may hang off the top or
/// left edge of its grid; [`GridRect::clip`] trims it on all four sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridRect {
    /// Left column.
    pub x: isize,
    /// Top row.
    pub y: isize,
    /// Width in cells.
    pub width: usize,
    /// Height in cells.
    pub height: usize,
}

impl GridRect {
    /// Create a rectangle.
    pub const fn new(x: isize, y: isize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> isize {
        self.x.saturating_add_unsigned(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> isize {
        self.y.saturating_add_unsigned(self.height)
    }

    /// Check whether the rectangle covers no cells.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check whether the rectangle lies entirely inside a `width` x `height` grid.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= signed(width)
            && self.bottom() <= signed(height)
    }

    /// Clip the rectangle to a `width` x `height` grid.
    ///
    /// The result has a non-negative origin; it is empty when nothing overlaps.
    pub fn clip(&self, width: usize, height: usize) -> GridRect {
        let x = self.x.clamp(0, signed(width));
        let y = self.y.clamp(0, signed(height));
        GridRect {
            x,
            y,
            width: self.right().min(signed(width)).saturating_sub(x).max(0) as usize,
            height: self.bottom().min(signed(height)).saturating_sub(y).max(0) as usize,
        }
    }

    /// Column indices covered by the non-negative part of the rectangle.
    pub fn columns(&self) -> Range<usize> {
        self.x.max(0) as usize..self.right().max(0) as usize
    }

    /// Row indices covered by the non-negative part of the rectangle.
    pub fn rows(&self) -> Range<usize> {
        self.y.max(0) as usize..self.bottom().max(0) as usize
    }
}

/// A grid dimension as `isize`, saturating.
fn signed(len: usize) -> isize {
    isize::try_from(len).unwrap_or(isize::MAX)
}

/// A dense row-major grid of terrain cells plus its material name table.
///
/// The material-table invariant (every solid cell's index is below the table
/// length, names are unique) is only checked at the codec and compositing
/// boundaries via [`TerrainGrid::check_materials`]; direct cell edits are the
/// caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    cells: Vec<TerrainCell>,
    materials: Vec<String>,
}

impl TerrainGrid {
    /// Create a grid of default cells.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![TerrainCell::default(); width * height],
            materials: Vec::new(),
        }
    }

    /// Create a square grid of default cells.
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Build a grid from existing cells.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<TerrainCell>,
        materials: Vec<String>,
    ) -> Result<Self> {
        if cells.len() != width * height {
            return Err(TerrainError::LengthMismatch {
                what: "cells",
                expected: width * height,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
            materials,
        })
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Side length if the grid is square.
    pub fn size(&self) -> Option<usize> {
        (self.width == self.height).then_some(self.width)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[TerrainCell] {
        &self.cells
    }

    /// Mutable access to all cells in row-major order.
    pub fn cells_mut(&mut self) -> &mut [TerrainCell] {
        &mut self.cells
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Cell at column `x`, row `y`.
    pub fn cell(&self, x: usize, y: usize) -> Option<&TerrainCell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Mutable cell at column `x`, row `y`.
    pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut TerrainCell> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    /// Map normalized `[0, 1]` coordinates to the nearest cell.
    ///
    /// `index = round(v * dimension)`, clamped to the last cell so `1.0` stays in range.
    fn normalized_index(&self, u: f32, v: f32) -> Option<usize> {
        if self.cells.is_empty() || !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        let x = ((u * self.width as f32).round() as usize).min(self.width - 1);
        let y = ((v * self.height as f32).round() as usize).min(self.height - 1);
        self.index(x, y)
    }

    /// Cell at normalized coordinates.
    pub fn cell_normalized(&self, u: f32, v: f32) -> Option<&TerrainCell> {
        self.normalized_index(u, v).map(|i| &self.cells[i])
    }

    /// Mutable cell at normalized coordinates.
    pub fn cell_normalized_mut(&mut self, u: f32, v: f32) -> Option<&mut TerrainCell> {
        self.normalized_index(u, v).map(move |i| &mut self.cells[i])
    }

    /// Set every cell to `cell`.
    pub fn fill(&mut self, cell: TerrainCell) {
        self.cells.fill(cell);
    }

    /// Reset all cells to default and empty the material table.
    pub fn clear(&mut self) {
        self.cells.fill(TerrainCell::default());
        self.materials.clear();
    }

    /// Material name table.
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Index of a material name, if present.
    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m == name)
    }

    /// Index of a material name, appending it if missing.
    pub fn add_material(&mut self, name: &str) -> usize {
        match self.material_index(name) {
            Some(index) => index,
            None => {
                self.materials.push(name.to_string());
                self.materials.len() - 1
            }
        }
    }

    /// Replace the material name table without touching cells.
    pub fn set_materials(&mut self, materials: Vec<String>) {
        self.materials = materials;
    }

    pub(crate) fn materials_mut(&mut self) -> &mut Vec<String> {
        &mut self.materials
    }

    /// Validate the material table invariant.
    ///
    /// Names must be unique and every solid cell's material must index the table.
    /// Index 0 is accepted against an empty table since that is the cleared state.
    pub fn check_materials(&self) -> Result<()> {
        check_unique(&self.materials)?;
        self.check_materials_in(GridRect::new(0, 0, self.width, self.height))
    }

    /// Validate material indices of the solid cells inside `rect`.
    pub(crate) fn check_materials_in(&self, rect: GridRect) -> Result<()> {
        let rect = rect.clip(self.width, self.height);
        let count = self.materials.len();
        for y in rect.rows() {
            for x in rect.columns() {
                let cell = &self.cells[y * self.width + x];
                if !cell.is_hole && cell.material >= count && cell.material != 0 {
                    return Err(TerrainError::MaterialOutOfRange {
                        x,
                        y,
                        index: cell.material,
                        count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace heights and/or materials from a projection.
    ///
    /// Arrays must be row-major and exactly `width * height` long; nothing is
    /// written if an array has the wrong length or a material class points past
    /// the projection's name list. Projected names are merged into the grid's
    /// table the same way compositing merges them.
    pub fn apply_projection(&mut self, projection: &Projection) -> Result<()> {
        let expected = self.cells.len();
        for (what, len) in [
            ("heights", projection.heights.as_ref().map(Vec::len)),
            ("materials", projection.materials.as_ref().map(Vec::len)),
        ] {
            if let Some(actual) = len {
                if actual != expected {
                    return Err(TerrainError::LengthMismatch {
                        what,
                        expected,
                        actual,
                    });
                }
            }
        }
        check_unique(&projection.material_names)?;
        if let Some(materials) = &projection.materials {
            let count = projection.material_names.len();
            if let Some(i) = materials.iter().position(|m| m.is_some_and(|m| m >= count)) {
                return Err(TerrainError::MaterialOutOfRange {
                    x: i % self.width,
                    y: i / self.width,
                    index: materials[i].unwrap_or_default(),
                    count,
                });
            }
        }

        if let Some(heights) = &projection.heights {
            for (cell, &h) in self.cells.iter_mut().zip(heights) {
                cell.height = h;
            }
        }
        if let Some(materials) = &projection.materials {
            let translation = merge_material_names(&mut self.materials, &projection.material_names);
            for (cell, material) in self.cells.iter_mut().zip(materials) {
                match material {
                    Some(m) => {
                        cell.material = translation[*m];
                        cell.is_hole = false;
                    }
                    None => cell.is_hole = true,
                }
            }
        }
        Ok(())
    }
}

/// Reject a name table containing duplicates.
pub(crate) fn check_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(TerrainError::DuplicateMaterial(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_defaults() {
        let grid = TerrainGrid::new(4, 3);
        assert_eq!(grid.cells().len(), 12);
        assert_eq!(grid.size(), None);
        assert!(grid.cells().iter().all(|c| *c == TerrainCell::default()));
        assert_eq!(TerrainGrid::square(5).size(), Some(5));
    }

    #[test]
    fn test_cell_access_row_major() {
        let mut grid = TerrainGrid::new(4, 3);
        grid.cell_mut(3, 1).unwrap().height = 7.0;
        assert_eq!(grid.cells()[7].height, 7.0);
        assert!(grid.cell(4, 0).is_none());
        assert!(grid.cell(0, 3).is_none());
    }

    #[test]
    fn test_normalized_access() {
        let mut grid = TerrainGrid::square(10);
        grid.cell_mut(5, 2).unwrap().height = 1.5;
        // round(0.48 * 10) = 5, round(0.2 * 10) = 2
        assert_eq!(grid.cell_normalized(0.48, 0.2).unwrap().height, 1.5);
        // 1.0 clamps to the last cell instead of falling off the grid.
        grid.cell_normalized_mut(1.0, 1.0).unwrap().height = 3.0;
        assert_eq!(grid.cell(9, 9).unwrap().height, 3.0);
        assert!(grid.cell_normalized(1.1, 0.0).is_none());
        assert!(grid.cell_normalized(-0.1, 0.0).is_none());
    }

    #[test]
    fn test_clear_resets_cells_and_names() {
        let mut grid = TerrainGrid::square(2);
        grid.add_material("grass");
        grid.fill(TerrainCell {
            height: 4.0,
            material: 0,
            is_hole: true,
        });
        grid.clear();
        assert!(grid.materials().is_empty());
        assert!(grid.cells().iter().all(|c| *c == TerrainCell::default()));
    }

    #[test]
    fn test_add_material_is_find_or_append() {
        let mut grid = TerrainGrid::square(1);
        assert_eq!(grid.add_material("rock"), 0);
        assert_eq!(grid.add_material("sand"), 1);
        assert_eq!(grid.add_material("rock"), 0);
        assert_eq!(grid.materials(), ["rock", "sand"]);
    }

    #[test]
    fn test_check_materials() {
        let mut grid = TerrainGrid::square(2);
        // Cleared grid: material 0 with an empty table is fine.
        assert!(grid.check_materials().is_ok());

        grid.cell_mut(1, 1).unwrap().material = 2;
        assert!(matches!(
            grid.check_materials(),
            Err(TerrainError::MaterialOutOfRange { x: 1, y: 1, index: 2, count: 0 })
        ));

        // Holes are exempt.
        grid.cell_mut(1, 1).unwrap().is_hole = true;
        assert!(grid.check_materials().is_ok());

        grid.set_materials(vec!["a".into(), "a".into()]);
        assert!(matches!(
            grid.check_materials(),
            Err(TerrainError::DuplicateMaterial(_))
        ));
    }

    #[test]
    fn test_from_cells_length_check() {
        let err = TerrainGrid::from_cells(2, 2, vec![TerrainCell::default(); 3], Vec::new());
        assert!(matches!(err, Err(TerrainError::LengthMismatch { expected: 4, actual: 3, .. })));
    }

    #[test]
    fn test_rect_clip() {
        let r = GridRect::new(3, 3, 10, 10).clip(5, 6);
        assert_eq!(r, GridRect::new(3, 3, 2, 3));
        assert!(GridRect::new(8, 0, 2, 2).clip(5, 5).is_empty());
        assert!(GridRect::new(0, 0, 5, 5).fits_within(5, 5));
        assert!(!GridRect::new(1, 0, 5, 5).fits_within(5, 5));
    }

    #[test]
    fn test_rect_clip_top_left() {
        let r = GridRect::new(-2, -1, 4, 4).clip(5, 5);
        assert_eq!(r, GridRect::new(0, 0, 2, 3));
        assert_eq!(r.columns(), 0..2);
        assert_eq!(r.rows(), 0..3);
        assert!(!GridRect::new(-1, 0, 2, 2).fits_within(5, 5));

        // Entirely above or left of the grid.
        assert!(GridRect::new(-4, 0, 3, 3).clip(5, 5).is_empty());
        assert!(GridRect::new(0, -9, 3, 3).clip(5, 5).is_empty());
    }

    #[test]
    fn test_rect_clip_huge() {
        let r = GridRect::new(isize::MIN, 1, usize::MAX, usize::MAX).clip(4, 4);
        assert_eq!(r, GridRect::new(0, 1, 4, 3));
    }
}
