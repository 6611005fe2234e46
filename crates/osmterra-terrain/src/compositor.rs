//! Drawing one terrain grid onto another.
//!
//! Compositing copies a rectangular region of a source grid into a rectangular
//! region of a destination grid using nearest-cell resampling. Material indices
//! are translated through a union of the two name tables so a destination cell
//! never points past the end of its (possibly grown) table.

use crate::grid::{check_unique, GridRect, TerrainGrid};
use crate::{Result, TerrainError};
use osmterra_metrics::metric_defs;
use tracing::debug;

/// Union `src` into `dst`, returning the source-to-destination index translation.
///
/// Existing destination names keep their indices; source names not yet present
/// are appended in source order. `translation[i]` is the destination index of
/// `src[i]`.
pub fn merge_material_names(dst: &mut Vec<String>, src: &[String]) -> Vec<usize> {
    src.iter()
        .map(|name| match dst.iter().position(|existing| existing == name) {
            Some(index) => index,
            None => {
                debug!(material = %name, index = dst.len(), "appending material");
                dst.push(name.clone());
                dst.len() - 1
            }
        })
        .collect()
}

/// Map a destination offset inside a span of `dst_len` cells onto a span of
/// `src_len` cells, sampling at cell centres.
///
/// Computed in `u128`: `dst_len` is unclipped and may be close to `usize::MAX`,
/// while `src_len` is bounded by an allocated grid. The result is below `src_len`.
fn resample(offset: usize, dst_len: usize, src_len: usize) -> usize {
    let sampled = ((2 * offset as u128 + 1) * src_len as u128) / (2 * dst_len as u128);
    sampled as usize
}

/// Draw `src_rect` of `src` into `dst_rect` of `dst`.
///
/// `dst_rect` is clipped to the destination on all four sides and may start
/// above or left of it; `src_rect` must lie entirely inside the source. Heights are multiplied by `height_scale`, hole flags are
/// copied and materials are remapped through the merged name table. All
/// checks run before the destination is touched, so a failed draw leaves it
/// unchanged.
pub fn draw(
    dst: &mut TerrainGrid,
    src: &TerrainGrid,
    dst_rect: GridRect,
    src_rect: GridRect,
    height_scale: f32,
) -> Result<()> {
    if !src_rect.fits_within(src.width(), src.height()) {
        return Err(TerrainError::RectOutOfBounds {
            x: src_rect.x,
            y: src_rect.y,
            width: src_rect.width,
            height: src_rect.height,
            grid_width: src.width(),
            grid_height: src.height(),
        });
    }
    if src_rect.is_empty() {
        return Err(TerrainError::EmptySourceRect);
    }
    check_unique(src.materials())?;
    check_unique(dst.materials())?;
    src.check_materials_in(src_rect)?;

    let clipped = dst_rect.clip(dst.width(), dst.height());
    if clipped.is_empty() {
        return Ok(());
    }

    let translation = merge_material_names(dst.materials_mut(), src.materials());

    // src_rect fits within the source, so its origin is non-negative.
    let (src_x, src_y) = (src_rect.x as usize, src_rect.y as usize);
    let dst_width = dst.width();
    let cells = dst.cells_mut();
    for y in clipped.rows() {
        let dy = (y as isize).abs_diff(dst_rect.y);
        let sy = src_y + resample(dy, dst_rect.height, src_rect.height);
        for x in clipped.columns() {
            let dx = (x as isize).abs_diff(dst_rect.x);
            let sx = src_x + resample(dx, dst_rect.width, src_rect.width);
            let source = src.cells()[sy * src.width() + sx];
            let target = &mut cells[y * dst_width + x];

            target.height = source.height * height_scale;
            target.is_hole = source.is_hole;
            target.material = if source.is_hole {
                0
            } else {
                // Only index 0 against an empty table falls through here.
                translation.get(source.material).copied().unwrap_or(0)
            };
        }
    }

    metrics::counter!(metric_defs::TERRAIN_CELLS_COMPOSITED.name)
        .increment((clipped.width * clipped.height) as u64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainCell;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_material_names() {
        let mut dst = names(&["A", "B"]);
        let translation = merge_material_names(&mut dst, &names(&["B", "C"]));
        assert_eq!(dst, names(&["A", "B", "C"]));
        assert_eq!(translation, vec![1, 2]);
    }

    #[test]
    fn test_merge_into_empty() {
        let mut dst = Vec::new();
        let translation = merge_material_names(&mut dst, &names(&["x", "y"]));
        assert_eq!(dst, names(&["x", "y"]));
        assert_eq!(translation, vec![0, 1]);
    }

    #[test]
    fn test_resample_covers_span() {
        // Upsampling 2 -> 4 repeats each source cell twice.
        let mapped: Vec<usize> = (0..4).map(|o| resample(o, 4, 2)).collect();
        assert_eq!(mapped, vec![0, 0, 1, 1]);
        // Downsampling 4 -> 2 picks one cell from each pair.
        let mapped: Vec<usize> = (0..2).map(|o| resample(o, 2, 4)).collect();
        assert_eq!(mapped, vec![1, 3]);
        // Identity.
        assert!((0..7).all(|o| resample(o, 7, 7) == o));
    }

    #[test]
    fn test_draw_copies_and_scales() {
        let mut src = TerrainGrid::square(2);
        src.set_materials(names(&["rock"]));
        src.fill(TerrainCell::new(10.0, 0));
        src.cell_mut(1, 1).unwrap().is_hole = true;

        let mut dst = TerrainGrid::square(4);
        draw(&mut dst, &src, GridRect::new(0, 0, 4, 4), GridRect::new(0, 0, 2, 2), 0.5).unwrap();

        assert_eq!(dst.materials(), ["rock"]);
        assert_eq!(dst.cell(0, 0).unwrap().height, 5.0);
        assert!(!dst.cell(1, 1).unwrap().is_hole);
        assert!(dst.cell(2, 2).unwrap().is_hole);
        assert!(dst.cell(3, 3).unwrap().is_hole);
    }

    #[test]
    fn test_draw_clips_destination() {
        let mut src = TerrainGrid::square(2);
        src.fill(TerrainCell::new(1.0, 0));
        let mut dst = TerrainGrid::square(3);

        draw(&mut dst, &src, GridRect::new(2, 2, 2, 2), GridRect::new(0, 0, 2, 2), 1.0).unwrap();

        let touched: Vec<(usize, usize)> = (0..3)
            .flat_map(|y| (0..3).map(move |x| (x, y)))
            .filter(|&(x, y)| dst.cell(x, y).unwrap().height != 0.0)
            .collect();
        assert_eq!(touched, vec![(2, 2)]);
    }

    #[test]
    fn test_resample_huge_span() {
        assert_eq!(resample(0, usize::MAX, 2), 0);
        assert_eq!(resample(usize::MAX - 1, usize::MAX, 2), 1);
    }

    #[test]
    fn test_empty_source_rect_rejected() {
        let src = TerrainGrid::square(2);
        let mut dst = TerrainGrid::square(2);
        let err = draw(&mut dst, &src, GridRect::new(0, 0, 2, 2), GridRect::new(1, 1, 0, 1), 1.0);
        assert!(matches!(err, Err(TerrainError::EmptySourceRect)));
    }
}
