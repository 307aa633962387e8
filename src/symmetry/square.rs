//! Mirror-based unfolding for square lattices.
//!
//! Each step completes the grid with its own mirror image. Cells on the
//! mirror line map onto themselves; every other overlap must carry equal
//! values, see [`super::merge_cell`].

use crate::error::GeometryError;
use crate::geometry::Rotation;
use crate::grid::CoreGrid;

use super::merge_cell;

fn ensure_square(grid: &CoreGrid) -> Result<usize, GeometryError> {
    if grid.is_square() {
        Ok(grid.rows())
    } else {
        Err(GeometryError::NotSquare {
            rows: grid.rows(),
            cols: grid.cols(),
        })
    }
}

fn mirror_merge<F>(grid: &CoreGrid, mirror: F) -> Result<CoreGrid, GeometryError>
where
    F: Fn(usize, usize) -> (usize, usize),
{
    let mut out = CoreGrid::new(grid.rows(), grid.cols());
    for (r, c, v) in grid.iter() {
        let (mr, mc) = mirror(r, c);
        out.set(r, c, merge_cell(r, c, v, grid.get(mr, mc))?);
    }
    Ok(out)
}

/// 180 degrees: vertical mirror.
pub fn unfold_half(sector: &CoreGrid) -> Result<CoreGrid, GeometryError> {
    let n = ensure_square(sector)?;
    mirror_merge(sector, |r, c| (n - 1 - r, c))
}

/// 90 degrees: horizontal mirror, then 180 degrees.
pub fn unfold_quadrant(sector: &CoreGrid) -> Result<CoreGrid, GeometryError> {
    let n = ensure_square(sector)?;
    let half = mirror_merge(sector, |r, c| (r, n - 1 - c))?;
    unfold_half(&half)
}

/// 45 degrees: main-diagonal mirror, then 90 degrees.
pub fn unfold_octant(sector: &CoreGrid) -> Result<CoreGrid, GeometryError> {
    ensure_square(sector)?;
    let quadrant = mirror_merge(sector, |r, c| (c, r))?;
    unfold_quadrant(&quadrant)
}

fn in_sector(rotation: Rotation, n: usize, row: usize, col: usize) -> bool {
    let mid = (n - 1) / 2;
    match rotation {
        Rotation::Half => row <= mid,
        Rotation::Quadrant => row <= mid && col <= mid,
        Rotation::Octant => row <= mid && col <= mid && col >= row,
        Rotation::Full | Rotation::Sextant => true,
    }
}

/// Keeps only the canonical sector of a full square grid.
pub fn fold(full: &CoreGrid, rotation: Rotation) -> Result<CoreGrid, GeometryError> {
    let n = ensure_square(full)?;
    let mut out = CoreGrid::new(n, n);
    for (r, c, v) in full.iter() {
        if in_sector(rotation, n, r, c) {
            out.set(r, c, v);
        }
    }
    Ok(out)
}
