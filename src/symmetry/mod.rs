//! Reconstruction of a full core lattice from one symmetric sector.
//!
//! Square lattices (45, 90 and 180 degrees) store the sector inside the full
//! N x N frame and are completed by mirror steps. Hexagonal lattices (60
//! degrees) are stored in axial coordinates and completed by six rotations of
//! a closed 60 degree wedge. `fold` is the inverse and extracts the canonical
//! sector back out of a full grid.

pub mod hex;
pub mod square;

use tracing::debug;

use crate::error::GeometryError;
use crate::geometry::Rotation;
use crate::grid::CoreGrid;

/// Rebuilds the full core grid from a sector.
///
/// # Errors
///
/// Returns a `GeometryError` for negative cells, non-square sectors on
/// square lattices, hexagonal cells outside the wedge and mirrored cells
/// that disagree.
///
/// # Examples
///
/// ```
/// use coremap::{symmetry, CoreGrid, Rotation};
///
/// let sector = CoreGrid::from_rows(vec![vec![1, 2, 1], vec![0, 0, 0], vec![0, 0, 0]]).unwrap();
/// let full = symmetry::unfold(&sector, Rotation::Half).unwrap();
/// assert_eq!(full.cells(), &[1, 2, 1, 0, 0, 0, 1, 2, 1]);
/// ```
pub fn unfold(sector: &CoreGrid, rotation: Rotation) -> Result<CoreGrid, GeometryError> {
    sector.ensure_non_negative()?;
    let full = match rotation {
        Rotation::Full => sector.clone(),
        Rotation::Half => square::unfold_half(sector)?,
        Rotation::Quadrant => square::unfold_quadrant(sector)?,
        Rotation::Octant => square::unfold_octant(sector)?,
        Rotation::Sextant => hex::unfold_sextant(sector)?,
    };
    debug!(
        rotation = rotation.degrees(),
        sector_rows = sector.rows(),
        full_rows = full.rows(),
        assemblies = full.count_nonzero(),
        "unfolded core sector"
    );
    Ok(full)
}

/// Extracts the canonical sector of a full grid.
///
/// Square sectors keep the full frame with void outside the sector;
/// hexagonal sectors are returned as an (n+1) x (n+1) wedge whose central
/// assembly sits in the bottom-left corner.
///
/// # Errors
///
/// Returns a `GeometryError` if the grid shape does not fit the rotation.
pub fn fold(full: &CoreGrid, rotation: Rotation) -> Result<CoreGrid, GeometryError> {
    match rotation {
        Rotation::Full => Ok(full.clone()),
        Rotation::Half | Rotation::Quadrant | Rotation::Octant => square::fold(full, rotation),
        Rotation::Sextant => hex::fold_sextant(full),
    }
}

/// Resolves a cell shared by two mirror images.
///
/// Void yields to data; two different non-void values mean the sector is
/// malformed.
pub(crate) fn merge_cell(
    row: usize,
    col: usize,
    value: i64,
    mirrored: i64,
) -> Result<i64, GeometryError> {
    match (value, mirrored) {
        (0, m) => Ok(m),
        (v, 0) => Ok(v),
        (v, m) if v == m => Ok(v),
        (v, m) => Err(GeometryError::InconsistentMirror {
            row,
            col,
            value: v,
            mirrored: m,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_rotation_is_identity() {
        let grid = CoreGrid::from_rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap();
        assert_eq!(unfold(&grid, Rotation::Full).unwrap(), grid);
        assert_eq!(fold(&grid, Rotation::Full).unwrap(), grid);
    }

    #[test]
    fn negative_sector_is_rejected_for_every_rotation() {
        let grid = CoreGrid::from_rows(vec![vec![1, -1], vec![0, 0]]).unwrap();
        for rotation in [Rotation::Full, Rotation::Half, Rotation::Quadrant, Rotation::Sextant] {
            assert!(matches!(
                unfold(&grid, rotation),
                Err(GeometryError::NegativeCell { .. })
            ));
        }
    }

    #[test]
    fn merge_cell_rules() {
        assert_eq!(merge_cell(0, 0, 0, 4).unwrap(), 4);
        assert_eq!(merge_cell(0, 0, 4, 0).unwrap(), 4);
        assert_eq!(merge_cell(0, 0, 4, 4).unwrap(), 4);
        assert!(merge_cell(0, 0, 4, 5).is_err());
    }
}
