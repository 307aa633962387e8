//! Hexagonal lattices in axial coordinates.
//!
//! A full hexagonal core of radius `n` is stored in a (2n+1) x (2n+1) grid
//! with the central assembly at `(n, n)`. Cell `(row, col)` has axial
//! coordinates `q = col - n`, `r = row - n`, and belongs to the hexagon when
//! `|q|`, `|r|` and `|q + r|` are all at most `n`. Ring `k` holds `6k`
//! positions.
//!
//! A sector is the closed wedge `q >= 0, -q <= r <= 0` around the central
//! assembly: rows grow upwards and columns to the right, so the central
//! assembly is the bottom-left corner of the sector.

use tracing::debug;

use crate::error::GeometryError;
use crate::grid::{CoreGrid, VOID};

/// Marks sector cells that carry no data (padding) and output cells that
/// have not been written yet.
pub const SENTINEL: i64 = -1;

/// Axial coordinates relative to the central assembly.
pub type Axial = (i64, i64);

/// Rotates by +60 degrees.
#[must_use]
pub const fn rotate((q, r): Axial) -> Axial {
    (q + r, -q)
}

/// Rotates by -60 degrees.
#[must_use]
pub const fn rotate_back((q, r): Axial) -> Axial {
    (-r, q + r)
}

/// Hexagonal ring index (0 for the center).
#[must_use]
pub fn ring((q, r): Axial) -> i64 {
    q.abs().max(r.abs()).max((q + r).abs())
}

/// Half-open reference wedge: every non-central position has exactly one
/// rotation landing here.
#[must_use]
pub const fn in_reference_wedge((q, r): Axial) -> bool {
    q > 0 && r <= 0 && r > -q
}

/// Splits a non-central position into `(sextant, reference position)` with
/// `rotate^sextant(reference) == position`.
#[must_use]
pub fn sextant_of(pos: Axial) -> Option<(u32, Axial)> {
    if pos == (0, 0) {
        return None;
    }
    let mut reference = pos;
    for k in 0..6 {
        if in_reference_wedge(reference) {
            return Some((k, reference));
        }
        reference = rotate_back(reference);
    }
    None
}

/// Radius of a square hexagonal grid, or `None` for even or non-square grids.
#[must_use]
pub fn radius_of(grid: &CoreGrid) -> Option<usize> {
    (grid.is_square() && grid.rows() % 2 == 1).then(|| grid.rows() / 2)
}

/// Axial coordinates of a grid cell around the center `(n, n)`.
#[must_use]
pub fn axial_of(n: usize, row: usize, col: usize) -> Axial {
    (col as i64 - n as i64, row as i64 - n as i64)
}

/// Grid cell of an axial position around the center `(n, n)`.
#[must_use]
pub fn cell_of(n: usize, (q, r): Axial) -> Option<(usize, usize)> {
    let row = usize::try_from(n as i64 + r).ok()?;
    let col = usize::try_from(n as i64 + q).ok()?;
    (row <= 2 * n && col <= 2 * n).then_some((row, col))
}

/// Crops a raw sector so that its central assembly is the bottom-left corner,
/// then pads it to a square with [`SENTINEL`] cells.
fn normalize_sector(sector: &CoreGrid) -> Result<CoreGrid, GeometryError> {
    let mut center_row = None;
    let mut center_col = None;
    for (r, c, v) in sector.iter() {
        if v != VOID {
            center_row = Some(center_row.map_or(r, |cr: usize| cr.max(r)));
            center_col = Some(center_col.map_or(c, |cc: usize| cc.min(c)));
        }
    }
    let (Some(center_row), Some(center_col)) = (center_row, center_col) else {
        return Err(GeometryError::EmptySector);
    };

    let rows = center_row + 1;
    let cols = sector.cols() - center_col;
    let size = rows.max(cols);
    if rows != cols {
        debug!(rows, cols, size, "padding irregular hexagonal sector");
    }

    let mut out = CoreGrid::filled(size, size, SENTINEL);
    let row_shift = size - rows;
    for r in 0..rows {
        for c in 0..cols {
            out.set(r + row_shift, c, sector.get(r, c + center_col));
        }
    }
    Ok(out)
}

/// Unfolds a 60 degree sector into the full hexagon.
pub fn unfold_sextant(sector: &CoreGrid) -> Result<CoreGrid, GeometryError> {
    let sector = normalize_sector(sector)?;
    let size = sector.rows();
    let bottom = size - 1;

    // Value of the sector cell in column q and grid row `row`.
    let at = |q: usize, row: usize| -> i64 { sector.get(row, q) };
    let row_of = |r: i64| -> usize { (bottom as i64 + r) as usize };

    let mut radius = 0usize;
    for (row, col, v) in sector.iter() {
        if v == VOID || v == SENTINEL {
            continue;
        }
        let (q, r) = (col as i64, row as i64 - bottom as i64);
        if r < -q {
            return Err(GeometryError::OutsideSector { row, col });
        }
        radius = radius.max(col);
    }

    let n = radius;
    let mut full = CoreGrid::filled(2 * n + 1, 2 * n + 1, SENTINEL);
    let center = at(0, bottom);
    if center != SENTINEL {
        full.set(n, n, center);
    }

    let mut place = |pos: Axial, value: i64| {
        let mut p = pos;
        for _ in 0..6 {
            if let Some((row, col)) = cell_of(n, p) {
                full.set(row, col, value);
            }
            p = rotate(p);
        }
    };

    // Wedge interiors never overlap under rotation.
    for q in 2..=n as i64 {
        for r in (1 - q)..0 {
            let v = at(q as usize, row_of(r));
            if v != SENTINEL {
                place((q, r), v);
            }
        }
    }

    // The two wedge edges are images of each other: (k, 0) rotates onto (k, -k).
    for k in 1..=n as i64 {
        let first = at(k as usize, bottom);
        let second = at(k as usize, row_of(-k));
        let value = match (first, second) {
            (SENTINEL, SENTINEL) => continue,
            (SENTINEL, v) | (v, SENTINEL) => v,
            (a, b) => super::merge_cell(row_of(-k), k as usize, b, a)?,
        };
        place((k, 0), value);
    }

    let mut stripped = CoreGrid::new(full.rows(), full.cols());
    for (r, c, v) in full.iter() {
        if v != SENTINEL {
            stripped.set(r, c, v);
        }
    }
    Ok(stripped)
}

/// Extracts the closed wedge of a full hexagonal grid.
pub fn fold_sextant(full: &CoreGrid) -> Result<CoreGrid, GeometryError> {
    let Some(n) = radius_of(full) else {
        return Err(GeometryError::NotSquare {
            rows: full.rows(),
            cols: full.cols(),
        });
    };
    let mut sector = CoreGrid::new(n + 1, n + 1);
    for q in 0..=n as i64 {
        for r in -q..=0 {
            if let Some((row, col)) = cell_of(n, (q, r)) {
                sector.set((n as i64 + r) as usize, q as usize, full.get(row, col));
            }
        }
    }
    Ok(sector)
}
