//! Assembly numbering and center coordinates.
//!
//! Two numbering schemes coexist for the lifetime of a run:
//! - **Library ids**: dense, 1-based, column-major over the non-void cells of
//!   the initial full grid.
//! - **Application ids**: hexagonal 60 degree cores only. The central
//!   assembly is 1, the reference sextant is numbered ring by ring outwards,
//!   and sextant `k` adds `k * (N - 1) / 6` to the reference ids.
//!
//! Both tables are built once and are read-only afterwards.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GeometryError;
use crate::geometry::{AssemblyGeometry, Rotation, Shape};
use crate::grid::{CoreGrid, VOID};
use crate::symmetry::hex;

/// Which numbering scheme a list of assembly ids uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numbering {
    /// Column-major compacted ids.
    #[default]
    Library,
    /// Center-outward, sector-ordered ids (hexagonal cores).
    Application,
}

#[derive(Debug, Clone)]
struct ApplicationIds {
    lib_to_app: Vec<u32>,
    app_to_lib: Vec<u32>,
}

/// Per-assembly coordinates and id tables of a full core.
#[derive(Debug, Clone)]
pub struct LatticeMap {
    geometry: AssemblyGeometry,
    rotation: Rotation,
    grid_shape: (usize, usize),
    cells: Vec<(usize, usize)>,
    by_cell: HashMap<(usize, usize), u32>,
    centers: Vec<(f64, f64)>,
    application: Option<ApplicationIds>,
}

fn snap(v: f64, pitch: f64) -> f64 {
    if v.abs() < 1e-9 * pitch {
        0.0
    } else {
        v
    }
}

impl LatticeMap {
    /// Builds the numbering tables and centers of `full`.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryError` if a hexagonal grid is not square with odd
    /// size, or if a 60 degree core is not invariant under 60 degree
    /// rotation.
    pub fn new(
        full: &CoreGrid,
        geometry: AssemblyGeometry,
        rotation: Rotation,
    ) -> Result<Self, GeometryError> {
        let hex_radius = if geometry.shape().is_hexagonal() {
            Some(hex::radius_of(full).ok_or_else(|| GeometryError::InvalidGeometry {
                reason: format!(
                    "hexagonal grid must be square with odd size, got {}x{}",
                    full.rows(),
                    full.cols()
                ),
            })?)
        } else {
            None
        };

        let mut cells = Vec::new();
        let mut by_cell = HashMap::new();
        for col in 0..full.cols() {
            for row in 0..full.rows() {
                if full.get(row, col) != VOID {
                    cells.push((row, col));
                    by_cell.insert((row, col), cells.len() as u32);
                }
            }
        }

        let pitch = geometry.pitch();
        let centers = cells
            .iter()
            .map(|&(row, col)| match hex_radius {
                Some(n) => hex_center(n, row, col, pitch),
                None => cartesian_center(full.shape(), row, col, pitch),
            })
            .collect();

        let mut map = Self {
            geometry,
            rotation,
            grid_shape: full.shape(),
            cells,
            by_cell,
            centers,
            application: None,
        };

        if let (Some(n), Rotation::Sextant) = (hex_radius, rotation) {
            map.application = Some(map.application_ids(n)?);
        }

        debug!(
            assemblies = map.len(),
            shape = %geometry.shape(),
            application = map.application.is_some(),
            "built lattice map"
        );
        Ok(map)
    }

    fn application_ids(&self, n: usize) -> Result<ApplicationIds, GeometryError> {
        let lib_at = |pos: hex::Axial| hex::cell_of(n, pos).and_then(|cell| self.by_cell.get(&cell).copied());

        let Some(center) = lib_at((0, 0)) else {
            return Err(GeometryError::NoApplicationNumbering {
                reason: "central position is void".to_string(),
            });
        };
        for &(row, col) in &self.cells {
            let pos = hex::axial_of(n, row, col);
            if lib_at(hex::rotate(pos)).is_none() {
                return Err(GeometryError::NoApplicationNumbering {
                    reason: format!("assembly at ({row}, {col}) has no 60 degree image"),
                });
            }
        }

        let total = self.cells.len() as u32;
        let per_sextant = (total - 1) / 6;
        let mut lib_to_app = vec![0u32; self.cells.len()];
        let mut app_to_lib = vec![0u32; self.cells.len()];
        lib_to_app[(center - 1) as usize] = 1;
        app_to_lib[0] = center;

        // Ring by ring; each ring opens at its wedge corner (m, 0).
        let mut next = 2u32;
        for m in 1..=n as i64 {
            for j in 0..m {
                let reference = (m, -j);
                if lib_at(reference).is_none() {
                    continue;
                }
                let mut pos = reference;
                for k in 0..6 {
                    let lib = lib_at(pos).ok_or_else(|| GeometryError::NoApplicationNumbering {
                        reason: format!("position {pos:?} has no assembly"),
                    })?;
                    let app = next + k * per_sextant;
                    lib_to_app[(lib - 1) as usize] = app;
                    app_to_lib[(app - 1) as usize] = lib;
                    pos = hex::rotate(pos);
                }
                next += 1;
            }
        }

        Ok(ApplicationIds {
            lib_to_app,
            app_to_lib,
        })
    }

    /// Number of assemblies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Assembly cross-section shape.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.geometry.shape()
    }

    /// Assembly geometry.
    #[must_use]
    pub const fn geometry(&self) -> &AssemblyGeometry {
        &self.geometry
    }

    /// Symmetry the core was unfolded from.
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// `(rows, cols)` of the full grid.
    #[must_use]
    pub const fn grid_shape(&self) -> (usize, usize) {
        self.grid_shape
    }

    /// True when application ids are available.
    #[must_use]
    pub const fn has_application_numbering(&self) -> bool {
        self.application.is_some()
    }

    fn check(&self, id: u32) -> Result<usize, GeometryError> {
        let max = self.cells.len() as u32;
        if id == 0 || id > max {
            return Err(GeometryError::AssemblyOutOfRange { id, max });
        }
        Ok((id - 1) as usize)
    }

    fn app_table(&self) -> Result<&ApplicationIds, GeometryError> {
        self.application
            .as_ref()
            .ok_or_else(|| GeometryError::NoApplicationNumbering {
                reason: format!("core is {} with rotation {}", self.shape(), self.rotation),
            })
    }

    /// `(x, y)` center of a library id.
    pub fn center_of(&self, library_id: u32) -> Result<(f64, f64), GeometryError> {
        Ok(self.centers[self.check(library_id)?])
    }

    /// Grid cell `(row, col)` of a library id.
    pub fn cell_of(&self, library_id: u32) -> Result<(usize, usize), GeometryError> {
        Ok(self.cells[self.check(library_id)?])
    }

    /// Library id at a grid cell, if the cell holds an assembly.
    #[must_use]
    pub fn library_id_at(&self, row: usize, col: usize) -> Option<u32> {
        self.by_cell.get(&(row, col)).copied()
    }

    /// Library id → application id.
    pub fn to_application(&self, library_id: u32) -> Result<u32, GeometryError> {
        let idx = self.check(library_id)?;
        Ok(self.app_table()?.lib_to_app[idx])
    }

    /// Application id → library id.
    pub fn to_library(&self, application_id: u32) -> Result<u32, GeometryError> {
        let table = self.app_table()?;
        let idx = self.check(application_id)?;
        Ok(table.app_to_lib[idx])
    }

    /// Converts ids of either scheme to library ids.
    pub fn library_ids(&self, ids: &[u32], numbering: Numbering) -> Result<Vec<u32>, GeometryError> {
        ids.iter()
            .map(|&id| match numbering {
                Numbering::Library => self.check(id).map(|_| id),
                Numbering::Application => self.to_library(id),
            })
            .collect()
    }
}

fn cartesian_center((rows, cols): (usize, usize), row: usize, col: usize, pitch: f64) -> (f64, f64) {
    let x = (col as f64 - (cols as f64 - 1.0) / 2.0) * pitch;
    let y = ((rows as f64 - 1.0) / 2.0 - row as f64) * pitch;
    (snap(x, pitch), snap(y, pitch))
}

/// Center of a hexagonal cell: the reference-sextant position is placed with
/// the axial basis, then rotated by `60 * k` degrees into its sextant.
fn hex_center(n: usize, row: usize, col: usize, pitch: f64) -> (f64, f64) {
    let Some((k, (q, r))) = hex::sextant_of(hex::axial_of(n, row, col)) else {
        return (0.0, 0.0);
    };
    let x0 = pitch * (q as f64 + r as f64 / 2.0);
    let y0 = -pitch * 3f64.sqrt() / 2.0 * r as f64;
    let (sin, cos) = (f64::from(k) * PI / 3.0).sin_cos();
    let x = x0 * cos - y0 * sin;
    let y = x0 * sin + y0 * cos;
    (snap(x, pitch), snap(y, pitch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry;

    fn hex_core(sector: Vec<Vec<i64>>) -> LatticeMap {
        let sector = CoreGrid::from_rows(sector).unwrap();
        let full = symmetry::unfold(&sector, Rotation::Sextant).unwrap();
        let geo = AssemblyGeometry::new(Shape::Hexagon, 10.0).unwrap();
        LatticeMap::new(&full, geo, Rotation::Sextant).unwrap()
    }

    #[test]
    fn library_ids_are_column_major() {
        let full = CoreGrid::from_rows(vec![vec![1, 0, 2], vec![3, 4, 0]]).unwrap();
        let geo = AssemblyGeometry::new(Shape::Square, 1.0).unwrap();
        let map = LatticeMap::new(&full, geo, Rotation::Full).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.cell_of(1).unwrap(), (0, 0));
        assert_eq!(map.cell_of(2).unwrap(), (1, 0));
        assert_eq!(map.cell_of(3).unwrap(), (1, 1));
        assert_eq!(map.cell_of(4).unwrap(), (0, 2));
        assert_eq!(map.library_id_at(0, 1), None);
    }

    #[test]
    fn square_centers_are_symmetric_about_origin() {
        let full = CoreGrid::filled(3, 3, 1);
        let geo = AssemblyGeometry::new(Shape::Square, 2.0).unwrap();
        let map = LatticeMap::new(&full, geo, Rotation::Full).unwrap();
        let mid = map.library_id_at(1, 1).unwrap();
        assert_eq!(map.center_of(mid).unwrap(), (0.0, 0.0));
        let top_left = map.library_id_at(0, 0).unwrap();
        assert_eq!(map.center_of(top_left).unwrap(), (-2.0, 2.0));
    }

    #[test]
    fn square_core_has_no_application_ids() {
        let full = CoreGrid::filled(2, 2, 1);
        let geo = AssemblyGeometry::new(Shape::Square, 1.0).unwrap();
        let map = LatticeMap::new(&full, geo, Rotation::Quadrant).unwrap();
        assert!(matches!(
            map.to_application(1),
            Err(GeometryError::NoApplicationNumbering { .. })
        ));
    }

    #[test]
    fn minimal_hexagon_application_ids() {
        let map = hex_core(vec![vec![0, 2], vec![1, 2]]);
        assert_eq!(map.len(), 7);
        let center = map.library_id_at(1, 1).unwrap();
        assert_eq!(map.to_application(center).unwrap(), 1);
        // (q, r) = (1, 0) opens the ring, then +60 degree steps.
        let expected = [((1, 2), 2), ((0, 2), 3), ((0, 1), 4), ((1, 0), 5), ((2, 0), 6), ((2, 1), 7)];
        for ((row, col), app) in expected {
            let lib = map.library_id_at(row, col).unwrap();
            assert_eq!(map.to_application(lib).unwrap(), app);
        }
    }

    #[test]
    fn application_ids_round_trip() {
        let map = hex_core(vec![vec![0, 0, 4], vec![0, 2, 5], vec![1, 2, 4]]);
        assert_eq!(map.len(), 19);
        for lib in 1..=19 {
            let app = map.to_application(lib).unwrap();
            assert_eq!(map.to_library(app).unwrap(), lib);
        }
    }

    #[test]
    fn hex_ring_one_is_one_pitch_away() {
        let map = hex_core(vec![vec![0, 2], vec![1, 2]]);
        for lib in 1..=7 {
            let (x, y) = map.center_of(lib).unwrap();
            let d = (x * x + y * y).sqrt();
            if map.to_application(lib).unwrap() == 1 {
                assert!(d < 1e-12);
            } else {
                assert!((d - 10.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn hex_centers_rotate_with_application_ids() {
        let map = hex_core(vec![vec![0, 0, 4], vec![0, 2, 5], vec![1, 2, 4]]);
        // Assemblies k*per apart are 60*k degrees apart.
        let per = 3;
        for app in 2..=4u32 {
            let (x0, y0) = map.center_of(map.to_library(app).unwrap()).unwrap();
            let (x1, y1) = map.center_of(map.to_library(app + per).unwrap()).unwrap();
            let (s, c) = (PI / 3.0).sin_cos();
            assert!((x0 * c - y0 * s - x1).abs() < 1e-9);
            assert!((x0 * s + y0 * c - y1).abs() < 1e-9);
        }
    }

    #[test]
    fn out_of_range_ids() {
        let map = hex_core(vec![vec![0, 2], vec![1, 2]]);
        assert!(matches!(
            map.center_of(0),
            Err(GeometryError::AssemblyOutOfRange { id: 0, max: 7 })
        ));
        assert!(map.to_library(8).is_err());
        assert_eq!(map.library_ids(&[1, 2], Numbering::Library).unwrap(), vec![1, 2]);
    }

    #[test]
    fn asymmetric_hexagon_has_no_application_ids() {
        let full = CoreGrid::from_rows(vec![vec![0, 1, 1], vec![1, 1, 1], vec![1, 1, 0]]).unwrap();
        let mut broken = full.clone();
        broken.set(0, 1, 0);
        let geo = AssemblyGeometry::new(Shape::Hexagon, 1.0).unwrap();
        assert!(LatticeMap::new(&full, geo, Rotation::Sextant).is_ok());
        assert!(matches!(
            LatticeMap::new(&broken, geo, Rotation::Sextant),
            Err(GeometryError::NoApplicationNumbering { .. })
        ));
    }
}
