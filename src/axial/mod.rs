//! Axial stratification of assembly types.
//!
//! Every assembly type owns a fine layering ([`AxialCuts`]). All types share
//! one coarse grid ([`CoarseGrid`]); projecting the fine cuts onto it yields
//! per-bin slots whose weights sum to one ([`AxialProjection`]). The solver
//! mesh ([`AxialMesh`]) further splits each coarse bin into equal elements.

pub mod cuts;
pub mod mesh;
pub mod projection;

pub use cuts::{AxialCut, AxialCuts, ZRange};
pub use mesh::AxialMesh;
pub use projection::{slots, AxialProjection, CoarseGrid, Slot};

/// Relative tolerance for comparing z-coordinates.
pub const Z_TOLERANCE: f64 = 1e-9;

/// Absolute tolerance on slot weight sums.
pub const WEIGHT_TOLERANCE: f64 = 1e-5;

/// True when two z-coordinates coincide within [`Z_TOLERANCE`].
#[must_use]
pub fn same_z(a: f64, b: f64) -> bool {
    (a - b).abs() <= Z_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}
