//! # coremap - Reactor core geometry and loading-pattern preprocessor
//!
//! coremap turns a compact description of a reactor core into the data a
//! diffusion or transport solver consumes, and keeps that description
//! consistent while a fuel-management schedule edits it.
//!
//! ## Core Concepts
//!
//! - **Sector**: one symmetric part of the core lattice, unfolded into the
//!   full core by [`symmetry::unfold`]
//! - **LatticeMap**: stable library ids, application ids and assembly centers
//! - **AxialCuts**: the fine axial layering of an assembly type, projected onto
//!   a shared [`CoarseGrid`]
//! - **ConfigurationStore**: time-indexed core layouts plus the region and
//!   assembly type registries that operations grow
//!
//! ## Usage
//!
//! ```
//! use coremap::{
//!     AssemblyGeometry, AxialCut, CoreBuilder, CoreGrid, Numbering, ReplaceAxialPayload, Rotation,
//!     Shape, ZRange,
//! };
//!
//! let mut store = CoreBuilder::new()
//!     .geometry(AssemblyGeometry::new(Shape::Square, 21.5)?)
//!     .rotation(Rotation::Half)
//!     .sector(CoreGrid::from_rows(vec![vec![1, 2], vec![0, 0]])?)
//!     .assembly_type("FUEL", vec![AxialCut::new("uo2", "core", 0.0, 100.0)])
//!     .assembly_type("REFL", vec![AxialCut::new("h2o", "", 0.0, 100.0)])
//!     .region("b4c")
//!     .zcuts(vec![0.0, 50.0, 100.0])
//!     .build()?;
//!
//! // Insert an absorber in the lower half of assembly 1 at t = 1.
//! store.replace_axial(&ReplaceAxialPayload {
//!     which: vec![vec![1]],
//!     locations: vec![ZRange::new(0.0, 50.0)?],
//!     with: vec!["b4c".to_string()],
//!     numbering: Numbering::Library,
//!     at: 1.0,
//! })?;
//! assert_eq!(store.type_name(store.type_at(1, 1.0)?), Some("FUEL-1repl"));
//! # Ok::<(), coremap::CoreError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Geometry and lattice
pub mod error;
pub mod geometry;
pub mod grid;
pub mod lattice;
pub mod symmetry;

// Axial description and materials
pub mod axial;
pub mod material;
pub mod registry;

// Configuration over time
pub mod config;
pub mod ir;
pub mod store;
pub mod time;

// Re-export primary types at crate root for convenience
pub use axial::{AxialCut, AxialCuts, AxialMesh, AxialProjection, CoarseGrid, Slot, ZRange};
pub use config::CoreConfig;
pub use error::{
    ConfigurationError, CoreError, CoreResult, GeometryError, HomogenizationError, MaterialError,
};
pub use geometry::{AssemblyGeometry, Rotation, Shape};
pub use grid::{CoreGrid, VOID};
pub use lattice::{LatticeMap, Numbering};
pub use material::{InMemoryMaterialLibrary, Material, MaterialLibrary, Perturbation, Reaction};
pub use registry::{
    Derivation, RegionId, RegionOrigin, RegionRecord, RegionRegistry, TypeId, TypeOrigin,
    TypeRecord, TypeRegistry,
};
pub use time::TimeInstant;

pub use ir::{
    Operation, PerturbPayload, ReplaceAxialPayload, ReplacePayload, Schedule, TranslatePayload,
};
pub use store::{ConfigurationStore, CoreBuilder, RunManifest, Snapshots};
