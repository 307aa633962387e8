//! The configuration store.
//!
//! [`ConfigurationStore`] owns everything a run mutates: the time-indexed
//! core layouts, the region and assembly type registries, the fine cuts
//! and coarse projection of every type, and the material cache. It is
//! built once by [`CoreBuilder`], mutated by the operators in
//! `operators.rs`, and sealed by [`ConfigurationStore::finalize`].
//!
//! Lattice ids and centers come from a [`LatticeMap`] built at
//! construction and never change afterwards.

mod builder;
mod manifest;
mod operators;
mod snapshots;

pub use builder::{CoreBuilder, DEFAULT_TEMPERATURE};
pub use manifest::{RunManifest, SnapshotSummary, TypeSummary};
pub use snapshots::Snapshots;

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::axial::{AxialCuts, AxialMesh, AxialProjection, CoarseGrid, Slot};
use crate::error::{ConfigurationError, CoreResult, MaterialError};
use crate::grid::CoreGrid;
use crate::lattice::LatticeMap;
use crate::material::{Material, MaterialLibrary};
use crate::registry::{RegionId, RegionOrigin, RegionRegistry, TypeId, TypeRegistry};
use crate::time::TimeInstant;

/// Mutable state of one core across a run.
pub struct ConfigurationStore {
    lattice: LatticeMap,
    coarse: CoarseGrid,
    mesh: AxialMesh,
    regions: RegionRegistry,
    types: TypeRegistry,
    cuts: HashMap<TypeId, AxialCuts>,
    projections: HashMap<TypeId, AxialProjection>,
    snapshots: Snapshots,
    library: Option<Box<dyn MaterialLibrary>>,
    materials: HashMap<RegionId, Material>,
    temperature: f64,
    schedule_id: Option<Uuid>,
    finalized: bool,
}

impl fmt::Debug for ConfigurationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationStore")
            .field("assemblies", &self.lattice.len())
            .field("types", &self.types.len())
            .field("regions", &self.regions.len())
            .field("snapshots", &self.snapshots.len())
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl ConfigurationStore {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> CoreBuilder {
        CoreBuilder::new()
    }

    /// Assembly positions and numbering.
    #[must_use]
    pub const fn lattice(&self) -> &LatticeMap {
        &self.lattice
    }

    /// Shared coarse axial grid.
    #[must_use]
    pub const fn coarse_grid(&self) -> &CoarseGrid {
        &self.coarse
    }

    /// Computational axial mesh.
    #[must_use]
    pub const fn mesh(&self) -> &AxialMesh {
        &self.mesh
    }

    /// Region registry.
    #[must_use]
    pub const fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    /// Assembly type registry.
    #[must_use]
    pub const fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Time-indexed layouts.
    #[must_use]
    pub const fn snapshots(&self) -> &Snapshots {
        &self.snapshots
    }

    /// Temperature at which user materials are requested.
    #[must_use]
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// True once [`finalize`](Self::finalize) has run.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Layout registered exactly at `t`.
    #[must_use]
    pub fn snapshot(&self, t: f64) -> Option<&CoreGrid> {
        TimeInstant::new(t).ok().and_then(|t| self.snapshots.get(t))
    }

    /// Layout in force at `t`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTime` for negative or non-finite `t`.
    pub fn snapshot_at(&self, t: f64) -> CoreResult<&CoreGrid> {
        Ok(self.snapshots.at(TimeInstant::new(t)?))
    }

    /// Registered snapshot times, ascending.
    #[must_use]
    pub fn times(&self) -> Vec<f64> {
        self.snapshots.times().map(f64::from).collect()
    }

    /// Name of an assembly type.
    #[must_use]
    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.types.name(id)
    }

    /// Id of an assembly type by name.
    #[must_use]
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.types.id(name)
    }

    /// Name of a region.
    #[must_use]
    pub fn region_name(&self, id: RegionId) -> Option<&str> {
        self.regions.name(id)
    }

    /// Id of a region by name.
    #[must_use]
    pub fn region_id(&self, name: &str) -> Option<RegionId> {
        self.regions.id(name)
    }

    /// Fine cuts of an assembly type.
    #[must_use]
    pub fn axial_cuts(&self, id: TypeId) -> Option<&AxialCuts> {
        self.cuts.get(&id)
    }

    /// Coarse projection of an assembly type.
    #[must_use]
    pub fn axial_projection(&self, id: TypeId) -> Option<&AxialProjection> {
        self.projections.get(&id)
    }

    /// [`axial_projection`](Self::axial_projection) by type name.
    #[must_use]
    pub fn axial_projection_named(&self, name: &str) -> Option<&AxialProjection> {
        self.type_id(name).and_then(|id| self.axial_projection(id))
    }

    /// `(x, y)` center of an assembly.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryError` for ids out of range.
    pub fn center_of(&self, library_id: u32) -> CoreResult<(f64, f64)> {
        Ok(self.lattice.center_of(library_id)?)
    }

    /// Library id → application id.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryError` for ids out of range or cores without
    /// application numbering.
    pub fn to_application_id(&self, library_id: u32) -> CoreResult<u32> {
        Ok(self.lattice.to_application(library_id)?)
    }

    /// Application id → library id.
    ///
    /// # Errors
    ///
    /// See [`to_application_id`](Self::to_application_id).
    pub fn to_library_id(&self, application_id: u32) -> CoreResult<u32> {
        Ok(self.lattice.to_library(application_id)?)
    }

    /// Assembly type at a library id at time `t`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid times or ids, or a void position.
    pub fn type_at(&self, library_id: u32, t: f64) -> CoreResult<TypeId> {
        let (row, col) = self.lattice.cell_of(library_id)?;
        let value = self.snapshot_at(t)?.get(row, col);
        TypeId::from_cell(value).ok_or_else(|| {
            ConfigurationError::InvalidRequest {
                reason: format!("assembly {library_id} is void at t={t}"),
            }
            .into()
        })
    }

    /// Material record of a region, fetched or synthesized on first use.
    ///
    /// User regions come from the library; mixtures are blended from their
    /// components; perturbed regions are derived from their base.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::NoLibrary` without a library, or whatever the
    /// library reports.
    pub fn material(&mut self, id: RegionId) -> CoreResult<&Material> {
        if !self.materials.contains_key(&id) {
            let material = self.load_material(id)?;
            self.materials.insert(id, material);
        }
        Ok(&self.materials[&id])
    }

    fn library(&self) -> Result<&dyn MaterialLibrary, MaterialError> {
        self.library.as_deref().ok_or(MaterialError::NoLibrary)
    }

    fn load_material(&mut self, id: RegionId) -> CoreResult<Material> {
        let record = self
            .regions
            .record(id)
            .ok_or_else(|| ConfigurationError::UnknownRegion {
                name: id.to_string(),
            })?
            .clone();
        match record.origin {
            RegionOrigin::Input => Ok(self.library()?.get(&record.name, self.temperature)?),
            RegionOrigin::Mixture { components, .. } => {
                let mut parts = Vec::with_capacity(components.len());
                let mut weights = Vec::with_capacity(components.len());
                for (component, weight) in components {
                    parts.push(self.material(component)?.clone());
                    weights.push(weight);
                }
                Ok(self.library()?.homogenize(&parts, &weights, &record.name)?)
            }
            RegionOrigin::Perturbed {
                base, perturbation, ..
            } => Ok(self.material(base)?.perturbed(&perturbation, &record.name)?),
        }
    }

    /// Resolves fresh mixtures and perturbed regions right away when a
    /// library is present, so bad data fails the operation that made it.
    fn warm_materials(&mut self, ids: &[RegionId]) -> CoreResult<()> {
        if self.library.is_some() {
            for &id in ids {
                self.material(id)?;
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ConfigurationError> {
        if self.finalized {
            return Err(ConfigurationError::Finalized);
        }
        Ok(())
    }

    fn cuts_of(&self, id: TypeId) -> Result<&AxialCuts, ConfigurationError> {
        self.cuts
            .get(&id)
            .ok_or(ConfigurationError::UnknownTypeId { id: id.get() })
    }

    fn projection_of(&self, id: TypeId) -> Result<&AxialProjection, ConfigurationError> {
        self.projections
            .get(&id)
            .ok_or(ConfigurationError::UnknownTypeId { id: id.get() })
    }

    /// Registers cuts and the projection of a freshly registered type.
    fn install_type(&mut self, id: TypeId, cuts: AxialCuts, slots: Vec<Vec<Slot>>) -> CoreResult<()> {
        let name = self
            .types
            .name(id)
            .ok_or(ConfigurationError::UnknownTypeId { id: id.get() })?
            .to_string();
        let (projection, created) = AxialProjection::build(&name, slots, &mut self.regions)?;
        self.cuts.insert(id, cuts);
        self.projections.insert(id, projection);
        self.warm_materials(&created)
    }
}
