//! Construction of a [`ConfigurationStore`].

use std::collections::HashMap;
use std::fmt;

use tracing::info;

use crate::axial::{self, AxialCut, AxialCuts, AxialMesh, CoarseGrid};
use crate::error::{ConfigurationError, CoreResult, GeometryError};
use crate::geometry::{AssemblyGeometry, Rotation, Shape};
use crate::grid::{CoreGrid, VOID};
use crate::lattice::LatticeMap;
use crate::material::MaterialLibrary;
use crate::registry::{RegionRegistry, TypeId, TypeRegistry};
use crate::symmetry;

use super::{ConfigurationStore, Snapshots};

/// Default temperature of material lookups, in kelvin.
pub const DEFAULT_TEMPERATURE: f64 = 300.0;

/// Builder for [`ConfigurationStore`].
///
/// Assembly types get ids 1, 2, ... in the order they are added; the sector
/// grid refers to them by these ids.
///
/// # Example
/// ```
/// use coremap::{AssemblyGeometry, AxialCut, CoreBuilder, CoreGrid, Rotation, Shape};
///
/// let store = CoreBuilder::new()
///     .geometry(AssemblyGeometry::new(Shape::Square, 21.5).unwrap())
///     .rotation(Rotation::Quadrant)
///     .sector(CoreGrid::from_rows(vec![vec![1, 1], vec![1, 1]]).unwrap())
///     .assembly_type("FUEL", vec![AxialCut::new("uo2", "core", 0.0, 100.0)])
///     .zcuts(vec![0.0, 50.0, 100.0])
///     .build()
///     .unwrap();
/// assert_eq!(store.lattice().len(), 4);
/// ```
#[derive(Default)]
pub struct CoreBuilder {
    geometry: Option<AssemblyGeometry>,
    rotation: Option<Rotation>,
    sector: Option<CoreGrid>,
    types: Vec<(String, Vec<AxialCut>)>,
    regions: Vec<String>,
    zcuts: Option<Vec<f64>>,
    elements_per_bin: Option<Vec<usize>>,
    temperature: Option<f64>,
    library: Option<Box<dyn MaterialLibrary>>,
}

impl fmt::Debug for CoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreBuilder")
            .field("geometry", &self.geometry)
            .field("rotation", &self.rotation)
            .field("sector", &self.sector)
            .field("types", &self.types)
            .field("regions", &self.regions)
            .field("zcuts", &self.zcuts)
            .field("elements_per_bin", &self.elements_per_bin)
            .field("temperature", &self.temperature)
            .field("library", &self.library.is_some())
            .finish()
    }
}

impl CoreBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembly shape and pitch (required).
    #[must_use]
    pub fn geometry(mut self, geometry: AssemblyGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Symmetry of the sector (defaults to a full core).
    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Sector grid of type ids (required).
    #[must_use]
    pub fn sector(mut self, sector: CoreGrid) -> Self {
        self.sector = Some(sector);
        self
    }

    /// Adds an assembly type (at least one required).
    #[must_use]
    pub fn assembly_type(mut self, name: impl Into<String>, cuts: Vec<AxialCut>) -> Self {
        self.types.push((name.into(), cuts));
        self
    }

    /// Registers a region that no cut uses yet, e.g. a replacement material.
    #[must_use]
    pub fn region(mut self, name: impl Into<String>) -> Self {
        self.regions.push(name.into());
        self
    }

    /// Coarse axial boundaries (required).
    #[must_use]
    pub fn zcuts(mut self, zcuts: Vec<f64>) -> Self {
        self.zcuts = Some(zcuts);
        self
    }

    /// Mesh elements per coarse bin, or one count for all bins
    /// (defaults to 1).
    #[must_use]
    pub fn elements_per_bin(mut self, counts: Vec<usize>) -> Self {
        self.elements_per_bin = Some(counts);
        self
    }

    /// Temperature of material lookups (defaults to 300 K).
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Material library; without one, material lookups fail.
    #[must_use]
    pub fn library(mut self, library: Box<dyn MaterialLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Name → id map for parsing text grids, in the id order `build` uses.
    #[must_use]
    pub fn type_ids(&self) -> HashMap<String, i64> {
        self.types
            .iter()
            .zip(1..)
            .map(|((name, _), id)| (name.clone(), id))
            .collect()
    }

    /// Validates the inputs and builds the store with the unfolded core as
    /// the snapshot at t = 0.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingField` for missing inputs, a
    /// `GeometryError` for malformed grids or cuts and a
    /// `HomogenizationError` for cuts that do not cover the coarse grid.
    pub fn build(self) -> CoreResult<ConfigurationStore> {
        let missing = |field: &str| ConfigurationError::MissingField {
            field: field.to_string(),
        };
        let geometry = self.geometry.ok_or_else(|| missing("geometry"))?;
        let sector = self.sector.ok_or_else(|| missing("sector"))?;
        let zcuts = self.zcuts.ok_or_else(|| missing("zcuts"))?;
        if self.types.is_empty() {
            return Err(missing("types").into());
        }
        let rotation = self.rotation.unwrap_or(Rotation::Full);
        check_rotation(geometry.shape(), rotation)?;
        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(ConfigurationError::InvalidRequest {
                reason: format!("temperature must be positive, got {temperature}"),
            }
            .into());
        }

        let mut types = TypeRegistry::new();
        let mut regions = RegionRegistry::new();
        let mut validated = Vec::with_capacity(self.types.len());
        for (name, raw) in self.types {
            let id = types.register_input(&name)?;
            let cuts = AxialCuts::new(&name, raw)?;
            for cut in cuts.cuts() {
                regions.register_input(&cut.region)?;
            }
            validated.push((id, cuts));
        }
        for name in &self.regions {
            regions.register_input(name)?;
        }

        let full = symmetry::unfold(&sector, rotation)?;
        for (_, _, v) in full.iter() {
            if v != VOID && !TypeId::from_cell(v).is_some_and(|id| types.contains(id)) {
                return Err(ConfigurationError::UnknownTypeId {
                    id: u32::try_from(v).unwrap_or(u32::MAX),
                }
                .into());
            }
        }
        let lattice = LatticeMap::new(&full, geometry, rotation)?;
        let coarse = CoarseGrid::new(zcuts)?;
        let mesh = AxialMesh::new(&coarse, self.elements_per_bin.as_deref().unwrap_or(&[1]))?;

        let mut store = ConfigurationStore {
            lattice,
            coarse,
            mesh,
            regions,
            types,
            cuts: HashMap::new(),
            projections: HashMap::new(),
            snapshots: Snapshots::new(full),
            library: self.library,
            materials: HashMap::new(),
            temperature,
            schedule_id: None,
            finalized: false,
        };
        for (id, cuts) in validated {
            let name = store.types.name(id).unwrap_or_default().to_string();
            let slots = axial::slots(&name, &cuts, &store.coarse)?;
            store.install_type(id, cuts, slots)?;
        }

        info!(
            assemblies = store.lattice.len(),
            shape = %geometry.shape(),
            %rotation,
            types = store.types.len(),
            regions = store.regions.len(),
            bins = store.coarse.bins(),
            "built configuration store"
        );
        Ok(store)
    }
}

fn check_rotation(shape: Shape, rotation: Rotation) -> Result<(), GeometryError> {
    let ok = match rotation {
        Rotation::Full => true,
        Rotation::Sextant => shape.is_hexagonal(),
        Rotation::Octant | Rotation::Quadrant | Rotation::Half => shape == Shape::Square,
    };
    if ok {
        Ok(())
    } else {
        Err(GeometryError::InvalidGeometry {
            reason: format!("{rotation} symmetry does not apply to {shape} assemblies"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CoreBuilder {
        CoreBuilder::new()
            .geometry(AssemblyGeometry::new(Shape::Square, 1.0).unwrap())
            .sector(CoreGrid::from_rows(vec![vec![1, 2]]).unwrap())
            .assembly_type("A", vec![AxialCut::new("fuel", "", 0.0, 10.0)])
            .assembly_type("B", vec![AxialCut::new("refl", "", 0.0, 10.0)])
            .zcuts(vec![0.0, 10.0])
    }

    #[test]
    fn builds_with_defaults() {
        let store = base().build().unwrap();
        assert_eq!(store.lattice().len(), 2);
        assert_eq!(store.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(store.mesh().elements(), 1);
        assert_eq!(store.type_id("B").unwrap().get(), 2);
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = CoreBuilder::new().build().unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::MissingField { ref field }) if field == "geometry"
        ));
    }

    #[test]
    fn unknown_type_in_grid_fails() {
        let err = base()
            .sector(CoreGrid::from_rows(vec![vec![1, 3]]).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::UnknownTypeId { id: 3 })
        ));
    }

    #[test]
    fn invalid_names_fail() {
        let err = base()
            .assembly_type("bad-name", vec![AxialCut::new("fuel", "", 0.0, 10.0)])
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(base().region("a+b").build().is_err());
    }

    #[test]
    fn uncovered_coarse_grid_fails() {
        let err = base().zcuts(vec![0.0, 10.0, 20.0]).build().unwrap_err();
        assert!(err.is_homogenization());
    }

    #[test]
    fn rotation_must_match_shape() {
        assert!(base().rotation(Rotation::Sextant).build().unwrap_err().is_geometry());
        assert!(check_rotation(Shape::Hexagon, Rotation::Quadrant).is_err());
        assert!(check_rotation(Shape::Square, Rotation::Half).is_ok());
        assert!(check_rotation(Shape::Slab, Rotation::Full).is_ok());
    }

    #[test]
    fn slab_rows_cannot_be_mirrored() {
        let err = base()
            .geometry(AssemblyGeometry::new(Shape::Slab, 1.0).unwrap())
            .rotation(Rotation::Half)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Geometry(GeometryError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn type_ids_follow_insertion_order() {
        let ids = base().type_ids();
        assert_eq!(ids["A"], 1);
        assert_eq!(ids["B"], 2);
    }
}
