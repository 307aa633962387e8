//! JSON run configuration.
//!
//! A run file names the assembly geometry, the sector layout as text, the
//! assembly types with their fine axial cuts, the coarse axial grid and,
//! optionally, inline material records and a schedule of operations:
//!
//! ```json
//! {
//!   "geometry": { "shape": "square", "pitch": 21.5 },
//!   "rotation": 90,
//!   "grid": "FUEL FUEL\nFUEL REFL",
//!   "types": [
//!     { "name": "FUEL", "cuts": [{ "region": "uo2", "label": "core", "lower": 0.0, "upper": 100.0 }] },
//!     { "name": "REFL", "cuts": [{ "region": "h2o", "label": "", "lower": 0.0, "upper": 100.0 }] }
//!   ],
//!   "zcuts": [0.0, 50.0, 100.0],
//!   "schedule": { "operations": [] }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::axial::AxialCut;
use crate::error::CoreResult;
use crate::geometry::{AssemblyGeometry, Rotation, Shape};
use crate::grid::CoreGrid;
use crate::ir::Schedule;
use crate::material::{InMemoryMaterialLibrary, Material};
use crate::store::{ConfigurationStore, CoreBuilder, RunManifest, DEFAULT_TEMPERATURE};

/// Assembly shape and pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Assembly shape.
    pub shape: Shape,
    /// Assembly pitch, in cm.
    pub pitch: f64,
}

/// One assembly type and its fine axial description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    /// Type name used by the grid.
    pub name: String,
    /// Axial cuts, bottom-up or top-down.
    pub cuts: Vec<AxialCut>,
}

/// Inline material record. Missing reaction arrays default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// Region name.
    pub name: String,
    /// Temperature, in kelvin.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Capture cross section per group.
    pub capture: Vec<f64>,
    /// Fission cross section per group.
    #[serde(default)]
    pub fission: Vec<f64>,
    /// Neutrons per fission per group.
    #[serde(default)]
    pub nu: Vec<f64>,
    /// Fission spectrum.
    #[serde(default)]
    pub chi: Vec<f64>,
    /// Group-to-group scattering matrix.
    #[serde(default)]
    pub scattering: Vec<Vec<f64>>,
}

impl MaterialConfig {
    fn into_material(self) -> CoreResult<Material> {
        let groups = self.capture.len();
        let or_zeros = |v: Vec<f64>| if v.is_empty() { vec![0.0; groups] } else { v };
        let scattering = if self.scattering.is_empty() {
            vec![vec![0.0; groups]; groups]
        } else {
            self.scattering
        };
        Ok(Material::new(
            self.name,
            self.temperature,
            self.capture,
            or_zeros(self.fission),
            or_zeros(self.nu),
            or_zeros(self.chi),
            scattering,
        )?)
    }
}

/// Everything needed to build a store and run one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Assembly geometry.
    pub geometry: GeometryConfig,
    /// Sector symmetry angle in degrees; a full core when absent.
    #[serde(default)]
    pub rotation: Option<Rotation>,
    /// Sector layout, one row per line, tokens are type names or ids.
    pub grid: String,
    /// Grid token for empty positions.
    #[serde(default = "default_void_marker")]
    pub void_marker: String,
    /// Assembly types; grid ids follow this order.
    pub types: Vec<TypeConfig>,
    /// Regions no cut uses, e.g. replacement materials.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Coarse axial boundaries.
    pub zcuts: Vec<f64>,
    /// Mesh elements per coarse bin.
    #[serde(default)]
    pub elements_per_bin: Option<Vec<usize>>,
    /// Material lookup temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Inline material library.
    #[serde(default)]
    pub materials: Vec<MaterialConfig>,
    /// Operations applied after the build.
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

fn default_void_marker() -> String {
    "0".to_string()
}

const fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl CoreConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Parse` for malformed JSON or unknown fields.
    pub fn from_json(text: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the file cannot be read, otherwise see
    /// [`CoreConfig::from_json`].
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = text.len(), "read configuration");
        Self::from_json(&text)
    }

    /// Turns the configuration into a builder and the schedule to run.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryError` for an invalid pitch or an unparsable grid
    /// and a `MaterialError` for an inconsistent material record.
    pub fn into_parts(self) -> CoreResult<(CoreBuilder, Option<Schedule>)> {
        let geometry = AssemblyGeometry::new(self.geometry.shape, self.geometry.pitch)?;
        let mut builder = CoreBuilder::new()
            .geometry(geometry)
            .rotation(self.rotation.unwrap_or(Rotation::Full))
            .zcuts(self.zcuts);
        for t in self.types {
            builder = builder.assembly_type(t.name, t.cuts);
        }
        for region in self.regions {
            builder = builder.region(region);
        }
        let sector = CoreGrid::parse(&self.grid, &builder.type_ids(), &self.void_marker)?;
        builder = builder.sector(sector);
        if let Some(counts) = self.elements_per_bin {
            builder = builder.elements_per_bin(counts);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if !self.materials.is_empty() {
            let mut library = InMemoryMaterialLibrary::new();
            for record in self.materials {
                library.insert(record.into_material()?);
            }
            builder = builder.library(Box::new(library));
        }
        Ok((builder, self.schedule))
    }

    /// Builds the store, runs the schedule and finalizes.
    ///
    /// # Errors
    ///
    /// Returns the first error of building, running or finalizing.
    pub fn run(self) -> CoreResult<(ConfigurationStore, RunManifest)> {
        let (builder, schedule) = self.into_parts()?;
        let mut store = builder.build()?;
        if let Some(schedule) = schedule {
            store.run(&schedule)?;
        }
        let manifest = store.finalize()?;
        info!(run_id = %manifest.run_id, snapshots = manifest.snapshots.len(), "run complete");
        Ok((store, manifest))
    }
}
