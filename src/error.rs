//! Error types for coremap.
//!
//! All errors are strongly typed using thiserror and grouped by the stage
//! that detects them: lattice geometry, axial homogenization, configuration
//! mutation and material lookup. Every error is fatal to the run.

use thiserror::Error;

/// Malformed grids, unsupported rotations and inconsistent axial cuts.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum GeometryError {
    #[error("Grid is {rows}x{cols}, expected a square grid")]
    NotSquare {
        rows: usize,
        cols: usize,
    },

    #[error("Grid cell ({row}, {col}) holds negative value {value}")]
    NegativeCell {
        row: usize,
        col: usize,
        value: i64,
    },

    #[error("Unsupported rotation angle {angle} (expected 0, 45, 60, 90 or 180)")]
    UnsupportedRotation {
        angle: u32,
    },

    #[error("Mirrored cells disagree at ({row}, {col}): {value} vs {mirrored}")]
    InconsistentMirror {
        row: usize,
        col: usize,
        value: i64,
        mirrored: i64,
    },

    #[error("Sector cell ({row}, {col}) lies outside the 60 degree wedge")]
    OutsideSector {
        row: usize,
        col: usize,
    },

    #[error("Sector grid has no assemblies")]
    EmptySector,

    #[error("Rows have unequal length: row {row} has {actual} cells, expected {expected}")]
    RaggedRows {
        row: usize,
        actual: usize,
        expected: usize,
    },

    #[error("Unknown grid token '{token}' at row {row}")]
    UnknownToken {
        token: String,
        row: usize,
    },

    #[error("Invalid assembly geometry: {reason}")]
    InvalidGeometry {
        reason: String,
    },

    #[error("Application numbering requires a 60 degree hexagonal core: {reason}")]
    NoApplicationNumbering {
        reason: String,
    },

    #[error("Assembly id {id} is out of range (1..={max})")]
    AssemblyOutOfRange {
        id: u32,
        max: u32,
    },

    #[error("Axial cuts of '{assembly_type}' are not contiguous at index {index}: {upper} != {lower}")]
    NonContiguousCuts {
        assembly_type: String,
        index: usize,
        upper: f64,
        lower: f64,
    },

    #[error("Axial cuts of '{assembly_type}' are not monotonic")]
    NonMonotonicCuts {
        assembly_type: String,
    },

    #[error("Invalid axial grid: {reason}")]
    InvalidAxialGrid {
        reason: String,
    },
}

/// Slot weights of a coarse bin do not add up to one.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum HomogenizationError {
    #[error("Weights of '{assembly_type}' in bin {bin} sum to {sum}, expected 1")]
    WeightSum {
        assembly_type: String,
        bin: usize,
        sum: f64,
    },
}

/// Unresolvable or ambiguous mutation requests.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigurationError {
    #[error("No coarse bin or axial cut of '{assembly_type}' matches z = [{lower}, {upper}]")]
    LocationNotFound {
        assembly_type: String,
        lower: f64,
        upper: f64,
    },

    #[error("Argument lists have inconsistent lengths: which={which}, where={locations}, with={with}")]
    LengthMismatch {
        which: usize,
        locations: usize,
        with: usize,
    },

    #[error("Perturbation target '{region}' in '{assembly_type}' is ambiguous: it appears both standalone and inside a mixture")]
    AmbiguousTarget {
        region: String,
        assembly_type: String,
    },

    #[error("Mixture name '{name}' is already registered with different components or weights")]
    MixtureCollision {
        name: String,
    },

    #[error("Unknown region '{name}'")]
    UnknownRegion {
        name: String,
    },

    #[error("Unknown assembly type '{name}'")]
    UnknownAssemblyType {
        name: String,
    },

    #[error("Unknown assembly type id {id}")]
    UnknownTypeId {
        id: u32,
    },

    #[error("Duplicate name '{name}'")]
    DuplicateName {
        name: String,
    },

    #[error("Invalid name '{name}': only letters, digits, '_' and '.' are allowed")]
    InvalidName {
        name: String,
    },

    #[error("Time {time} is invalid: {reason}")]
    InvalidTime {
        time: f64,
        reason: String,
    },

    #[error("Snapshot at t={time} is sealed by later snapshots")]
    SealedSnapshot {
        time: f64,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Configuration store is finalized")]
    Finalized,

    #[error("Invalid request: {reason}")]
    InvalidRequest {
        reason: String,
    },
}

/// Failures reported by a material library.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum MaterialError {
    #[error("Material '{name}' not found at T={temperature}")]
    NotFound {
        name: String,
        temperature: f64,
    },

    #[error("Materials disagree on energy group count: {expected} vs {actual}")]
    GroupMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Invalid perturbation: {reason}")]
    InvalidPerturbation {
        reason: String,
    },

    #[error("Homogenization of '{name}' got {records} records and {weights} weights")]
    WeightCount {
        name: String,
        records: usize,
        weights: usize,
    },

    #[error("No material library is configured")]
    NoLibrary,

    #[error("Invalid material '{name}': {reason}")]
    InvalidMaterial {
        name: String,
        reason: String,
    },
}

/// Top-level error type for coremap.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed grid, rotation or axial cuts.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Coarse-bin weights do not sum to one.
    #[error("Homogenization error: {0}")]
    Homogenization(#[from] HomogenizationError),

    /// Unresolvable or ambiguous mutation request.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Material library failure.
    #[error("Material error: {0}")]
    Material(#[from] MaterialError),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns true if this is a geometry error.
    #[must_use]
    pub const fn is_geometry(&self) -> bool {
        matches!(self, Self::Geometry(_))
    }

    /// Returns true if this is a homogenization error.
    #[must_use]
    pub const fn is_homogenization(&self) -> bool {
        matches!(self, Self::Homogenization(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is a material error.
    #[must_use]
    pub const fn is_material(&self) -> bool {
        matches!(self, Self::Material(_))
    }

    /// Returns true if this is an I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns true if this is a JSON parse error.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// Result type alias for coremap operations.
pub type CoreResult<T> = Result<T, CoreError>;
