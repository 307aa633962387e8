//! Payload validation.
//!
//! Checks everything that can be checked without a core: list lengths,
//! ids, ranges and times. Resolution against the lattice and the
//! registries happens when the operation is applied.

use crate::error::ConfigurationError;
use crate::ir::operations::{
    Operation, PerturbPayload, ReplaceAxialPayload, ReplacePayload, Schedule, TranslatePayload,
};
use crate::time::TimeInstant;

fn validate_non_empty<T>(field: &'static str, values: &[T]) -> Result<(), ConfigurationError> {
    if values.is_empty() {
        return Err(ConfigurationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_ids(field: &'static str, ids: &[u32]) -> Result<(), ConfigurationError> {
    validate_non_empty(field, ids)?;
    if ids.contains(&0) {
        return Err(ConfigurationError::InvalidRequest {
            reason: format!("{field} contains id 0; assembly ids are 1-based"),
        });
    }
    Ok(())
}

fn validate_name(field: &'static str, name: &str) -> Result<(), ConfigurationError> {
    if name.trim().is_empty() {
        return Err(ConfigurationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_parallel(
    which: &[Vec<u32>],
    locations: usize,
    with: usize,
) -> Result<(), ConfigurationError> {
    validate_non_empty("which", which)?;
    if which.len() != locations || which.len() != with {
        return Err(ConfigurationError::LengthMismatch {
            which: which.len(),
            locations,
            with,
        });
    }
    for ids in which {
        validate_ids("which", ids)?;
    }
    Ok(())
}

fn validate_ranges(ranges: &[crate::axial::ZRange]) -> Result<(), ConfigurationError> {
    for r in ranges {
        if !r.lower.is_finite() || !r.upper.is_finite() || r.lower >= r.upper {
            return Err(ConfigurationError::InvalidRequest {
                reason: format!("[{}, {}] is not a valid z-range", r.lower, r.upper),
            });
        }
    }
    Ok(())
}

impl ReplacePayload {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_name("assembly_type", &self.assembly_type)?;
        validate_ids("assemblies", &self.assemblies)?;
        TimeInstant::new(self.at)?;
        Ok(())
    }
}

impl ReplaceAxialPayload {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_parallel(&self.which, self.locations.len(), self.with.len())?;
        validate_ranges(&self.locations)?;
        for name in &self.with {
            validate_name("with", name)?;
        }
        TimeInstant::new(self.at)?;
        Ok(())
    }
}

impl PerturbPayload {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_parallel(&self.which, self.locations.len(), self.perturbations.len())?;
        validate_ranges(&self.locations)?;
        for p in &self.perturbations {
            p.validate().map_err(|e| ConfigurationError::InvalidRequest {
                reason: e.to_string(),
            })?;
        }
        TimeInstant::new(self.at)?;
        Ok(())
    }
}

impl TranslatePayload {
    /// Validates this payload.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_ids("which", &self.which)?;
        if !self.dz.is_finite() {
            return Err(ConfigurationError::InvalidRequest {
                reason: format!("dz must be finite, got {}", self.dz),
            });
        }
        TimeInstant::new(self.at)?;
        Ok(())
    }
}

impl Operation {
    /// Validate the operation payload.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Replace(p) => p.validate(),
            Self::ReplaceAxial(p) => p.validate(),
            Self::Perturb(p) => p.validate(),
            Self::Translate(p) => p.validate(),
        }
    }
}

impl Schedule {
    /// Validates every operation.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version != Self::CURRENT_VERSION {
            return Err(ConfigurationError::InvalidRequest {
                reason: format!(
                    "unsupported schedule version {} (expected {})",
                    self.version,
                    Self::CURRENT_VERSION
                ),
            });
        }
        self.operations.iter().try_for_each(Operation::validate)
    }
}
