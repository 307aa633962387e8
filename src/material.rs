//! Multigroup material records and the library seam.
//!
//! The store never computes cross sections itself. It asks a
//! [`MaterialLibrary`] for the record of each user region, asks it to blend
//! records for mixture regions, and applies perturbations to cloned records.
//! Records are fetched lazily and cached by the store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MaterialError;

/// Reaction channel targeted by a group-wise perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    /// Radiative capture.
    Capture,
    /// Fission; nu-fission follows.
    Fission,
    /// Within-group scattering.
    Scattering,
}

/// Change applied to a cloned material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perturbation {
    /// Uniform density scaling of every reaction rate.
    Density {
        /// Multiplier, strictly positive.
        factor: f64,
    },
    /// Per-group additive change of one reaction.
    GroupDelta {
        /// Channel that changes.
        reaction: Reaction,
        /// One entry per energy group.
        delta: Vec<f64>,
    },
}

impl Perturbation {
    /// Checks the perturbation parameters on their own.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::InvalidPerturbation` for non-finite values, a
    /// non-positive density factor or an empty delta.
    pub fn validate(&self) -> Result<(), MaterialError> {
        match self {
            Self::Density { factor } if !factor.is_finite() || *factor <= 0.0 => {
                Err(MaterialError::InvalidPerturbation {
                    reason: format!("density factor must be positive, got {factor}"),
                })
            }
            Self::GroupDelta { delta, .. } if delta.is_empty() => Err(MaterialError::InvalidPerturbation {
                reason: "group delta is empty".to_string(),
            }),
            Self::GroupDelta { delta, .. } if delta.iter().any(|d| !d.is_finite()) => {
                Err(MaterialError::InvalidPerturbation {
                    reason: "group delta has non-finite entries".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Macroscopic multigroup cross sections of one region.
///
/// `absorption`, `total` and `nu_fission` are derived and kept consistent
/// with the primary data by every constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Display name.
    pub name: String,
    /// Kelvin.
    pub temperature: f64,
    /// Capture per group.
    pub capture: Vec<f64>,
    /// Fission per group.
    pub fission: Vec<f64>,
    /// Neutrons per fission.
    pub nu: Vec<f64>,
    /// Fission spectrum.
    pub chi: Vec<f64>,
    /// `scattering[from][to]`.
    pub scattering: Vec<Vec<f64>>,
    /// Capture plus fission.
    pub absorption: Vec<f64>,
    /// Absorption plus all scattering out of the group.
    pub total: Vec<f64>,
    /// `nu * fission` per group.
    pub nu_fission: Vec<f64>,
}

impl Material {
    /// Builds a record and computes the derived reactions.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::InvalidMaterial` if the arrays disagree on the
    /// group count or hold negative or non-finite values.
    pub fn new(
        name: impl Into<String>,
        temperature: f64,
        capture: Vec<f64>,
        fission: Vec<f64>,
        nu: Vec<f64>,
        chi: Vec<f64>,
        scattering: Vec<Vec<f64>>,
    ) -> Result<Self, MaterialError> {
        let mut material = Self {
            name: name.into(),
            temperature,
            capture,
            fission,
            nu,
            chi,
            scattering,
            absorption: Vec::new(),
            total: Vec::new(),
            nu_fission: Vec::new(),
        };
        material.check()?;
        material.renormalize();
        Ok(material)
    }

    /// Non-fissile, non-scattering absorber. Handy for tests and fillers.
    ///
    /// # Errors
    ///
    /// See [`Material::new`].
    pub fn absorber(name: impl Into<String>, temperature: f64, capture: Vec<f64>) -> Result<Self, MaterialError> {
        let g = capture.len();
        Self::new(
            name,
            temperature,
            capture,
            vec![0.0; g],
            vec![0.0; g],
            vec![0.0; g],
            vec![vec![0.0; g]; g],
        )
    }

    /// Number of energy groups.
    #[must_use]
    pub fn groups(&self) -> usize {
        self.capture.len()
    }

    fn invalid(&self, reason: impl Into<String>) -> MaterialError {
        MaterialError::InvalidMaterial {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn check(&self) -> Result<(), MaterialError> {
        let g = self.groups();
        if g == 0 {
            return Err(self.invalid("no energy groups"));
        }
        for (label, v) in [("fission", &self.fission), ("nu", &self.nu), ("chi", &self.chi)] {
            if v.len() != g {
                return Err(self.invalid(format!("{label} has {} groups, expected {g}", v.len())));
            }
        }
        if self.scattering.len() != g || self.scattering.iter().any(|row| row.len() != g) {
            return Err(self.invalid(format!("scattering matrix must be {g}x{g}")));
        }
        let all = self
            .capture
            .iter()
            .chain(&self.fission)
            .chain(&self.nu)
            .chain(&self.chi)
            .chain(self.scattering.iter().flatten());
        for v in all {
            if !v.is_finite() || *v < 0.0 {
                return Err(self.invalid(format!("value {v} is negative or not finite")));
            }
        }
        Ok(())
    }

    /// Recomputes absorption, total and nu-fission.
    pub fn renormalize(&mut self) {
        let g = self.groups();
        self.absorption = (0..g).map(|i| self.capture[i] + self.fission[i]).collect();
        self.total = (0..g)
            .map(|i| self.absorption[i] + self.scattering[i].iter().sum::<f64>())
            .collect();
        self.nu_fission = (0..g).map(|i| self.nu[i] * self.fission[i]).collect();
    }

    /// Clone with `perturbation` applied, renamed to `name`.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::InvalidPerturbation` for invalid parameters,
    /// a delta of the wrong length, or a result with negative rates.
    pub fn perturbed(&self, perturbation: &Perturbation, name: &str) -> Result<Self, MaterialError> {
        perturbation.validate()?;
        let mut out = self.clone();
        out.name = name.to_string();
        match perturbation {
            Perturbation::Density { factor } => {
                for v in out.capture.iter_mut().chain(out.fission.iter_mut()) {
                    *v *= factor;
                }
                for v in out.scattering.iter_mut().flatten() {
                    *v *= factor;
                }
            }
            Perturbation::GroupDelta { reaction, delta } => {
                if delta.len() != out.groups() {
                    return Err(MaterialError::GroupMismatch {
                        expected: out.groups(),
                        actual: delta.len(),
                    });
                }
                for (g, d) in delta.iter().enumerate() {
                    let slot = match reaction {
                        Reaction::Capture => &mut out.capture[g],
                        Reaction::Fission => &mut out.fission[g],
                        Reaction::Scattering => &mut out.scattering[g][g],
                    };
                    *slot += d;
                    if *slot < 0.0 {
                        return Err(MaterialError::InvalidPerturbation {
                            reason: format!("{reaction:?} of group {g} becomes negative ({slot})"),
                        });
                    }
                }
            }
        }
        out.renormalize();
        Ok(out)
    }

    /// Volume-weighted blend of `records`.
    ///
    /// Rates are averaged with `weights`; `nu` is recovered from the blended
    /// nu-fission and `chi` is weighted by each record's fission production.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::WeightCount` or `GroupMismatch`.
    pub fn blend(records: &[Self], weights: &[f64], name: &str) -> Result<Self, MaterialError> {
        if records.is_empty() || records.len() != weights.len() {
            return Err(MaterialError::WeightCount {
                name: name.to_string(),
                records: records.len(),
                weights: weights.len(),
            });
        }
        let g = records[0].groups();
        if let Some(bad) = records.iter().find(|m| m.groups() != g) {
            return Err(MaterialError::GroupMismatch {
                expected: g,
                actual: bad.groups(),
            });
        }

        let mut capture = vec![0.0; g];
        let mut fission = vec![0.0; g];
        let mut nu_fission = vec![0.0; g];
        let mut chi = vec![0.0; g];
        let mut scattering = vec![vec![0.0; g]; g];
        let mut temperature = 0.0;
        let mut production = 0.0;
        for (m, &w) in records.iter().zip(weights) {
            temperature += w * m.temperature;
            let produced: f64 = w * m.nu_fission.iter().sum::<f64>();
            production += produced;
            for i in 0..g {
                capture[i] += w * m.capture[i];
                fission[i] += w * m.fission[i];
                nu_fission[i] += w * m.nu_fission[i];
                chi[i] += produced * m.chi[i];
                for j in 0..g {
                    scattering[i][j] += w * m.scattering[i][j];
                }
            }
        }
        if production > 0.0 {
            for c in &mut chi {
                *c /= production;
            }
        }
        let nu = (0..g)
            .map(|i| if fission[i] > 0.0 { nu_fission[i] / fission[i] } else { 0.0 })
            .collect();

        Self::new(name, temperature, capture, fission, nu, chi, scattering)
    }
}

/// Source of cross sections for user regions.
pub trait MaterialLibrary: Send + Sync {
    /// Record of a user region at `temperature`.
    fn get(&self, name: &str, temperature: f64) -> Result<Material, MaterialError>;

    /// Blends `records` into a new record called `name`.
    fn homogenize(&self, records: &[Material], weights: &[f64], name: &str) -> Result<Material, MaterialError> {
        Material::blend(records, weights, name)
    }
}

/// Single-temperature library backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMaterialLibrary {
    materials: HashMap<String, Material>,
}

impl InMemoryMaterialLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record.
    pub fn insert(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, material: Material) -> Self {
        self.insert(material);
        self
    }

    /// Number of materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl MaterialLibrary for InMemoryMaterialLibrary {
    fn get(&self, name: &str, temperature: f64) -> Result<Material, MaterialError> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| MaterialError::NotFound {
                name: name.to_string(),
                temperature,
            })
    }
}
