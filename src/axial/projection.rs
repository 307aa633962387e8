//! Projection of fine axial cuts onto the shared coarse grid.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, GeometryError, HomogenizationError};
use crate::registry::{RegionId, RegionRegistry};

use super::cuts::{AxialCuts, ZRange};
use super::{same_z, WEIGHT_TOLERANCE};

/// Coarse axial boundaries shared by every assembly type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseGrid {
    zcuts: Vec<f64>,
}

impl CoarseGrid {
    /// Validates the boundaries.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidAxialGrid` unless there are at least
    /// two finite, strictly increasing boundaries.
    pub fn new(zcuts: Vec<f64>) -> Result<Self, GeometryError> {
        if zcuts.len() < 2 {
            return Err(GeometryError::InvalidAxialGrid {
                reason: format!("need at least two z-boundaries, got {}", zcuts.len()),
            });
        }
        if zcuts.iter().any(|z| !z.is_finite()) {
            return Err(GeometryError::InvalidAxialGrid {
                reason: "z-boundaries must be finite".to_string(),
            });
        }
        if let Some(i) = zcuts.windows(2).position(|w| w[1] <= w[0]) {
            return Err(GeometryError::InvalidAxialGrid {
                reason: format!("z-boundaries decrease at index {}", i + 1),
            });
        }
        Ok(Self { zcuts })
    }

    /// Boundaries, bottom-up.
    #[must_use]
    pub fn zcuts(&self) -> &[f64] {
        &self.zcuts
    }

    /// Number of bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.zcuts.len() - 1
    }

    /// Extent of bin `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= bins()`.
    #[must_use]
    pub fn bin(&self, i: usize) -> ZRange {
        ZRange {
            lower: self.zcuts[i],
            upper: self.zcuts[i + 1],
        }
    }

    /// Lowest boundary.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.zcuts[0]
    }

    /// Highest boundary.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.zcuts[self.zcuts.len() - 1]
    }

    /// Run of whole bins spanning exactly `range`.
    #[must_use]
    pub fn bins_matching(&self, range: ZRange) -> Option<Range<usize>> {
        let start = self.zcuts.iter().position(|&z| same_z(z, range.lower))?;
        let end = self.zcuts.iter().position(|&z| same_z(z, range.upper))?;
        (start < end).then_some(start..end)
    }
}

/// One fine region inside a coarse bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Fine region name.
    pub region: String,
    /// Label of the first cut contributing the region.
    pub label: String,
    /// Fraction of the bin height.
    pub weight: f64,
}

/// Splits every coarse bin into weighted slots of the fine regions it
/// overlaps. Repeated regions within a bin share one slot.
///
/// # Errors
///
/// Returns `HomogenizationError::WeightSum` if the cuts do not cover a bin.
pub fn slots(
    assembly_type: &str,
    cuts: &AxialCuts,
    grid: &CoarseGrid,
) -> Result<Vec<Vec<Slot>>, HomogenizationError> {
    let mut out = Vec::with_capacity(grid.bins());
    for bin in 0..grid.bins() {
        let extent = grid.bin(bin);
        let width = extent.length();
        let mut bin_slots: Vec<Slot> = Vec::new();
        for cut in cuts.cuts() {
            let overlap = extent.overlap(cut.lower, cut.upper);
            if overlap <= WEIGHT_TOLERANCE * width {
                continue;
            }
            let weight = overlap / width;
            match bin_slots.iter_mut().find(|s| s.region == cut.region) {
                Some(slot) => slot.weight += weight,
                None => bin_slots.push(Slot {
                    region: cut.region.clone(),
                    label: cut.label.clone(),
                    weight,
                }),
            }
        }
        let sum: f64 = bin_slots.iter().map(|s| s.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(HomogenizationError::WeightSum {
                assembly_type: assembly_type.to_string(),
                bin,
                sum,
            });
        }
        out.push(bin_slots);
    }
    Ok(out)
}

/// Coarse-bin view of one assembly type.
///
/// `config[i]` is the region filling bin `i`: the fine region itself when
/// one region covers the bin, otherwise a mixture region registered as
/// `<type><mix-index>_<r1>+<r2>+...`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxialProjection {
    assembly_type: String,
    slots: Vec<Vec<Slot>>,
    config: Vec<RegionId>,
    config_str: Vec<String>,
}

impl AxialProjection {
    /// Resolves slots to regions, registering mixtures as needed.
    ///
    /// Returns the projection and the mixtures this call created.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownRegion` for an unregistered fine
    /// region.
    pub fn build(
        assembly_type: &str,
        slots: Vec<Vec<Slot>>,
        regions: &mut RegionRegistry,
    ) -> Result<(Self, Vec<RegionId>), ConfigurationError> {
        let lookup = |regions: &RegionRegistry, name: &str| {
            regions.id(name).ok_or_else(|| ConfigurationError::UnknownRegion {
                name: name.to_string(),
            })
        };

        let mut config = Vec::with_capacity(slots.len());
        let mut created = Vec::new();
        let mut mix_index = 0;
        for bin_slots in &slots {
            let id = if let [single] = bin_slots.as_slice() {
                lookup(regions, &single.region)?
            } else {
                mix_index += 1;
                let components = bin_slots
                    .iter()
                    .map(|s| Ok((lookup(regions, &s.region)?, s.weight)))
                    .collect::<Result<Vec<_>, ConfigurationError>>()?;
                let (id, new) = regions.register_mixture(assembly_type, mix_index, components)?;
                if new {
                    created.push(id);
                }
                id
            };
            config.push(id);
        }

        let config_str = config
            .iter()
            .map(|&id| regions.name(id).unwrap_or_default().to_string())
            .collect();
        debug!(
            assembly_type,
            bins = config.len(),
            mixtures = mix_index,
            created = created.len(),
            "projected axial cuts"
        );
        Ok((
            Self {
                assembly_type: assembly_type.to_string(),
                slots,
                config,
                config_str,
            },
            created,
        ))
    }

    /// Type this projection belongs to.
    #[must_use]
    pub fn assembly_type(&self) -> &str {
        &self.assembly_type
    }

    /// Per-bin slots.
    #[must_use]
    pub fn slots(&self) -> &[Vec<Slot>] {
        &self.slots
    }

    /// Region id per bin.
    #[must_use]
    pub fn config(&self) -> &[RegionId] {
        &self.config
    }

    /// Region name per bin.
    #[must_use]
    pub fn config_str(&self) -> &[String] {
        &self.config_str
    }

    /// True when bin `i` holds a mixture.
    #[must_use]
    pub fn is_mixture(&self, bin: usize) -> bool {
        self.slots.get(bin).is_some_and(|s| s.len() > 1)
    }
}
