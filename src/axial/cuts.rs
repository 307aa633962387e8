//! Fine axial layering of one assembly type.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GeometryError;

use super::same_z;

/// A closed z-interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZRange {
    /// Bottom, in cm.
    pub lower: f64,
    /// Top, in cm.
    pub upper: f64,
}

impl ZRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidAxialGrid` unless both ends are finite
    /// and `lower < upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, GeometryError> {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(GeometryError::InvalidAxialGrid {
                reason: format!("[{lower}, {upper}] is not a valid z-range"),
            });
        }
        Ok(Self { lower, upper })
    }

    /// Height of the range.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.upper - self.lower
    }

    /// Center of the range.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    /// Length of the intersection with `[lower, upper]`.
    #[must_use]
    pub fn overlap(&self, lower: f64, upper: f64) -> f64 {
        (self.upper.min(upper) - self.lower.max(lower)).max(0.0)
    }

    /// True when both ends coincide within tolerance.
    #[must_use]
    pub fn matches(&self, lower: f64, upper: f64) -> bool {
        same_z(self.lower, lower) && same_z(self.upper, upper)
    }
}

/// One axial slice of an assembly: a region over `[lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxialCut {
    /// Region filling the slice.
    pub region: String,
    /// Free-form tag of the slice, e.g. "plenum".
    pub label: String,
    /// Bottom of the cut.
    pub lower: f64,
    /// Top of the cut.
    pub upper: f64,
}

impl AxialCut {
    /// Cut of `region` over `lower..upper`; bounds are checked by [`AxialCuts::new`].
    #[must_use]
    pub fn new(region: impl Into<String>, label: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            region: region.into(),
            label: label.into(),
            lower,
            upper,
        }
    }

    /// Extent of the cut.
    #[must_use]
    pub const fn range(&self) -> ZRange {
        ZRange {
            lower: self.lower,
            upper: self.upper,
        }
    }
}

/// Validated cuts of one assembly type: ascending, gap-free and overlap-free.
///
/// # Examples
///
/// ```
/// use coremap::{AxialCut, AxialCuts};
///
/// // Top-down input is accepted and stored bottom-up.
/// let cuts = AxialCuts::new("A", vec![
///     AxialCut::new("refl", "top", 50.0, 100.0),
///     AxialCut::new("fuel", "core", 0.0, 50.0),
/// ]).unwrap();
/// assert_eq!(cuts.cuts()[0].region, "fuel");
/// assert_eq!(cuts.top(), 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxialCuts {
    cuts: Vec<AxialCut>,
}

impl AxialCuts {
    /// Validates raw cuts.
    ///
    /// Inverted cuts (`lower > upper`) are swapped with a warning. Cuts may
    /// be listed bottom-up or top-down but not mixed.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::NonMonotonicCuts`, `NonContiguousCuts` or
    /// `InvalidAxialGrid`.
    pub fn new(assembly_type: &str, cuts: Vec<AxialCut>) -> Result<Self, GeometryError> {
        if cuts.is_empty() {
            return Err(GeometryError::InvalidAxialGrid {
                reason: format!("'{assembly_type}' has no axial cuts"),
            });
        }

        let mut cuts = cuts;
        for (i, cut) in cuts.iter_mut().enumerate() {
            if !cut.lower.is_finite() || !cut.upper.is_finite() {
                return Err(GeometryError::InvalidAxialGrid {
                    reason: format!("cut {i} of '{assembly_type}' has non-finite bounds"),
                });
            }
            if cut.lower > cut.upper {
                warn!(
                    assembly_type,
                    index = i,
                    lower = cut.lower,
                    upper = cut.upper,
                    "swapping inverted axial cut"
                );
                std::mem::swap(&mut cut.lower, &mut cut.upper);
            }
            if same_z(cut.lower, cut.upper) {
                return Err(GeometryError::InvalidAxialGrid {
                    reason: format!("cut {i} of '{assembly_type}' has zero length"),
                });
            }
        }

        let ascending = cuts.windows(2).all(|w| w[0].upper < w[1].upper && w[0].lower < w[1].lower);
        let descending = cuts.windows(2).all(|w| w[0].upper > w[1].upper && w[0].lower > w[1].lower);
        if !ascending {
            if !descending {
                return Err(GeometryError::NonMonotonicCuts {
                    assembly_type: assembly_type.to_string(),
                });
            }
            cuts.reverse();
        }

        for i in 0..cuts.len() - 1 {
            let (upper, lower) = (cuts[i].upper, cuts[i + 1].lower);
            if !same_z(upper, lower) {
                return Err(GeometryError::NonContiguousCuts {
                    assembly_type: assembly_type.to_string(),
                    index: i,
                    upper,
                    lower,
                });
            }
            cuts[i + 1].lower = upper;
        }

        Ok(Self { cuts })
    }

    /// Cuts, bottom-up.
    #[must_use]
    pub fn cuts(&self) -> &[AxialCut] {
        &self.cuts
    }

    /// Number of cuts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Lowest boundary.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.cuts[0].lower
    }

    /// Highest boundary.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.cuts[self.cuts.len() - 1].upper
    }

    /// All `len() + 1` boundaries, bottom-up.
    #[must_use]
    pub fn boundaries(&self) -> Vec<f64> {
        std::iter::once(self.bottom())
            .chain(self.cuts.iter().map(|c| c.upper))
            .collect()
    }

    /// Index of the cut spanning exactly `range`.
    #[must_use]
    pub fn find(&self, range: ZRange) -> Option<usize> {
        self.cuts.iter().position(|c| range.matches(c.lower, c.upper))
    }

    /// Cut containing `z`.
    #[must_use]
    pub fn cut_at(&self, z: f64) -> Option<&AxialCut> {
        self.cuts.iter().find(|c| c.lower <= z && z <= c.upper)
    }

    fn snap(&self, z: f64) -> f64 {
        self.boundaries()
            .into_iter()
            .find(|&b| same_z(b, z))
            .unwrap_or(z)
    }

    /// Shifts every internal boundary by `dz`; the outer boundaries stay.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidAxialGrid` if the shift collapses or
    /// inverts a cut.
    pub fn shifted(&self, assembly_type: &str, dz: f64) -> Result<Self, GeometryError> {
        let mut bounds = self.boundaries();
        let last = bounds.len() - 1;
        for b in &mut bounds[1..last] {
            *b += dz;
        }
        let mut cuts = self.cuts.clone();
        for (i, cut) in cuts.iter_mut().enumerate() {
            let (lower, upper) = (bounds[i], bounds[i + 1]);
            if upper <= lower || same_z(lower, upper) {
                return Err(GeometryError::InvalidAxialGrid {
                    reason: format!("shifting '{assembly_type}' by {dz} collapses cut {i}"),
                });
            }
            cut.lower = lower;
            cut.upper = upper;
        }
        Ok(Self { cuts })
    }

    /// Replaces whatever fills `range` with `region`.
    ///
    /// Cuts straddling the range ends are split; the painted slice takes
    /// the label of the cut at the range midpoint.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidAxialGrid` if `range` leaves the
    /// assembly.
    pub fn painted(&self, range: ZRange, region: &str) -> Result<Self, GeometryError> {
        let lower = self.snap(range.lower);
        let upper = self.snap(range.upper);
        if lower < self.bottom() || upper > self.top() || lower >= upper {
            return Err(GeometryError::InvalidAxialGrid {
                reason: format!(
                    "[{lower}, {upper}] is outside the assembly [{}, {}]",
                    self.bottom(),
                    self.top()
                ),
            });
        }
        let label = self
            .cut_at(0.5 * (lower + upper))
            .map(|c| c.label.clone())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(self.cuts.len() + 2);
        for cut in &self.cuts {
            if cut.upper <= lower {
                out.push(cut.clone());
            } else if cut.lower < lower {
                out.push(AxialCut::new(&cut.region, &cut.label, cut.lower, lower));
            }
        }
        out.push(AxialCut::new(region, label, lower, upper));
        for cut in &self.cuts {
            if cut.lower >= upper {
                out.push(cut.clone());
            } else if cut.upper > upper {
                out.push(AxialCut::new(&cut.region, &cut.label, upper, cut.upper));
            }
        }
        Ok(Self { cuts: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_layers() -> AxialCuts {
        AxialCuts::new(
            "A",
            vec![
                AxialCut::new("refl", "bottom", 0.0, 10.0),
                AxialCut::new("fuel", "core", 10.0, 90.0),
                AxialCut::new("plenum", "top", 90.0, 100.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn inverted_cut_is_swapped() {
        let cuts = AxialCuts::new("A", vec![AxialCut::new("fuel", "", 10.0, 0.0)]).unwrap();
        assert_eq!(cuts.bottom(), 0.0);
        assert_eq!(cuts.top(), 10.0);
    }

    #[test]
    fn gap_is_rejected() {
        let err = AxialCuts::new(
            "A",
            vec![AxialCut::new("a", "", 0.0, 10.0), AxialCut::new("b", "", 11.0, 20.0)],
        );
        assert!(matches!(
            err,
            Err(GeometryError::NonContiguousCuts { index: 0, .. })
        ));
    }

    #[test]
    fn mixed_order_is_rejected() {
        let err = AxialCuts::new(
            "A",
            vec![
                AxialCut::new("a", "", 10.0, 20.0),
                AxialCut::new("b", "", 0.0, 10.0),
                AxialCut::new("c", "", 20.0, 30.0),
            ],
        );
        assert!(matches!(err, Err(GeometryError::NonMonotonicCuts { .. })));
    }

    #[test]
    fn tiny_mismatch_is_snapped() {
        let cuts = AxialCuts::new(
            "A",
            vec![AxialCut::new("a", "", 0.0, 10.0), AxialCut::new("b", "", 10.0 + 1e-12, 20.0)],
        )
        .unwrap();
        assert_eq!(cuts.cuts()[1].lower, cuts.cuts()[0].upper);
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(AxialCuts::new("A", vec![AxialCut::new("a", "", 5.0, 5.0)]).is_err());
        assert!(AxialCuts::new("A", vec![]).is_err());
    }

    #[test]
    fn shift_moves_internal_boundaries_only() {
        let shifted = three_layers().shifted("A", 5.0).unwrap();
        assert_eq!(shifted.boundaries(), vec![0.0, 15.0, 95.0, 100.0]);
        assert!(three_layers().shifted("A", 10.0).is_err());
    }

    #[test]
    fn paint_splits_straddling_cut() {
        let painted = three_layers()
            .painted(ZRange::new(40.0, 60.0).unwrap(), "absorber")
            .unwrap();
        let regions: Vec<&str> = painted.cuts().iter().map(|c| c.region.as_str()).collect();
        assert_eq!(regions, vec!["refl", "fuel", "absorber", "fuel", "plenum"]);
        assert_eq!(painted.boundaries(), vec![0.0, 10.0, 40.0, 60.0, 90.0, 100.0]);
        assert_eq!(painted.cuts()[2].label, "core");
    }

    #[test]
    fn paint_over_whole_cut_keeps_boundaries() {
        let painted = three_layers()
            .painted(ZRange::new(90.0, 100.0).unwrap(), "refl")
            .unwrap();
        assert_eq!(painted.len(), 3);
        assert_eq!(painted.cuts()[2].region, "refl");
        assert_eq!(painted.cuts()[2].label, "top");
    }

    #[test]
    fn paint_outside_is_rejected() {
        assert!(three_layers()
            .painted(ZRange::new(90.0, 120.0).unwrap(), "refl")
            .is_err());
    }

    #[test]
    fn find_and_cut_at() {
        let cuts = three_layers();
        assert_eq!(cuts.find(ZRange::new(10.0, 90.0).unwrap()), Some(1));
        assert_eq!(cuts.find(ZRange::new(10.0, 80.0).unwrap()), None);
        assert_eq!(cuts.cut_at(95.0).unwrap().region, "plenum");
    }
}
