//! Computational axial mesh: every coarse bin split into equal elements.

use std::ops::Range;

use serde::Serialize;

use crate::error::GeometryError;

use super::cuts::ZRange;
use super::projection::CoarseGrid;

/// Element nodes of the axial mesh and the coarse bin of each element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxialMesh {
    nodes: Vec<f64>,
    element_bin: Vec<usize>,
    bin_start: Vec<usize>,
}

impl AxialMesh {
    /// Splits the bins of `grid`.
    ///
    /// `elements_per_bin` holds one count per bin, or a single count used
    /// for every bin.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidAxialGrid` for a count list of the
    /// wrong length or a zero count.
    pub fn new(grid: &CoarseGrid, elements_per_bin: &[usize]) -> Result<Self, GeometryError> {
        let counts: Vec<usize> = match elements_per_bin {
            [n] => vec![*n; grid.bins()],
            counts if counts.len() == grid.bins() => counts.to_vec(),
            counts => {
                return Err(GeometryError::InvalidAxialGrid {
                    reason: format!(
                        "{} element counts for {} coarse bins",
                        counts.len(),
                        grid.bins()
                    ),
                })
            }
        };
        if let Some(bin) = counts.iter().position(|&n| n == 0) {
            return Err(GeometryError::InvalidAxialGrid {
                reason: format!("coarse bin {bin} has zero elements"),
            });
        }

        let mut nodes = vec![grid.bottom()];
        let mut element_bin = Vec::new();
        let mut bin_start = Vec::with_capacity(counts.len() + 1);
        for (bin, &n) in counts.iter().enumerate() {
            bin_start.push(element_bin.len());
            let extent = grid.bin(bin);
            let step = extent.length() / n as f64;
            for e in 1..n {
                nodes.push(extent.lower + step * e as f64);
            }
            // Exact coarse boundary, no accumulated rounding.
            nodes.push(extent.upper);
            element_bin.extend(std::iter::repeat(bin).take(n));
        }
        bin_start.push(element_bin.len());

        Ok(Self {
            nodes,
            element_bin,
            bin_start,
        })
    }

    /// Element boundaries, bottom-up.
    #[must_use]
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Element midpoints, bottom-up.
    #[must_use]
    pub fn centers(&self) -> Vec<f64> {
        self.nodes.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Element heights, bottom-up.
    #[must_use]
    pub fn widths(&self) -> Vec<f64> {
        self.nodes.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Number of elements.
    #[must_use]
    pub fn elements(&self) -> usize {
        self.element_bin.len()
    }

    /// Coarse bin of element `e`.
    #[must_use]
    pub fn bin_of(&self, element: usize) -> Option<usize> {
        self.element_bin.get(element).copied()
    }

    /// Extent of element `e`.
    #[must_use]
    pub fn element(&self, element: usize) -> Option<ZRange> {
        (element < self.elements()).then(|| ZRange {
            lower: self.nodes[element],
            upper: self.nodes[element + 1],
        })
    }

    /// Elements of coarse bin `bin`.
    #[must_use]
    pub fn elements_of(&self, bin: usize) -> Range<usize> {
        match (self.bin_start.get(bin), self.bin_start.get(bin + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        }
    }
}
