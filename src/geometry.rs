//! Assembly cross-section geometry and lattice symmetry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Cross-section shape of an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Hexagonal assembly on a hexagonal lattice.
    Hexagon,
    /// Square assembly on a Cartesian lattice.
    Square,
    /// One-dimensional slab.
    Slab,
}

impl Shape {
    /// Returns true for hexagonal lattices.
    #[must_use]
    pub const fn is_hexagonal(self) -> bool {
        matches!(self, Self::Hexagon)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hexagon => write!(f, "hexagon"),
            Self::Square => write!(f, "square"),
            Self::Slab => write!(f, "slab"),
        }
    }
}

/// Immutable assembly geometry.
///
/// The pitch is the center-to-center distance of neighbouring assemblies
/// (flat-to-flat for hexagons).
///
/// # Examples
///
/// ```
/// use coremap::{AssemblyGeometry, Shape};
///
/// let geo = AssemblyGeometry::new(Shape::Square, 21.5).unwrap();
/// assert_eq!(geo.edges(), 4);
/// assert!((geo.area() - 21.5 * 21.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssemblyGeometry {
    shape: Shape,
    pitch: f64,
    edge: f64,
    area: f64,
    perimeter: f64,
    edges: u32,
}

impl AssemblyGeometry {
    /// Derives edge length, area and perimeter from shape and pitch.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidGeometry` unless the pitch is finite
    /// and positive.
    pub fn new(shape: Shape, pitch: f64) -> Result<Self, GeometryError> {
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(GeometryError::InvalidGeometry {
                reason: format!("pitch must be finite and positive, got {pitch}"),
            });
        }
        let (edge, area, edges) = match shape {
            Shape::Hexagon => {
                let edge = pitch / 3f64.sqrt();
                (edge, 3f64.sqrt() / 2.0 * pitch * pitch, 6)
            }
            Shape::Square => (pitch, pitch * pitch, 4),
            Shape::Slab => (pitch, pitch, 2),
        };
        let perimeter = match shape {
            Shape::Slab => 2.0,
            _ => edge * f64::from(edges),
        };
        Ok(Self {
            shape,
            pitch,
            edge,
            area,
            perimeter,
            edges,
        })
    }

    /// Assembly shape.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Center-to-center distance.
    #[must_use]
    pub const fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Edge length.
    #[must_use]
    pub const fn edge(&self) -> f64 {
        self.edge
    }

    /// Cross-section area (length for slabs).
    #[must_use]
    pub const fn area(&self) -> f64 {
        self.area
    }

    /// Sum of the edge lengths.
    #[must_use]
    pub const fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// Number of edges.
    #[must_use]
    pub const fn edges(&self) -> u32 {
        self.edges
    }
}

/// Rotational symmetry of the supplied sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    /// The grid is already complete.
    Full,
    /// One-eighth symmetry (square lattices).
    Octant,
    /// One-sixth symmetry (hexagonal lattices).
    Sextant,
    /// One-quarter symmetry (square lattices).
    Quadrant,
    /// Half symmetry (square lattices).
    Half,
}

impl Rotation {
    /// Rotation angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u32 {
        match self {
            Self::Full => 0,
            Self::Octant => 45,
            Self::Sextant => 60,
            Self::Quadrant => 90,
            Self::Half => 180,
        }
    }

    /// Number of sectors making up the full core.
    #[must_use]
    pub const fn sectors(self) -> u32 {
        match self {
            Self::Full => 1,
            angle => 360 / angle.degrees(),
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = GeometryError;

    fn try_from(angle: u32) -> Result<Self, Self::Error> {
        Ok(match angle {
            0 => Self::Full,
            45 => Self::Octant,
            60 => Self::Sextant,
            90 => Self::Quadrant,
            180 => Self::Half,
            _ => return Err(GeometryError::UnsupportedRotation { angle }),
        })
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}deg", self.degrees())
    }
}
