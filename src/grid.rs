//! Rectangular grids of assembly type ids.
//!
//! A `CoreGrid` is stored row-major. Cell value 0 is void; positive values
//! are assembly type ids. Negative values only appear transiently inside the
//! unfolding routines and are rejected on input.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Value of an empty lattice position.
pub const VOID: i64 = 0;

/// Rectangular grid of integer type ids.
///
/// # Examples
///
/// ```
/// use coremap::CoreGrid;
///
/// let grid = CoreGrid::from_rows(vec![vec![1, 2], vec![0, 3]]).unwrap();
/// assert_eq!(grid.get(1, 1), 3);
/// assert_eq!(grid.count_nonzero(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoreGrid {
    rows: usize,
    cols: usize,
    cells: Vec<i64>,
}

impl CoreGrid {
    /// Creates a grid filled with void.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, VOID)
    }

    /// Creates a grid filled with `value`.
    #[must_use]
    pub fn filled(rows: usize, cols: usize, value: i64) -> Self {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    /// Builds a grid from nested rows.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::RaggedRows` if rows differ in length.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, GeometryError> {
        let expected = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(expected * rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(GeometryError::RaggedRows {
                    row: i,
                    actual: row.len(),
                    expected,
                });
            }
            cells.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols: expected,
            cells,
        })
    }

    /// Parses a whitespace-separated text grid.
    ///
    /// Each non-blank line is a row. `void_marker` maps to void, integer
    /// tokens are taken verbatim and any other token is resolved through
    /// `names`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::RaggedRows` for rows of unequal length and
    /// `GeometryError::UnknownToken` for tokens that cannot be resolved.
    pub fn parse(
        text: &str,
        names: &HashMap<String, i64>,
        void_marker: &str,
    ) -> Result<Self, GeometryError> {
        let mut rows = Vec::new();
        for (i, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let mut row = Vec::new();
            for token in line.split_whitespace() {
                let value = if token == void_marker {
                    VOID
                } else if let Some(id) = names.get(token) {
                    *id
                } else if let Ok(id) = token.parse::<i64>() {
                    id
                } else {
                    return Err(GeometryError::UnknownToken {
                        token: token.to_string(),
                        row: i,
                    });
                };
                row.push(value);
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns true for square grids.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) outside grid");
        self.cells[row * self.cols + col]
    }

    /// Value at `(row, col)`, or `None` outside the grid.
    #[must_use]
    pub fn try_get(&self, row: isize, col: isize) -> Option<i64> {
        let r = usize::try_from(row).ok()?;
        let c = usize::try_from(col).ok()?;
        (r < self.rows && c < self.cols).then(|| self.cells[r * self.cols + c])
    }

    /// Sets the value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) outside grid");
        self.cells[row * self.cols + col] = value;
    }

    /// Row-major view of all cells.
    #[must_use]
    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    /// Iterates `(row, col, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i / cols, i % cols, v))
    }

    /// Number of non-void cells.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        self.cells.iter().filter(|&&v| v != VOID).count()
    }

    /// Fails on the first negative cell.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::NegativeCell`.
    pub fn ensure_non_negative(&self) -> Result<(), GeometryError> {
        match self.iter().find(|&(_, _, v)| v < 0) {
            Some((row, col, value)) => Err(GeometryError::NegativeCell { row, col, value }),
            None => Ok(()),
        }
    }

    /// Mirror image across the main diagonal.
    #[must_use]
    pub fn transposed(&self) -> Self {
        let mut out = Self::new(self.cols, self.rows);
        for (r, c, v) in self.iter() {
            out.set(c, r, v);
        }
        out
    }

    /// Rows in reverse order (vertical flip).
    #[must_use]
    pub fn flipped_rows(&self) -> Self {
        let mut out = Self::new(self.rows, self.cols);
        for (r, c, v) in self.iter() {
            out.set(self.rows - 1 - r, c, v);
        }
        out
    }

    /// Columns in reverse order (horizontal flip).
    #[must_use]
    pub fn flipped_cols(&self) -> Self {
        let mut out = Self::new(self.rows, self.cols);
        for (r, c, v) in self.iter() {
            out.set(r, self.cols - 1 - c, v);
        }
        out
    }

    /// Stable content hash, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.rows as u64).to_le_bytes());
        hasher.update(&(self.cols as u64).to_le_bytes());
        for v in &self.cells {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Display for CoreGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .cells
            .iter()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);
        for r in 0..self.rows {
            let line: Vec<String> = (0..self.cols)
                .map(|c| format!("{:>width$}", self.get(r, c)))
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
