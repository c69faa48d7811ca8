//! 2-D affine transforms as 3×3 homogeneous matrices.
//!
//! # Convention
//!
//! Points are row vectors multiplied on the left of the matrix:
//!
//! ```text
//!               | m00 m01 0 |
//! [x' y' 1] = [x y 1] · | m10 m11 0 |
//!               | m20 m21 1 |
//! ```
//!
//! so the translation lives in the third row. `x` is the matrix row index
//! (vertical) and `y` the column index (horizontal).
//!
//! # Text Format
//!
//! [`AffineTransform::parse`] reads one matrix row per non-blank line with
//! whitespace-separated entries; `#` starts a comment. A 2×2 matrix is
//! embedded with zero translation. Any other shape falls back to the identity.

use std::fmt;
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineTransform {
    m: [[f64; 3]; 3],
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Wraps a full 3×3 matrix as given.
    pub const fn from_matrix(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    /// Builds a transform from parsed rows.
    ///
    /// Accepts a square 2×2 (embedded with identity translation) or 3×3
    /// matrix. Anything else is replaced by the identity with a warning.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let n = rows.len();
        let square = rows.iter().all(|row| row.as_ref().len() == n);
        if !square || !(n == 2 || n == 3) {
            let shape: Vec<usize> = rows.iter().map(|row| row.as_ref().len()).collect();
            warn!(
                rows = n,
                ?shape,
                "transform must be a square 2x2 or 3x3 matrix, using identity"
            );
            return Self::identity();
        }
        let mut m = Self::identity().m;
        for (r, row) in rows.iter().enumerate() {
            m[r][..n].copy_from_slice(row.as_ref());
        }
        Self { m }
    }

    /// Parses the text format described in the module docs.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default();
            if content.trim().is_empty() {
                continue;
            }
            let row = content
                .split_whitespace()
                .map(|token| {
                    token.parse::<f64>().map_err(|_| Error::TransformParse {
                        line: index + 1,
                        token: token.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Ok(Self::from_rows(&rows))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [tx, ty, 1.0]],
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Shear with `x' = x + kx * y` and `y' = y + ky * x`.
    pub fn shear(kx: f64, ky: f64) -> Self {
        Self {
            m: [[1.0, ky, 0.0], [kx, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation by `angle_degrees` that leaves `(pivot_x, pivot_y)` fixed.
    pub fn rotation(angle_degrees: f64, pivot_x: f64, pivot_y: f64) -> Self {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        let tx = pivot_x - (pivot_x * cos - pivot_y * sin);
        let ty = pivot_y - (pivot_x * sin + pivot_y * cos);
        Self {
            m: [[cos, sin, 0.0], [-sin, cos, 0.0], [tx, ty, 1.0]],
        }
    }

    /// Rotation about a pivot given as proportions of the image size.
    ///
    /// The pivot is `(rows * pivot_x - 1, cols * pivot_y - 1)`.
    pub fn build_rotation(
        angle_degrees: f64,
        pivot_x: f64,
        pivot_y: f64,
        rows: usize,
        cols: usize,
    ) -> Self {
        Self::rotation(
            angle_degrees,
            rows as f64 * pivot_x - 1.0,
            cols as f64 * pivot_y - 1.0,
        )
    }

    pub fn matrix(&self) -> &[[f64; 3]; 3] {
        &self.m
    }

    /// Returns the transform that applies `self` first, then `next`.
    pub fn then(&self, next: &AffineTransform) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (r, out_row) in m.iter_mut().enumerate() {
            for (c, out) in out_row.iter_mut().enumerate() {
                *out = (0..3).map(|k| self.m[r][k] * next.m[k][c]).sum();
            }
        }
        Self { m }
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Full 3×3 inverse via the adjugate.
    pub fn invert(&self) -> Result<Self> {
        let determinant = self.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(Error::SingularTransform { determinant });
        }
        let m = &self.m;
        let cofactor = |r: usize, c: usize| {
            let (r0, r1) = ((r + 1) % 3, (r + 2) % 3);
            let (c0, c1) = ((c + 1) % 3, (c + 2) % 3);
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };
        let mut inv = [[0.0; 3]; 3];
        for (r, row) in inv.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = cofactor(c, r) / determinant;
            }
        }
        Ok(Self { m: inv })
    }

    /// Maps `(x, y, 1)` through the matrix and drops the homogeneous weight.
    #[inline]
    pub fn map_point(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (
            x * m[0][0] + y * m[1][0] + m[2][0],
            x * m[0][1] + y * m[1][1] + m[2][1],
        )
    }

    /// Entrywise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &AffineTransform, tolerance: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl fmt::Display for AffineTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.m.iter().enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            write!(f, "{:>12.6} {:>12.6} {:>12.6}", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}
