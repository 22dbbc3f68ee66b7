// src/core/matrix.rs

//! Dense square complex matrices acting on a handful of qubits.

use super::error::{Result, SimError};
use num_complex::Complex64;
use num_traits::{One, Zero};
use std::fmt;

/// A dense 2^k × 2^k complex matrix stored row-major.
///
/// For a gate applied to targets `[t_0, …, t_{k-1}]`, bit `b` of a row or
/// column index is the value of qubit `t_b`: the first target is the least
/// significant bit.
#[derive(Debug, Clone, PartialEq)]
pub struct GateMatrix {
    dim: usize,
    data: Vec<Complex64>,
}

impl GateMatrix {
    /// Builds a matrix from `dim * dim` row-major entries.
    ///
    /// Fails with `InvalidOperation` when `dim` is not a power of two and with
    /// `LengthMismatch` when `data` does not hold `dim * dim` entries.
    pub fn new(dim: usize, data: Vec<Complex64>) -> Result<Self> {
        if !dim.is_power_of_two() {
            return Err(SimError::InvalidOperation {
                message: format!("Gate matrix dimension {} is not a power of two", dim),
            });
        }
        if data.len() != dim * dim {
            return Err(SimError::LengthMismatch {
                what: "gate matrix entries",
                expected: dim * dim,
                actual: data.len(),
            });
        }
        Ok(Self { dim, data })
    }

    /// Builds a matrix from a fixed-size array of rows.
    pub fn from_rows<const N: usize>(rows: [[Complex64; N]; N]) -> Result<Self> {
        let data = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Self::new(N, data)
    }

    /// Builds a matrix from nested row vectors.
    pub fn from_row_vecs(rows: &[Vec<Complex64>]) -> Result<Self> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for row in rows {
            if row.len() != dim {
                return Err(SimError::LengthMismatch {
                    what: "gate matrix row",
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(dim, data)
    }

    /// Identity on `num_qubits` qubits.
    pub fn identity(num_qubits: usize) -> Self {
        let dim = 1usize << num_qubits;
        let mut data = vec![Complex64::zero(); dim * dim];
        for i in 0..dim {
            data[i * dim + i] = Complex64::one();
        }
        Self { dim, data }
    }

    /// Pauli X.
    pub fn pauli_x() -> Self {
        let (o, l) = (Complex64::zero(), Complex64::one());
        Self { dim: 2, data: vec![o, l, l, o] }
    }

    /// Pauli Y.
    pub fn pauli_y() -> Self {
        let o = Complex64::zero();
        let i = Complex64::i();
        Self { dim: 2, data: vec![o, -i, i, o] }
    }

    /// Pauli Z.
    pub fn pauli_z() -> Self {
        let (o, l) = (Complex64::zero(), Complex64::one());
        Self { dim: 2, data: vec![l, o, o, -l] }
    }

    /// Hadamard.
    pub fn hadamard() -> Self {
        let h = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        Self { dim: 2, data: vec![h, h, h, -h] }
    }

    /// Phase rotation `diag(1, e^{i theta})`.
    pub fn phase(theta: f64) -> Self {
        let (o, l) = (Complex64::zero(), Complex64::one());
        Self { dim: 2, data: vec![l, o, o, Complex64::from_polar(1.0, theta)] }
    }

    /// Side length of the matrix (2^k).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of qubits the matrix acts on (k).
    pub fn num_qubits(&self) -> usize {
        self.dim.trailing_zeros() as usize
    }

    /// Entry at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dim + col]
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.dim + col] = value;
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// One row of the matrix.
    #[inline]
    pub fn row(&self, row: usize) -> &[Complex64] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }

    /// Matrix product `self * rhs`.
    ///
    /// Both operands must have the same dimension; composition of gates over a
    /// common qubit set is the only caller.
    pub fn mul(&self, rhs: &GateMatrix) -> GateMatrix {
        debug_assert_eq!(self.dim, rhs.dim);
        let dim = self.dim;
        let mut out = vec![Complex64::zero(); dim * dim];
        for r in 0..dim {
            let out_row = &mut out[r * dim..(r + 1) * dim];
            for (k, &a) in self.row(r).iter().enumerate() {
                if a.is_zero() {
                    continue;
                }
                for (o, &b) in out_row.iter_mut().zip(rhs.row(k)) {
                    *o += a * b;
                }
            }
        }
        GateMatrix { dim, data: out }
    }

    /// Largest entry-wise distance to `other`, `f64::INFINITY` on shape mismatch.
    pub fn max_abs_diff(&self, other: &GateMatrix) -> f64 {
        if self.dim != other.dim {
            return f64::INFINITY;
        }
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for GateMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.dim {
            write!(f, "[")?;
            for c in 0..self.dim {
                write!(f, "{}{:.4}", if c > 0 { ", " } else { "" }, self.get(r, c))?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
