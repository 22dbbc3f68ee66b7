// src/operations/mod.rs

//! Requests the simulator consumes: the gate/allocation stream and the Pauli
//! terms used by expectation values and time evolution.

use crate::core::{GateMatrix, QubitId, SimError};
use std::fmt;
use std::str::FromStr;

/// One entry of the instruction stream handed to [`Simulator::receive`].
///
/// The gate-class hierarchy lives with the caller; by the time a gate reaches
/// the simulator it is a dense matrix plus target and control ids.
///
/// [`Simulator::receive`]: crate::simulation::Simulator::receive
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Allocate a fresh qubit in |0>.
    Allocate(QubitId),

    /// Release a qubit that has been measured or uncomputed.
    Deallocate(QubitId),

    /// Apply `matrix` to `targets` when every qubit in `controls` is |1>.
    Gate {
        /// Dense 2^k × 2^k unitary, first target least significant.
        matrix: GateMatrix,
        /// Qubits the matrix acts on.
        targets: Vec<QubitId>,
        /// Qubits that must be |1> for the gate to act.
        controls: Vec<QubitId>,
    },

    /// Measure the listed qubits in the computational basis.
    Measure {
        /// Qubits to measure, results are reported in this order.
        targets: Vec<QubitId>,
    },

    /// Apply all pending fused gates.
    Flush,
}

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pauli {
    X,
    Y,
    Z,
}

impl Pauli {
    /// Dense 2×2 matrix of the operator.
    pub fn matrix(self) -> GateMatrix {
        match self {
            Pauli::X => GateMatrix::pauli_x(),
            Pauli::Y => GateMatrix::pauli_y(),
            Pauli::Z => GateMatrix::pauli_z(),
        }
    }
}

impl TryFrom<char> for Pauli {
    type Error = SimError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_uppercase() {
            'X' => Ok(Pauli::X),
            'Y' => Ok(Pauli::Y),
            'Z' => Ok(Pauli::Z),
            other => Err(SimError::InvalidOperation { message: format!("'{}' is not a Pauli operator", other) }),
        }
    }
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        };
        write!(f, "{}", c)
    }
}

/// Tensor product of Pauli factors.
///
/// Each factor is `(index, pauli)` where `index` selects an entry of the id
/// list passed alongside the term. The empty product is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PauliTerm {
    factors: Vec<(usize, Pauli)>,
}

impl PauliTerm {
    /// The identity term.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds a term from `(index, pauli)` factors, applied in the given order.
    pub fn new<I>(factors: I) -> Self
    where
        I: IntoIterator<Item = (usize, Pauli)>,
    {
        Self { factors: factors.into_iter().collect() }
    }

    /// The factors of the product.
    pub fn factors(&self) -> &[(usize, Pauli)] {
        &self.factors
    }

    /// True for the identity term.
    pub fn is_identity(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Parses whitespace separated factors such as `"X0 Y1 Z3"`.
/// An empty string or `"I"` is the identity.
impl FromStr for PauliTerm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut factors = Vec::new();
        for token in s.split_whitespace() {
            if token.eq_ignore_ascii_case("I") {
                continue;
            }
            let mut chars = token.chars();
            let pauli = chars
                .next()
                .ok_or_else(|| SimError::InvalidOperation { message: "empty Pauli factor".to_string() })
                .and_then(Pauli::try_from)?;
            let index = chars.as_str().parse::<usize>().map_err(|_| SimError::InvalidOperation {
                message: format!("Pauli factor '{}' lacks a qubit index", token),
            })?;
            factors.push((index, pauli));
        }
        Ok(Self { factors })
    }
}

impl fmt::Display for PauliTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.factors.is_empty() {
            return write!(f, "I");
        }
        for (i, (index, pauli)) in self.factors.iter().enumerate() {
            write!(f, "{}{}{}", if i > 0 { " " } else { "" }, pauli, index)?;
        }
        Ok(())
    }
}
