// src/simulation/results.rs
use crate::core::QubitId;
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic view of the simulator state returned by
/// [`Simulator::cheat`](super::Simulator::cheat).
///
/// Holds a copy of the id → bit-position map and borrows the amplitude
/// vector, so it lives no longer than the next mutation of the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot<'a> {
    positions: BTreeMap<QubitId, usize>,
    amplitudes: &'a [Complex64],
}

impl<'a> StateSnapshot<'a> {
    pub(crate) fn new(positions: BTreeMap<QubitId, usize>, amplitudes: &'a [Complex64]) -> Self {
        Self { positions, amplitudes }
    }

    /// Maps every allocated qubit to its bit position in the amplitude index.
    pub fn positions(&self) -> &BTreeMap<QubitId, usize> {
        &self.positions
    }

    /// The amplitude vector.
    pub fn amplitudes(&self) -> &'a [Complex64] {
        self.amplitudes
    }

    /// Number of allocated qubits.
    pub fn num_qubits(&self) -> usize {
        self.positions.len()
    }

    /// Sum of |a_i|^2.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }
}

impl fmt::Display for StateSnapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State ({} qubits):", self.positions.len())?;
        if !self.positions.is_empty() {
            // Highest position first, so basis labels read like kets.
            let mut by_position: Vec<_> = self.positions.iter().collect();
            by_position.sort_by_key(|&(_, &p)| std::cmp::Reverse(p));
            let order: Vec<String> = by_position.iter().map(|(id, _)| id.to_string()).collect();
            writeln!(f, "  Qubit order: |{}>", order.join(" "))?;
        }
        let width = self.positions.len();
        let mut printed = 0;
        for (i, a) in self.amplitudes.iter().enumerate() {
            if a.norm_sqr() < 1e-12 {
                continue;
            }
            if width == 0 {
                writeln!(f, "  |>: {:.6}", a)?;
            } else {
                writeln!(f, "  |{:0width$b}>: {:.6} (p = {:.6})", i, a, a.norm_sqr(), width = width)?;
            }
            printed += 1;
        }
        if printed == 0 {
            writeln!(f, "  (all amplitudes vanish)")?;
        }
        Ok(())
    }
}
