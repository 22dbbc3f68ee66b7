// src/simulation/fusion.rs

//! Bounded window of pending gates that are composed into one operator
//! before a single kernel call.

use crate::core::{GateMatrix, QubitId};
use num_complex::Complex64;
use num_traits::Zero;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
struct PendingGate {
    matrix: GateMatrix,
    targets: Vec<QubitId>,
    controls: Vec<QubitId>,
}

/// Pending gates plus the bookkeeping needed to size the fused operator.
///
/// A qubit is part of the fused matrix unless it is a control of *every*
/// pending gate and a target of none; those common controls stay outside the
/// matrix and become the kernel's control mask.
#[derive(Debug, Clone, Default)]
pub(crate) struct FusionBuffer {
    gates: Vec<PendingGate>,
    /// Every id touched by a pending gate, as target or control.
    touched: BTreeSet<QubitId>,
    /// Controls shared by all pending gates and targeted by none.
    common_controls: BTreeSet<QubitId>,
}

/// Operator produced by [`FusionBuffer::fuse`].
#[derive(Debug, Clone)]
pub(crate) struct FusedOperator {
    pub(crate) matrix: GateMatrix,
    /// Ids the matrix acts on, bit `b` of the matrix index is `targets[b]`.
    pub(crate) targets: Vec<QubitId>,
    pub(crate) controls: Vec<QubitId>,
}

impl FusionBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.gates.len()
    }

    /// Qubits of the current fused matrix.
    pub(crate) fn num_qubits(&self) -> usize {
        self.touched.len() - self.common_controls.len()
    }

    /// Qubits the fused matrix would have after inserting the given gate.
    pub(crate) fn projected_num_qubits(&self, targets: &[QubitId], controls: &[QubitId]) -> usize {
        let common = self.next_common(targets, controls);
        let mut touched = self.touched.clone();
        touched.extend(targets.iter().chain(controls).copied());
        touched.len() - common.len()
    }

    fn next_common(&self, targets: &[QubitId], controls: &[QubitId]) -> BTreeSet<QubitId> {
        let mut common: BTreeSet<QubitId> = if self.gates.is_empty() {
            controls.iter().copied().collect()
        } else {
            controls.iter().copied().filter(|c| self.common_controls.contains(c)).collect()
        };
        // Earlier targets were never admitted, so only the new ones are removed.
        for t in targets {
            common.remove(t);
        }
        common
    }

    pub(crate) fn insert(&mut self, matrix: GateMatrix, targets: Vec<QubitId>, controls: Vec<QubitId>) {
        self.common_controls = self.next_common(&targets, &controls);
        self.touched.extend(targets.iter().chain(&controls).copied());
        self.gates.push(PendingGate { matrix, targets, controls });
    }

    /// Composes the pending gates, in insertion order, into one matrix over
    /// the sorted fused qubit set. Returns `None` when nothing is pending.
    pub(crate) fn fuse(&self) -> Option<FusedOperator> {
        if self.gates.is_empty() {
            return None;
        }
        let ids: Vec<QubitId> = self.touched.difference(&self.common_controls).copied().collect();
        let mut fused = GateMatrix::identity(ids.len());
        for gate in &self.gates {
            let full = expand(gate, &ids, &self.common_controls);
            fused = full.mul(&fused);
        }
        Some(FusedOperator {
            matrix: fused,
            targets: ids,
            controls: self.common_controls.iter().copied().collect(),
        })
    }

    pub(crate) fn clear(&mut self) {
        self.gates.clear();
        self.touched.clear();
        self.common_controls.clear();
    }
}

/// Embeds one gate into a matrix over `ids`, folding controls that are not
/// common to the whole window into the matrix.
fn expand(gate: &PendingGate, ids: &[QubitId], common: &BTreeSet<QubitId>) -> GateMatrix {
    let bit_of = |id: &QubitId| ids.iter().position(|x| x == id).unwrap_or_default();
    let target_bits: Vec<usize> = gate.targets.iter().map(bit_of).collect();
    let ctrl_mask = gate
        .controls
        .iter()
        .filter(|c| !common.contains(c))
        .fold(0usize, |mask, c| mask | (1 << bit_of(c)));
    let target_mask = target_bits.iter().fold(0usize, |mask, &b| mask | (1 << b));

    let scatter = |local: usize| {
        target_bits
            .iter()
            .enumerate()
            .fold(0usize, |acc, (b, &bit)| acc | (((local >> b) & 1) << bit))
    };
    let gather = |index: usize| {
        target_bits
            .iter()
            .enumerate()
            .fold(0usize, |acc, (b, &bit)| acc | (((index >> bit) & 1) << b))
    };

    let dim = 1usize << ids.len();
    let mut full = GateMatrix::identity(ids.len());
    for col in 0..dim {
        if col & ctrl_mask != ctrl_mask {
            continue;
        }
        let base = col & !target_mask;
        let local_col = gather(col);
        full.set(col, col, Complex64::zero());
        for local_row in 0..gate.matrix.dim() {
            full.set(base | scatter(local_row), col, gate.matrix.get(local_row, local_col));
        }
    }
    full
}
