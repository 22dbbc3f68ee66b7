// tests/property_tests.rs

//! Property-based tests for properties that must hold for any gate sequence.

use proptest::prelude::*;
use svsim::{Complex64, DEFAULT_TOLERANCE, GateMatrix, QubitId, Simulator, SimulatorConfig};

const NUM_QUBITS: u64 = 4;

/// A gate drawn from a small universal set: (kind, angle, target, control).
fn gate_strategy() -> impl Strategy<Value = (u8, f64, u64, Option<u64>)> {
    (0u8..5, -3.2f64..3.2, 0..NUM_QUBITS, prop::option::of(0..NUM_QUBITS))
}

fn matrix_for(kind: u8, angle: f64) -> GateMatrix {
    match kind {
        0 => GateMatrix::hadamard(),
        1 => GateMatrix::pauli_x(),
        2 => GateMatrix::pauli_y(),
        3 => GateMatrix::phase(angle),
        _ => {
            let (s, c) = (angle / 2.0).sin_cos();
            GateMatrix::from_rows([[Complex64::new(c, 0.0), Complex64::new(-s, 0.0)], [
                Complex64::new(s, 0.0),
                Complex64::new(c, 0.0),
            ]])
            .expect("2x2")
        }
    }
}

fn run_circuit(sim: &mut Simulator, gates: &[(u8, f64, u64, Option<u64>)]) {
    for id in 0..NUM_QUBITS {
        sim.allocate(QubitId(id)).unwrap();
    }
    for &(kind, angle, target, control) in gates {
        let controls: Vec<QubitId> = control.filter(|&c| c != target).map(QubitId).into_iter().collect();
        sim.apply_gate(&matrix_for(kind, angle), &[QubitId(target)], &controls).unwrap();
    }
}

proptest! {
    /// Property: unitary gates preserve the norm.
    #[test]
    fn norm_is_preserved(gates in prop::collection::vec(gate_strategy(), 1..40)) {
        let mut sim = Simulator::new();
        run_circuit(&mut sim, &gates);
        let norm = sim.cheat().unwrap().norm_sqr();
        prop_assert!((norm - 1.0).abs() < 1e-10, "norm drifted to {}", norm);
    }

    /// Property: fusing gates does not change the result.
    #[test]
    fn fusion_is_transparent(gates in prop::collection::vec(gate_strategy(), 1..40)) {
        let mut fused = Simulator::new();
        run_circuit(&mut fused, &gates);
        let mut unfused = Simulator::with_config(SimulatorConfig::new().with_gate_fusion(false)).unwrap();
        run_circuit(&mut unfused, &gates);

        let a = fused.cheat().unwrap().amplitudes().to_vec();
        let b = unfused.cheat().unwrap().amplitudes().to_vec();
        for (x, y) in a.iter().zip(&b) {
            prop_assert!((x - y).norm() < 1e-10);
        }
    }

    /// Property: after measuring, every measured qubit is classical with the
    /// reported value, and the probability of the outcome is one.
    #[test]
    fn measurement_is_consistent(gates in prop::collection::vec(gate_strategy(), 1..30), seed in any::<u64>()) {
        let mut sim = Simulator::with_seed(seed);
        run_circuit(&mut sim, &gates);
        let ids: Vec<QubitId> = (0..NUM_QUBITS).map(QubitId).collect();
        let bits = sim.measure(&ids).unwrap();
        for (&id, &bit) in ids.iter().zip(&bits) {
            prop_assert!(sim.is_classical(id, DEFAULT_TOLERANCE).unwrap());
            prop_assert_eq!(sim.get_classical_value(id, DEFAULT_TOLERANCE).unwrap(), bit);
        }
        prop_assert!((sim.get_probability(&bits, &ids).unwrap() - 1.0).abs() < 1e-10);
    }

    /// Property: probabilities of complementary outcomes sum to one.
    #[test]
    fn marginals_sum_to_one(gates in prop::collection::vec(gate_strategy(), 1..30), qubit in 0..NUM_QUBITS) {
        let mut sim = Simulator::new();
        run_circuit(&mut sim, &gates);
        let id = QubitId(qubit);
        let p0 = sim.get_probability(&[false], &[id]).unwrap();
        let p1 = sim.get_probability(&[true], &[id]).unwrap();
        prop_assert!((p0 + p1 - 1.0).abs() < 1e-10);
    }
}
