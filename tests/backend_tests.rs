// tests/backend_tests.rs

//! Every kernel backend must produce the same state as the scalar reference.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use svsim::{Backend, Complex64, GateMatrix, QubitId, SimError, Simulator, SimulatorConfig, check_unitary};

const NUM_QUBITS: u64 = 10;
const AGREEMENT: f64 = 1e-9;

fn qid(id: u64) -> QubitId {
    QubitId(id)
}

/// Random unitary on `num_qubits` qubits: Gram-Schmidt on the columns of a
/// random complex matrix.
fn random_unitary(rng: &mut StdRng, num_qubits: usize) -> GateMatrix {
    let dim = 1usize << num_qubits;
    let mut cols: Vec<Vec<Complex64>> = Vec::with_capacity(dim);
    while cols.len() < dim {
        let mut v: Vec<Complex64> = (0..dim)
            .map(|_| Complex64::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5))
            .collect();
        for u in &cols {
            let proj: Complex64 = u.iter().zip(&v).map(|(a, b)| a.conj() * b).sum();
            for (x, a) in v.iter_mut().zip(u) {
                *x -= proj * a;
            }
        }
        let norm = v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
        if norm > 1e-6 {
            cols.push(v.into_iter().map(|x| x / norm).collect());
        }
    }
    let data = (0..dim).flat_map(|r| cols.iter().map(move |col| col[r])).collect::<Vec<_>>();
    GateMatrix::new(dim, data).expect("square power-of-two matrix")
}

/// Distinct qubit ids drawn from the register.
fn pick(rng: &mut StdRng, count: usize) -> Vec<QubitId> {
    let mut ids: Vec<QubitId> = Vec::with_capacity(count);
    while ids.len() < count {
        let id = qid(rng.random_range(0..NUM_QUBITS));
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// A random circuit mixing 1- to 3-qubit dense gates with up to two controls.
fn random_circuit(seed: u64, gates: usize) -> Vec<(GateMatrix, Vec<QubitId>, Vec<QubitId>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..gates)
        .map(|_| {
            let k = rng.random_range(1..=3usize);
            let c = rng.random_range(0..=2usize);
            let ids = pick(&mut rng, k + c);
            let matrix = random_unitary(&mut rng, k);
            (matrix, ids[..k].to_vec(), ids[k..].to_vec())
        })
        .collect()
}

fn simulate(backend: Backend, gate_fusion: bool, seed: u64) -> Result<Vec<Complex64>, SimError> {
    let config = SimulatorConfig::new()
        .with_backend(backend)
        .with_gate_fusion(gate_fusion)
        .with_offload_threads(2);
    let mut sim = Simulator::with_config(config)?;
    for id in 0..NUM_QUBITS {
        sim.allocate(qid(id))?;
    }
    for (matrix, targets, controls) in random_circuit(seed, 60) {
        sim.apply_gate(&matrix, &targets, &controls)?;
    }
    Ok(sim.cheat()?.amplitudes().to_vec())
}

fn max_distance(a: &[Complex64], b: &[Complex64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y).norm()).fold(0.0, f64::max)
}

#[test]
fn random_unitaries_are_unitary() -> Result<(), SimError> {
    let mut rng = StdRng::seed_from_u64(5);
    for k in 1..=3 {
        check_unitary(&random_unitary(&mut rng, k), Some(1e-12))?;
    }
    Ok(())
}

#[test]
fn all_backends_agree_on_ten_qubits() -> Result<(), SimError> {
    for seed in [1u64, 2] {
        let reference = simulate(Backend::ScalarSerial, false, seed)?;
        for backend in Backend::CONCRETE.into_iter().chain([Backend::Auto]) {
            for fusion in [true, false] {
                let state = simulate(backend, fusion, seed)?;
                let distance = max_distance(&reference, &state);
                assert!(
                    distance < AGREEMENT,
                    "{} (fusion {}) deviates by {:.3e} on seed {}",
                    backend,
                    fusion,
                    distance,
                    seed
                );
            }
        }
    }
    Ok(())
}

#[test]
fn backend_switch_mid_circuit_is_transparent() -> Result<(), SimError> {
    let reference = simulate(Backend::ScalarSerial, true, 9)?;

    let mut sim = Simulator::with_config(SimulatorConfig::new().with_offload_threads(2))?;
    for id in 0..NUM_QUBITS {
        sim.allocate(qid(id))?;
    }
    for (i, (matrix, targets, controls)) in random_circuit(9, 60).into_iter().enumerate() {
        sim.apply_gate(&matrix, &targets, &controls)?;
        if i % 10 == 9 {
            let backend = Backend::CONCRETE[(i / 10) % Backend::CONCRETE.len()];
            sim.select_backend(backend)?;
            assert_eq!(sim.backend(), backend);
        }
    }
    assert!(max_distance(&reference, sim.cheat()?.amplitudes()) < AGREEMENT);
    Ok(())
}

#[test]
fn controlled_gate_only_touches_satisfied_indices() -> Result<(), SimError> {
    for backend in Backend::CONCRETE {
        let mut sim = Simulator::with_config(SimulatorConfig::new().with_backend(backend).with_gate_fusion(false))?;
        for id in 0..3 {
            sim.allocate(qid(id))?;
        }
        // Uniform superposition, then X on q2 controlled by q0 and q1.
        for id in 0..3 {
            sim.apply_gate(&GateMatrix::hadamard(), &[qid(id)], &[])?;
        }
        sim.apply_gate(&GateMatrix::phase(0.5), &[qid(2)], &[])?;
        let before = sim.cheat()?.amplitudes().to_vec();
        sim.apply_gate(&GateMatrix::pauli_x(), &[qid(2)], &[qid(0), qid(1)])?;
        let after = sim.cheat()?.amplitudes().to_vec();

        for i in 0..8 {
            if i & 0b011 == 0b011 {
                assert!((after[i] - before[i ^ 0b100]).norm() < 1e-12, "{} index {}", backend, i);
            } else {
                assert_eq!(after[i], before[i], "{} index {}", backend, i);
            }
        }
    }
    Ok(())
}

#[test]
fn allocation_cycles_keep_footprint_bounded() -> Result<(), SimError> {
    let mut sim = Simulator::with_config(SimulatorConfig::new().with_backend(Backend::ScalarThreaded))?;
    for id in 0..NUM_QUBITS {
        sim.allocate(qid(id))?;
    }
    sim.apply_gate(&GateMatrix::hadamard(), &[qid(3)], &[])?;
    let largest = 2 << NUM_QUBITS;
    for round in 0..40u64 {
        let scratch = qid(1000 + round);
        sim.allocate(scratch)?;
        sim.apply_gate(&GateMatrix::pauli_x(), &[scratch], &[])?;
        sim.apply_gate(&GateMatrix::pauli_x(), &[scratch], &[])?;
        sim.deallocate(scratch)?;
    }
    assert!(
        sim.memory_footprint() <= 3 * largest,
        "footprint {} exceeds three times the largest vector {}",
        sim.memory_footprint(),
        largest
    );
    assert!((sim.get_probability(&[true], &[qid(3)])? - 0.5).abs() < 1e-12);
    Ok(())
}
