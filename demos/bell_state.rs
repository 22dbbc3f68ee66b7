//! Prepares a Bell pair on every backend and samples it.

use svsim::{Backend, GateMatrix, QubitId, SimError, Simulator, SimulatorConfig};

fn qid(id: u64) -> QubitId {
    QubitId(id)
}

fn main() -> Result<(), SimError> {
    let (a, b) = (qid(0), qid(1));

    for backend in Backend::CONCRETE {
        let mut sim = Simulator::with_config(SimulatorConfig::new().with_seed(7).with_backend(backend))?;
        sim.allocate(a)?;
        sim.allocate(b)?;

        // H on a, then CNOT(a -> b)
        sim.apply_gate(&GateMatrix::hadamard(), &[a], &[])?;
        sim.apply_gate(&GateMatrix::pauli_x(), &[b], &[a])?;

        println!("--- {} ---", backend);
        println!("{}", sim.cheat()?);

        let mut counts = [0usize; 4];
        for _ in 0..200 {
            let bits = sim.measure(&[a, b])?;
            counts[((bits[0] as usize) << 1) | bits[1] as usize] += 1;
            // Undo the collapse by re-preparing the pair.
            sim.deallocate(a)?;
            sim.deallocate(b)?;
            sim.allocate(a)?;
            sim.allocate(b)?;
            sim.apply_gate(&GateMatrix::hadamard(), &[a], &[])?;
            sim.apply_gate(&GateMatrix::pauli_x(), &[b], &[a])?;
        }
        println!("outcomes (a b) 00: {}  01: {}  10: {}  11: {}", counts[0], counts[1], counts[2], counts[3]);
        println!("kernel launches: {}\n", sim.kernel_launches());
    }
    Ok(())
}
