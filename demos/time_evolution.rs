//! Evolves two qubits under H = 0.5 X0 X1 + 0.3 Z0 + 0.2 I and tracks <Z0 Z1>.

use svsim::{PauliTerm, QubitId, SimError, Simulator};

fn main() -> Result<(), SimError> {
    let ids = [QubitId(0), QubitId(1)];
    let hamiltonian = vec![
        ("X0 X1".parse::<PauliTerm>()?, 0.5),
        ("Z0".parse::<PauliTerm>()?, 0.3),
        (PauliTerm::identity(), 0.2),
    ];
    let observable = vec![("Z0 Z1".parse::<PauliTerm>()?, 1.0)];

    let mut sim = Simulator::new();
    for id in ids {
        sim.allocate(id)?;
    }

    let dt = 0.25;
    for step in 0..=12 {
        let value = sim.get_expectation_value(&observable, &ids)?;
        let p11 = sim.get_probability(&[true, true], &ids)?;
        println!("t = {:>5.2}  <Z0 Z1> = {:+.6}  P(11) = {:.6}", step as f64 * dt, value, p11);
        sim.emulate_time_evolution(&hamiltonian, dt, &ids, &[])?;
    }

    println!("\nFinal state:\n{}", sim.cheat()?);
    Ok(())
}
