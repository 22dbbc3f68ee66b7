// src/simulation/expectation.rs

//! Expectation values, operator application and time evolution for sums of
//! Pauli terms.

use super::Simulator;
use crate::core::buffers::copy_amplitudes;
use crate::core::constants::PARALLEL_MIN_LEN;
use crate::core::{QubitId, Result, SimError};
use crate::operations::{Pauli, PauliTerm};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, trace};

/// A term with its factors resolved to qubit ids.
type ResolvedTerm = Vec<(QubitId, Pauli)>;

impl Simulator {
    /// Maps factor indices to allocated ids, failing before anything touches
    /// the state.
    fn resolve_term(&self, term: &PauliTerm, ids: &[QubitId]) -> Result<ResolvedTerm> {
        term.factors()
            .iter()
            .map(|&(index, pauli)| {
                let id = *ids.get(index).ok_or_else(|| SimError::InvalidOperation {
                    message: format!("term {} addresses qubit index {} but only {} ids were given", term, index, ids.len()),
                })?;
                self.store.position(id)?;
                Ok((id, pauli))
            })
            .collect()
    }

    /// Applies every factor of `term` as a single-qubit gate and flushes.
    fn apply_term(&mut self, term: &[(QubitId, Pauli)]) -> Result<()> {
        for &(id, pauli) in term {
            self.apply_gate(&pauli.matrix(), &[id], &[])?;
        }
        self.run()
    }

    /// `<psi| H |psi>` for the Hermitian `H = sum_k c_k P_k`.
    ///
    /// # Arguments
    /// * `terms` - `(term, coefficient)` pairs; term factor indices address `ids`.
    /// * `ids` - Qubits the term indices refer to.
    ///
    /// # Errors
    /// * `InvalidOperation` if a factor index is outside `ids`.
    /// * `UnknownId` if a referenced id is not allocated.
    pub fn get_expectation_value(&mut self, terms: &[(PauliTerm, f64)], ids: &[QubitId]) -> Result<f64> {
        self.run()?;
        let resolved = terms
            .iter()
            .map(|(term, c)| Ok((self.resolve_term(term, ids)?, *c)))
            .collect::<Result<Vec<_>>>()?;

        let snapshot = self.store.snapshot();
        let mut expectation = 0.0;
        let mut outcome = Ok(());
        for (term, coefficient) in &resolved {
            if let Err(e) = self.apply_term(term) {
                outcome = Err(e);
                break;
            }
            expectation += coefficient * real_overlap(&snapshot, self.store.amplitudes());
            copy_amplitudes(self.store.amplitudes_mut(), &snapshot);
        }
        copy_amplitudes(self.store.amplitudes_mut(), &snapshot);
        self.store.recycle(snapshot);
        outcome?;
        trace!(terms = resolved.len(), expectation, "expectation value");
        Ok(expectation)
    }

    /// Replaces the state by `sum_k c_k P_k |psi>`. The result is not renormalized.
    ///
    /// # Errors
    /// * `InvalidOperation` if a factor index is outside `ids`.
    /// * `UnknownId` if a referenced id is not allocated.
    pub fn apply_qubit_operator(&mut self, terms: &[(PauliTerm, Complex64)], ids: &[QubitId]) -> Result<()> {
        self.run()?;
        let resolved = terms
            .iter()
            .map(|(term, c)| Ok((self.resolve_term(term, ids)?, *c)))
            .collect::<Result<Vec<_>>>()?;

        let snapshot = self.store.snapshot();
        let mut output = self.store.scratch_zeroed();
        for (term, coefficient) in &resolved {
            if let Err(e) = self.apply_term(term) {
                copy_amplitudes(self.store.amplitudes_mut(), &snapshot);
                self.store.recycle(snapshot);
                self.store.recycle(output);
                return Err(e);
            }
            accumulate(&mut output, *coefficient, self.store.amplitudes());
            copy_amplitudes(self.store.amplitudes_mut(), &snapshot);
        }
        self.store.replace(output);
        self.store.recycle(snapshot);
        Ok(())
    }

    /// Applies `exp(-i t H)` for `H = sum_k c_k P_k`, conditioned on `controls`.
    ///
    /// Identity terms contribute a global phase (applied per substep as a
    /// correction); the remainder is integrated with `ceil(|t| * sum|c_k|) + 1`
    /// substeps, each a Taylor series truncated once the added norm drops to
    /// the configured tolerance. Amplitudes failing the control mask are left
    /// untouched.
    ///
    /// # Errors
    /// * `InvalidOperation` if a factor index is outside `ids`.
    /// * `UnknownId` if a referenced id or control is not allocated.
    pub fn emulate_time_evolution(
        &mut self,
        terms: &[(PauliTerm, f64)],
        time: f64,
        ids: &[QubitId],
        controls: &[QubitId],
    ) -> Result<()> {
        self.run()?;
        let ctrl_mask = self.store.mask_of(controls)?;

        let mut trace_sum = 0.0;
        let mut op_norm = 0.0;
        let mut hamiltonian = Vec::with_capacity(terms.len());
        for (term, c) in terms {
            if term.is_identity() {
                trace_sum += c;
            } else {
                op_norm += c.abs();
                hamiltonian.push((self.resolve_term(term, ids)?, *c));
            }
        }

        let substeps = (time.abs() * op_norm).ceil() as usize + 1;
        let correction = (Complex64::new(0.0, -time * trace_sum / substeps as f64)).exp();
        let tolerance = self.config.tolerance;
        debug!(substeps, op_norm, trace = trace_sum, "time evolution");

        let mut output = self.store.snapshot();
        for _ in 0..substeps {
            let mut added_norm = 1.0;
            let mut k = 0usize;
            while added_norm > tolerance {
                let coeff = Complex64::new(0.0, -time) / (substeps * (k + 1)) as f64;
                let current = self.store.snapshot();
                let mut update = self.store.scratch_zeroed();
                for (term, c) in &hamiltonian {
                    self.apply_term(term)?;
                    accumulate(&mut update, Complex64::new(*c, 0.0), self.store.amplitudes());
                    copy_amplitudes(self.store.amplitudes_mut(), &current);
                }

                added_norm = self
                    .store
                    .amplitudes_mut()
                    .par_iter_mut()
                    .with_min_len(PARALLEL_MIN_LEN)
                    .zip(update.par_iter())
                    .zip(output.par_iter_mut())
                    .enumerate()
                    .map(|(i, ((live, &u), out))| {
                        *live = coeff * u;
                        if i & ctrl_mask == ctrl_mask {
                            *out += *live;
                            live.norm_sqr()
                        } else {
                            0.0
                        }
                    })
                    .sum::<f64>()
                    .sqrt();

                self.store.recycle(update);
                self.store.recycle(current);
                k += 1;
            }
            trace!(series_terms = k, "substep done");

            output
                .par_iter_mut()
                .with_min_len(PARALLEL_MIN_LEN)
                .enumerate()
                .filter(|(i, _)| i & ctrl_mask == ctrl_mask)
                .for_each(|(_, out)| *out *= correction);
            copy_amplitudes(self.store.amplitudes_mut(), &output);
        }
        self.store.recycle(output);
        Ok(())
    }
}

/// `Re <a|b>`.
fn real_overlap(a: &[Complex64], b: &[Complex64]) -> f64 {
    a.par_iter()
        .with_min_len(PARALLEL_MIN_LEN)
        .zip(b.par_iter())
        .map(|(x, y)| (x.conj() * y).re)
        .sum()
}

/// `acc += coefficient * v`.
fn accumulate(acc: &mut [Complex64], coefficient: Complex64, v: &[Complex64]) {
    acc.par_iter_mut()
        .with_min_len(PARALLEL_MIN_LEN)
        .zip(v.par_iter())
        .for_each(|(a, x)| *a += coefficient * x);
}
