// src/simulation/measurement.rs

//! Measurement, forced collapse, probability and amplitude queries, and
//! wavefunction replacement.

use super::Simulator;
use crate::core::constants::PARALLEL_MIN_LEN;
use crate::core::{QubitId, Result, SimError};
use crate::validation::check_normalization;
use num_complex::Complex64;
use num_traits::Zero;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

impl Simulator {
    /// Measures `ids` in the computational basis and collapses the state.
    ///
    /// A basis index is sampled from |a_i|^2 with the seeded RNG; every
    /// amplitude disagreeing with the sampled bits on `ids` is zeroed and the
    /// remainder renormalized.
    ///
    /// # Returns
    /// * The measured bit of each id, in the order given.
    ///
    /// # Errors
    /// * `UnknownId` if any id is not allocated.
    pub fn measure(&mut self, ids: &[QubitId]) -> Result<Vec<bool>> {
        self.run()?;
        let positions = self.store.positions_of(ids)?;

        let r: f64 = self.rng.random::<f64>();
        let index = sample_index(self.store.amplitudes(), r);
        let bits: Vec<bool> = positions.iter().map(|&p| (index >> p) & 1 == 1).collect();

        let (mask, value) = self.store.pattern_of(&bits, ids)?;
        let retained = project(self.store.amplitudes_mut(), mask, value);
        if retained > 0.0 {
            scale(self.store.amplitudes_mut(), 1.0 / retained.sqrt());
        }
        debug!(?ids, ?bits, sampled = index, "measured");
        Ok(bits)
    }

    /// Forces `ids` into `values`, renormalizing the surviving amplitudes.
    ///
    /// # Errors
    /// * `LengthMismatch` if `ids` and `values` differ in length.
    /// * `UnknownId` if any id is not allocated.
    /// * `ZeroProbability` if the requested outcome has probability below
    ///   the configured tolerance; the state is left untouched.
    pub fn collapse(&mut self, ids: &[QubitId], values: &[bool]) -> Result<()> {
        self.run()?;
        let (mask, value) = self.store.pattern_of(values, ids)?;
        let probability = probability_of(self.store.amplitudes(), mask, value);
        if probability < self.config.tolerance {
            return Err(SimError::ZeroProbability { probability });
        }
        project(self.store.amplitudes_mut(), mask, value);
        scale(self.store.amplitudes_mut(), 1.0 / probability.sqrt());
        debug!(?ids, ?values, probability, "collapsed");
        Ok(())
    }

    /// Probability that `ids` read `bits`.
    ///
    /// # Errors
    /// * `LengthMismatch` if `bits` and `ids` differ in length.
    /// * `UnknownId` if any id is not allocated.
    pub fn get_probability(&mut self, bits: &[bool], ids: &[QubitId]) -> Result<f64> {
        self.run()?;
        let (mask, value) = self.store.pattern_of(bits, ids)?;
        Ok(probability_of(self.store.amplitudes(), mask, value))
    }

    /// Amplitude of the basis state where `ids[i]` reads `bits[i]`.
    ///
    /// # Errors
    /// * `LengthMismatch` if `bits` and `ids` differ in length.
    /// * `InvalidMapping` unless `ids` covers every allocated qubit exactly once.
    pub fn get_amplitude(&mut self, bits: &[bool], ids: &[QubitId]) -> Result<Complex64> {
        self.run()?;
        if bits.len() != ids.len() {
            return Err(SimError::LengthMismatch { what: "bit values and qubit ids", expected: ids.len(), actual: bits.len() });
        }
        self.check_full_mapping(ids)?;
        let (_, index) = self.store.pattern_of(bits, ids)?;
        Ok(self.store.amplitudes()[index])
    }

    /// Replaces the state: `ids[i]` takes bit position `i` and the amplitudes
    /// become `wavefunction`.
    ///
    /// A vector that is not normalized is accepted and reported with a warning.
    ///
    /// # Errors
    /// * `LengthMismatch` unless `wavefunction.len() == 2^ids.len()`.
    /// * `InvalidMapping` unless `ids` covers every allocated qubit exactly once.
    pub fn set_wavefunction(&mut self, wavefunction: &[Complex64], ids: &[QubitId]) -> Result<()> {
        self.run()?;
        let expected = 1usize << ids.len();
        if wavefunction.len() != expected {
            return Err(SimError::LengthMismatch { what: "wavefunction", expected, actual: wavefunction.len() });
        }
        self.check_full_mapping(ids)?;
        if let Err(e) = check_normalization(wavefunction, None) {
            warn!(error = %e, "wavefunction is not normalized");
        }

        self.store.reorder(ids);
        let (_, pool) = self.store.parts_mut();
        let next = pool.take_copy(wavefunction);
        self.store.replace(next);
        debug!(num_qubits = ids.len(), "wavefunction replaced");
        Ok(())
    }
}

/// First index whose cumulative probability exceeds `r`, falling back to the
/// last populated index when rounding leaves the total just below `r`.
fn sample_index(amplitudes: &[Complex64], r: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_populated = 0;
    for (i, a) in amplitudes.iter().enumerate() {
        let p = a.norm_sqr();
        if p > 0.0 {
            last_populated = i;
        }
        cumulative += p;
        if cumulative > r {
            return i;
        }
    }
    last_populated
}

fn probability_of(amplitudes: &[Complex64], mask: usize, value: usize) -> f64 {
    amplitudes
        .par_iter()
        .with_min_len(PARALLEL_MIN_LEN)
        .enumerate()
        .filter(|(i, _)| i & mask == value)
        .map(|(_, a)| a.norm_sqr())
        .sum()
}

/// Zeroes amplitudes inconsistent with `(mask, value)` and returns the
/// retained probability mass.
fn project(amplitudes: &mut [Complex64], mask: usize, value: usize) -> f64 {
    amplitudes
        .par_iter_mut()
        .with_min_len(PARALLEL_MIN_LEN)
        .enumerate()
        .map(|(i, a)| {
            if i & mask == value {
                a.norm_sqr()
            } else {
                *a = Complex64::zero();
                0.0
            }
        })
        .sum()
}

fn scale(amplitudes: &mut [Complex64], factor: f64) {
    amplitudes
        .par_iter_mut()
        .with_min_len(PARALLEL_MIN_LEN)
        .for_each(|a| *a *= factor);
}
