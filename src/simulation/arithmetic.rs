// src/simulation/arithmetic.rs

//! Classical reversible arithmetic emulated directly on basis indices.

use super::Simulator;
use crate::core::{QubitId, Result, SimError};
use tracing::debug;

impl Simulator {
    /// Applies a classical permutation of register values to every basis
    /// state satisfying the control mask.
    ///
    /// Each register is decoded (its first qubit least significant) into an
    /// integer; `f` rewrites the list in place; the results are truncated to
    /// the register widths and written back into the index, carrying the
    /// amplitude along. `f` must be a bijection on the register values or the
    /// state loses norm.
    ///
    /// # Errors
    /// * `UnknownId` for any unallocated register or control qubit.
    pub fn emulate_math<F>(&mut self, f: F, registers: &[Vec<QubitId>], controls: &[QubitId]) -> Result<()>
    where
        F: Fn(&mut [i64]),
    {
        self.run()?;
        let ctrl_mask = self.store.mask_of(controls)?;
        let positions: Vec<Vec<usize>> = registers.iter().map(|r| self.store.positions_of(r)).collect::<Result<_>>()?;

        let mut next = self.store.scratch_zeroed();
        let mut values = vec![0i64; positions.len()];
        for (i, &amplitude) in self.store.amplitudes().iter().enumerate() {
            if i & ctrl_mask != ctrl_mask {
                next[i] += amplitude;
                continue;
            }
            for (value, register) in values.iter_mut().zip(&positions) {
                *value = register
                    .iter()
                    .enumerate()
                    .fold(0i64, |acc, (b, &p)| acc | ((((i >> p) & 1) as i64) << b));
            }
            f(&mut values);
            let mut j = i;
            for (&value, register) in values.iter().zip(&positions) {
                for (b, &p) in register.iter().enumerate() {
                    let bit = ((value >> b) & 1) as usize;
                    j = (j & !(1 << p)) | (bit << p);
                }
            }
            next[j] += amplitude;
        }
        self.store.replace(next);
        debug!(registers = registers.len(), controls = controls.len(), "emulated arithmetic");
        Ok(())
    }

    /// `x -> x + a` on every register, modulo the register size.
    pub fn emulate_math_add_constant(&mut self, a: i64, registers: &[Vec<QubitId>], controls: &[QubitId]) -> Result<()> {
        self.emulate_math(
            |values| {
                for x in values.iter_mut() {
                    *x = x.wrapping_add(a);
                }
            },
            registers,
            controls,
        )
    }

    /// `x -> (x + a) mod n` on every register.
    ///
    /// # Errors
    /// * `InvalidOperation` if `n` is not positive.
    pub fn emulate_math_add_constant_mod_n(
        &mut self,
        a: i64,
        n: i64,
        registers: &[Vec<QubitId>],
        controls: &[QubitId],
    ) -> Result<()> {
        let n = positive_modulus(n)?;
        self.emulate_math(
            |values| {
                for x in values.iter_mut() {
                    *x = x.wrapping_add(a).rem_euclid(n);
                }
            },
            registers,
            controls,
        )
    }

    /// `x -> (x * a) mod n` on every register.
    ///
    /// # Errors
    /// * `InvalidOperation` if `n` is not positive.
    pub fn emulate_math_multiply_by_constant_mod_n(
        &mut self,
        a: i64,
        n: i64,
        registers: &[Vec<QubitId>],
        controls: &[QubitId],
    ) -> Result<()> {
        let n = positive_modulus(n)?;
        self.emulate_math(
            |values| {
                for x in values.iter_mut() {
                    *x = x.wrapping_mul(a).rem_euclid(n);
                }
            },
            registers,
            controls,
        )
    }
}

fn positive_modulus(n: i64) -> Result<i64> {
    if n <= 0 {
        return Err(SimError::InvalidOperation { message: format!("modulus must be positive, got {}", n) });
    }
    Ok(n)
}
