// src/core/state.rs

use super::buffers::BufferPool;
use super::constants::PARALLEL_MIN_LEN;
use super::error::{QubitId, Result, SimError};
use num_complex::Complex64;
use num_traits::One;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::mem;
use tracing::debug;

/// The amplitude vector of the register together with the id → bit-position
/// map and the recycled scratch buffers.
///
/// Index `i` of the vector encodes the joint basis state where qubit `id`
/// has value `(i >> position(id)) & 1`. Positions always form a dense
/// permutation of `[0, N)`.
#[derive(Debug)]
pub(crate) struct AmplitudeStore {
    amplitudes: Vec<Complex64>,
    positions: BTreeMap<QubitId, usize>,
    pool: BufferPool,
}

impl AmplitudeStore {
    /// An empty register: zero qubits, a single amplitude equal to 1.
    pub(crate) fn new() -> Self {
        Self {
            amplitudes: vec![Complex64::one()],
            positions: BTreeMap::new(),
            pool: BufferPool::new(),
        }
    }

    /// Number of allocated qubits.
    pub(crate) fn num_qubits(&self) -> usize {
        self.positions.len()
    }

    /// Read-only view of the amplitudes.
    pub(crate) fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub(crate) fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.amplitudes
    }

    /// The id → position map.
    pub(crate) fn positions(&self) -> &BTreeMap<QubitId, usize> {
        &self.positions
    }

    /// Whether `id` is allocated.
    pub(crate) fn contains(&self, id: QubitId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Bit position of `id`.
    pub(crate) fn position(&self, id: QubitId) -> Result<usize> {
        self.positions.get(&id).copied().ok_or(SimError::UnknownId { id })
    }

    pub(crate) fn positions_of(&self, ids: &[QubitId]) -> Result<Vec<usize>> {
        ids.iter().map(|&id| self.position(id)).collect()
    }

    /// Bitmask with the positions of all `ids` set.
    pub(crate) fn mask_of(&self, ids: &[QubitId]) -> Result<usize> {
        ids.iter().try_fold(0usize, |mask, &id| Ok(mask | (1usize << self.position(id)?)))
    }

    /// Mask and value selecting indices consistent with `bits` on `ids`.
    pub(crate) fn pattern_of(&self, bits: &[bool], ids: &[QubitId]) -> Result<(usize, usize)> {
        if bits.len() != ids.len() {
            return Err(SimError::LengthMismatch { what: "bit values and qubit ids", expected: ids.len(), actual: bits.len() });
        }
        let mut mask = 0usize;
        let mut value = 0usize;
        for (&bit, &id) in bits.iter().zip(ids) {
            let pos = self.position(id)?;
            mask |= 1usize << pos;
            value |= usize::from(bit) << pos;
        }
        Ok((mask, value))
    }

    /// Adds a qubit in |0> at the next free position, doubling the vector.
    pub(crate) fn allocate(&mut self, id: QubitId) -> Result<()> {
        if self.positions.contains_key(&id) {
            return Err(SimError::DuplicateId { id });
        }
        let position = self.positions.len();
        let new_len = self.amplitudes.len() << 1;
        let grown = self.pool.take_padded(&self.amplitudes, new_len);
        let old = mem::replace(&mut self.amplitudes, grown);
        self.pool.recycle(old);
        self.positions.insert(id, position);
        debug!(qubit = %id, position, num_qubits = self.positions.len(), "allocated qubit");
        Ok(())
    }

    /// Removes `id`, which must be in a computational basis state.
    pub(crate) fn deallocate(&mut self, id: QubitId, tolerance: f64) -> Result<()> {
        let position = self.position(id)?;
        if !self.is_classical(position, tolerance) {
            return Err(SimError::NotClassical { id });
        }
        let value = self.classical_value(position, tolerance)?;
        self.remove_qubit(id, position, value);
        debug!(qubit = %id, value, num_qubits = self.positions.len(), "deallocated qubit");
        Ok(())
    }

    /// True iff exactly one branch of the qubit at `position` carries any
    /// amplitude above `tolerance`, checked block by block.
    pub(crate) fn is_classical(&self, position: usize, tolerance: f64) -> bool {
        let delta = 1usize << position;
        let flags = |block: &[Complex64]| {
            let (low, high) = block.split_at(delta);
            (
                low.iter().any(|a| a.norm_sqr() > tolerance),
                high.iter().any(|a| a.norm_sqr() > tolerance),
            )
        };
        let or = |a: (bool, bool), b: (bool, bool)| (a.0 | b.0, a.1 | b.1);
        let (up, down) = if self.amplitudes.len() >= PARALLEL_MIN_LEN {
            self.amplitudes.par_chunks(2 * delta).map(flags).reduce(|| (false, false), or)
        } else {
            self.amplitudes.chunks(2 * delta).map(flags).fold((false, false), or)
        };
        up ^ down
    }

    /// Value of the qubit at `position`, decided by the first amplitude whose
    /// norm exceeds `tolerance`.
    pub(crate) fn classical_value(&self, position: usize, tolerance: f64) -> Result<bool> {
        let delta = 1usize << position;
        for block in self.amplitudes.chunks(2 * delta) {
            let (low, high) = block.split_at(delta);
            for (l, h) in low.iter().zip(high) {
                if l.norm_sqr() > tolerance {
                    return Ok(false);
                }
                if h.norm_sqr() > tolerance {
                    return Ok(true);
                }
            }
        }
        Err(SimError::InternalConsistency {
            message: format!("no amplitude above tolerance {:e} found for position {}", tolerance, position),
        })
    }

    /// Drops the qubit at `position`, keeping the `value` branch and
    /// compacting the remaining positions.
    fn remove_qubit(&mut self, id: QubitId, position: usize, value: bool) {
        let delta = 1usize << position;
        let offset = if value { delta } else { 0 };
        let mut shrunk = self.pool.take(self.amplitudes.len() >> 1);
        for block in self.amplitudes.chunks(2 * delta) {
            shrunk.extend_from_slice(&block[offset..offset + delta]);
        }
        let old = mem::replace(&mut self.amplitudes, shrunk);
        self.pool.recycle(old);

        self.positions.remove(&id);
        for p in self.positions.values_mut() {
            if *p > position {
                *p -= 1;
            }
        }
    }

    /// Reassigns positions so that `ids[i]` occupies bit `i`. The caller
    /// guarantees `ids` is a permutation of all allocated qubits.
    pub(crate) fn reorder(&mut self, ids: &[QubitId]) {
        for (i, &id) in ids.iter().enumerate() {
            self.positions.insert(id, i);
        }
    }

    /// Swaps `next` in as the live vector and recycles the old one.
    pub(crate) fn replace(&mut self, next: Vec<Complex64>) {
        debug_assert_eq!(next.len(), self.amplitudes.len());
        let old = mem::replace(&mut self.amplitudes, next);
        self.pool.recycle(old);
    }

    /// Copy of the live vector held in a pooled buffer.
    pub(crate) fn snapshot(&mut self) -> Vec<Complex64> {
        self.pool.take_copy(&self.amplitudes)
    }

    /// Zeroed pooled buffer of the live vector's length.
    pub(crate) fn scratch_zeroed(&mut self) -> Vec<Complex64> {
        self.pool.take_zeroed(self.amplitudes.len())
    }

    pub(crate) fn recycle(&mut self, buf: Vec<Complex64>) {
        self.pool.recycle(buf);
    }

    /// Split borrow of the live vector and the pool, handed to kernels.
    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<Complex64>, &mut BufferPool) {
        (&mut self.amplitudes, &mut self.pool)
    }

    /// Capacity held by the live vector plus the pool.
    pub(crate) fn footprint(&self) -> usize {
        self.amplitudes.capacity() + self.pool.retained_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DEFAULT_TOLERANCE;
    use num_traits::Zero;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn qid(id: u64) -> QubitId {
        QubitId(id)
    }

    #[test]
    fn allocate_doubles_and_preserves() -> Result<()> {
        let mut store = AmplitudeStore::new();
        store.allocate(qid(7))?;
        store.allocate(qid(3))?;
        assert_eq!(store.amplitudes().len(), 4);
        assert_eq!(store.position(qid(7))?, 0);
        assert_eq!(store.position(qid(3))?, 1);
        assert_eq!(store.amplitudes()[0], Complex64::one());
        assert!(store.amplitudes()[1..].iter().all(|a| a.is_zero()));
        Ok(())
    }

    #[test]
    fn duplicate_allocation_fails() -> Result<()> {
        let mut store = AmplitudeStore::new();
        store.allocate(qid(1))?;
        assert_eq!(store.allocate(qid(1)), Err(SimError::DuplicateId { id: qid(1) }));
        Ok(())
    }

    #[test]
    fn deallocate_compacts_positions() -> Result<()> {
        let mut store = AmplitudeStore::new();
        for id in 0..3 {
            store.allocate(qid(id))?;
        }
        // |q2 q1 q0> = |1 0 1>
        store.amplitudes_mut()[0] = Complex64::zero();
        store.amplitudes_mut()[0b101] = Complex64::one();

        store.deallocate(qid(1), DEFAULT_TOLERANCE)?;
        assert_eq!(store.position(qid(0))?, 0);
        assert_eq!(store.position(qid(2))?, 1);
        assert_eq!(store.amplitudes().len(), 4);
        assert_eq!(store.amplitudes()[0b11], Complex64::one());

        store.deallocate(qid(2), DEFAULT_TOLERANCE)?;
        assert_eq!(store.amplitudes(), &[Complex64::zero(), Complex64::one()]);
        Ok(())
    }

    #[test]
    fn entangled_qubit_is_not_classical() -> Result<()> {
        let mut store = AmplitudeStore::new();
        store.allocate(qid(0))?;
        store.allocate(qid(1))?;
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        store.amplitudes_mut().copy_from_slice(&[h, Complex64::zero(), Complex64::zero(), h]);

        assert!(!store.is_classical(0, DEFAULT_TOLERANCE));
        assert_eq!(store.deallocate(qid(0), DEFAULT_TOLERANCE), Err(SimError::NotClassical { id: qid(0) }));
        Ok(())
    }

    #[test]
    fn local_inconsistency_makes_qubit_non_classical() -> Result<()> {
        // q0 is |0> in the q1=0 block and |1> in the q1=1 block.
        let mut store = AmplitudeStore::new();
        store.allocate(qid(0))?;
        store.allocate(qid(1))?;
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        store.amplitudes_mut().copy_from_slice(&[h, Complex64::zero(), Complex64::zero(), h]);
        assert!(!store.is_classical(0, DEFAULT_TOLERANCE));
        assert!(!store.is_classical(1, DEFAULT_TOLERANCE));

        store.amplitudes_mut().copy_from_slice(&[Complex64::zero(), Complex64::zero(), h, h]);
        assert!(!store.is_classical(0, DEFAULT_TOLERANCE));
        assert!(store.is_classical(1, DEFAULT_TOLERANCE));
        assert!(store.classical_value(1, DEFAULT_TOLERANCE)?);
        Ok(())
    }

    #[test]
    fn allocate_deallocate_cycles_reuse_buffers() -> Result<()> {
        let mut store = AmplitudeStore::new();
        for id in 0..10 {
            store.allocate(qid(id))?;
        }
        let largest = store.amplitudes().len();
        for round in 0..50u64 {
            let extra = qid(100 + round);
            store.allocate(extra)?;
            store.deallocate(extra, DEFAULT_TOLERANCE)?;
        }
        assert!(
            store.footprint() <= 3 * 2 * largest,
            "footprint {} exceeds three times the largest vector {}",
            store.footprint(),
            2 * largest
        );
        assert_eq!(store.amplitudes()[0], Complex64::one());
        Ok(())
    }
}
