// src/simulation/mod.rs

//! The `Simulator` entry point.
//!
//! Gates flow through the fusion buffer into the bound kernel; every query
//! that reads the state (measurement, probabilities, expectation values,
//! deallocation, ...) flushes pending gates first. The query families live
//! in their own files as further `impl Simulator` blocks.

mod arithmetic;
pub mod config;
mod expectation;
pub(crate) mod fusion;
pub mod kernels;
mod measurement;
mod results;

pub use config::SimulatorConfig;
pub use kernels::Backend;
pub use results::StateSnapshot;

use crate::core::{AmplitudeStore, GateMatrix, QubitId, Result, SimError};
use crate::operations::Operation;
use fusion::FusionBuffer;
use kernels::{Kernel, KernelTask};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use tracing::{debug, info, trace};

/// Full state-vector simulator.
///
/// Owns the amplitude vector, the pending fused operator, the bound kernel
/// and the measurement RNG. Independent instances share nothing and may live
/// on different threads.
#[derive(Debug)]
pub struct Simulator {
    store: AmplitudeStore,
    fusion: FusionBuffer,
    kernel: Box<dyn Kernel>,
    rng: StdRng,
    config: SimulatorConfig,
    kernel_launches: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Creates a simulator with the default configuration (seed 1, `Auto` backend).
    pub fn new() -> Self {
        Self::with_seed(SimulatorConfig::default().seed)
    }

    /// Creates a simulator with the default configuration and the given seed.
    pub fn with_seed(seed: u64) -> Self {
        let config = SimulatorConfig::default().with_seed(seed);
        Self::from_parts(kernels::auto(), config)
    }

    /// Creates a simulator from an explicit configuration.
    ///
    /// # Errors
    /// * `InvalidConfig` if the configuration does not validate.
    /// * `Backend` if the configured backend cannot be brought up.
    pub fn with_config(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let kernel = kernels::build(config.backend, &config)?;
        Ok(Self::from_parts(kernel, config))
    }

    fn from_parts(kernel: Box<dyn Kernel>, config: SimulatorConfig) -> Self {
        debug!(backend = %kernel.backend(), seed = config.seed, "simulator created");
        Self {
            store: AmplitudeStore::new(),
            fusion: FusionBuffer::new(),
            kernel,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            kernel_launches: 0,
        }
    }

    /// Number of allocated qubits.
    pub fn num_qubits(&self) -> usize {
        self.store.num_qubits()
    }

    /// The concrete backend currently bound.
    pub fn backend(&self) -> Backend {
        self.kernel.backend()
    }

    /// The active configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Gates buffered and not yet applied.
    pub fn pending_gates(&self) -> usize {
        self.fusion.len()
    }

    /// Kernel calls issued since construction.
    pub fn kernel_launches(&self) -> u64 {
        self.kernel_launches
    }

    /// Amplitudes held by the live vector plus the recycled scratch buffers.
    pub fn memory_footprint(&self) -> usize {
        self.store.footprint()
    }

    /// Allocates `id` in |0>.
    ///
    /// # Errors
    /// * `DuplicateId` if `id` is already allocated.
    pub fn allocate(&mut self, id: QubitId) -> Result<()> {
        self.store.allocate(id)
    }

    /// Releases `id`, which must be in a computational basis state.
    ///
    /// # Errors
    /// * `UnknownId` if `id` is not allocated.
    /// * `NotClassical` if the qubit is in superposition or entangled.
    pub fn deallocate(&mut self, id: QubitId) -> Result<()> {
        self.run()?;
        self.store.deallocate(id, self.config.tolerance)
    }

    /// Whether `id` is in a computational basis state within `tolerance`.
    pub fn is_classical(&mut self, id: QubitId, tolerance: f64) -> Result<bool> {
        self.run()?;
        let position = self.store.position(id)?;
        Ok(self.store.is_classical(position, tolerance))
    }

    /// Classical value of `id`, decided by the first amplitude above `tolerance`.
    ///
    /// # Errors
    /// * `UnknownId` if `id` is not allocated.
    /// * `InternalConsistency` if no amplitude exceeds `tolerance`.
    pub fn get_classical_value(&mut self, id: QubitId, tolerance: f64) -> Result<bool> {
        self.run()?;
        let position = self.store.position(id)?;
        self.store.classical_value(position, tolerance)
    }

    /// Queues `matrix` on `targets`, conditioned on every qubit in `controls`
    /// being |1>.
    ///
    /// Bit `b` of the matrix index is the value of `targets[b]`. The gate is
    /// buffered in the fusion window and applied no later than the next query
    /// or [`run`](Self::run).
    ///
    /// # Errors
    /// * `LengthMismatch` if `matrix` is not 2^|targets| square.
    /// * `InvalidOperation` for empty targets or repeated ids.
    /// * `UnknownId` for unallocated ids.
    pub fn apply_gate(&mut self, matrix: &GateMatrix, targets: &[QubitId], controls: &[QubitId]) -> Result<()> {
        self.validate_gate(matrix, targets, controls)?;

        let q = self.fusion.projected_num_qubits(targets, controls);
        let (min, max) = (self.config.fusion_min_qubits, self.config.fusion_max_qubits);
        if (min..=max).contains(&q) {
            self.fusion.insert(matrix.clone(), targets.to_vec(), controls.to_vec());
        } else if q > max || q.saturating_sub(targets.len()) > self.fusion.num_qubits() {
            self.run()?;
            self.fusion.insert(matrix.clone(), targets.to_vec(), controls.to_vec());
        } else {
            self.fusion.insert(matrix.clone(), targets.to_vec(), controls.to_vec());
        }

        if !self.config.gate_fusion {
            self.run()?;
        }
        Ok(())
    }

    fn validate_gate(&self, matrix: &GateMatrix, targets: &[QubitId], controls: &[QubitId]) -> Result<()> {
        if targets.is_empty() {
            return Err(SimError::InvalidOperation { message: "gate has no target qubits".to_string() });
        }
        let expected = 1usize << targets.len();
        if matrix.dim() != expected {
            return Err(SimError::LengthMismatch { what: "gate matrix dimension", expected, actual: matrix.dim() });
        }
        let mut seen = BTreeSet::new();
        for &id in targets.iter().chain(controls) {
            if !seen.insert(id) {
                return Err(SimError::InvalidOperation {
                    message: format!("qubit {} appears more than once among targets and controls", id),
                });
            }
            self.store.position(id)?;
        }
        Ok(())
    }

    /// Applies all pending gates as one fused operator.
    pub fn run(&mut self) -> Result<()> {
        let Some(op) = self.fusion.fuse() else {
            return Ok(());
        };
        let fused_gates = self.fusion.len();
        self.fusion.clear();

        let positions = self.store.positions_of(&op.targets)?;
        let ctrl_mask = self.store.mask_of(&op.controls)?;
        let task = KernelTask { matrix: &op.matrix, positions: &positions, ctrl_mask };
        let (state, pool) = self.store.parts_mut();
        self.kernel.apply(state, pool, &task)?;
        self.kernel_launches += 1;
        trace!(
            fused_gates,
            qubits = op.targets.len(),
            controls = op.controls.len(),
            backend = %self.kernel.backend(),
            "flushed fused operator"
        );
        Ok(())
    }

    /// Flushes, then binds the kernel for `backend`.
    ///
    /// # Errors
    /// * `Backend` if an offload queue cannot be created; the previous
    ///   backend stays bound.
    pub fn select_backend(&mut self, backend: Backend) -> Result<()> {
        self.run()?;
        let kernel = kernels::build(backend, &self.config)?;
        info!(requested = %backend, bound = %kernel.backend(), threaded = backend.is_threaded(), "backend selected");
        self.kernel = kernel;
        self.config.backend = backend;
        Ok(())
    }

    /// Flushes and exposes the position map and amplitudes.
    pub fn cheat(&mut self) -> Result<StateSnapshot<'_>> {
        self.run()?;
        Ok(StateSnapshot::new(self.store.positions().clone(), self.store.amplitudes()))
    }

    /// Processes an operation stream in order, returning the outcome of every
    /// measured qubit in the order measured.
    pub fn receive<I>(&mut self, ops: I) -> Result<Vec<(QubitId, bool)>>
    where
        I: IntoIterator<Item = Operation>,
    {
        let mut outcomes = Vec::new();
        for op in ops {
            match op {
                Operation::Allocate(id) => self.allocate(id)?,
                Operation::Deallocate(id) => self.deallocate(id)?,
                Operation::Gate { matrix, targets, controls } => self.apply_gate(&matrix, &targets, &controls)?,
                Operation::Measure { targets } => {
                    let bits = self.measure(&targets)?;
                    outcomes.extend(targets.into_iter().zip(bits));
                }
                Operation::Flush => self.run()?,
            }
        }
        Ok(outcomes)
    }

    /// Fails with `InvalidMapping` unless `ids` is a permutation of all
    /// allocated qubits.
    pub(crate) fn check_full_mapping(&self, ids: &[QubitId]) -> Result<()> {
        if ids.len() != self.store.num_qubits() {
            return Err(SimError::InvalidMapping {
                message: format!("{} ids given for {} allocated qubits", ids.len(), self.store.num_qubits()),
            });
        }
        let mut seen = BTreeSet::new();
        for &id in ids {
            if !self.store.contains(id) {
                return Err(SimError::InvalidMapping { message: format!("qubit {} is not allocated", id) });
            }
            if !seen.insert(id) {
                return Err(SimError::InvalidMapping { message: format!("qubit {} is listed twice", id) });
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &AmplitudeStore {
        &self.store
    }
}
