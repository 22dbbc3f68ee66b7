// src/simulation/config.rs

//! Simulator configuration

use super::kernels::Backend;
use crate::core::constants::{DEFAULT_FUSION_MAX_QUBITS, DEFAULT_FUSION_MIN_QUBITS, DEFAULT_SEED, DEFAULT_TOLERANCE};
use crate::core::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Largest fused operator the window may be configured for. A 2^k × 2^k
/// dense matrix beyond this is slower than applying the gates one by one.
const MAX_FUSION_QUBITS: usize = 12;

/// Configuration for a [`Simulator`](super::Simulator).
///
/// Deserializable so hosts can keep it in a JSON or TOML file; missing fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Seed of the measurement RNG.
    pub seed: u64,

    /// Kernel backend bound at construction.
    pub backend: Backend,

    /// Buffer gates and apply them as one fused operator.
    pub gate_fusion: bool,

    /// Lower bound of the fusion window, in qubits.
    pub fusion_min_qubits: usize,

    /// Upper bound of the fusion window, in qubits.
    pub fusion_max_qubits: usize,

    /// Tolerance used by deallocation, collapse and series truncation.
    pub tolerance: f64,

    /// Worker threads of the offload device queue (0 = one per core).
    pub offload_threads: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            backend: Backend::Auto,
            gate_fusion: true,
            fusion_min_qubits: DEFAULT_FUSION_MIN_QUBITS,
            fusion_max_qubits: DEFAULT_FUSION_MAX_QUBITS,
            tolerance: DEFAULT_TOLERANCE,
            offload_threads: 0,
        }
    }
}

impl SimulatorConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder: set the kernel backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Builder: enable/disable gate fusion
    pub fn with_gate_fusion(mut self, enable: bool) -> Self {
        self.gate_fusion = enable;
        self
    }

    /// Builder: set the fusion window
    pub fn with_fusion_window(mut self, min_qubits: usize, max_qubits: usize) -> Self {
        self.fusion_min_qubits = min_qubits;
        self.fusion_max_qubits = max_qubits;
        self
    }

    /// Builder: set the numeric tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder: set the offload queue width
    pub fn with_offload_threads(mut self, threads: usize) -> Self {
        self.offload_threads = threads;
        self
    }

    /// Checks the configuration for values the simulator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fusion_min_qubits == 0 {
            return Err(SimError::InvalidConfig { message: "fusion_min_qubits must be > 0".to_string() });
        }
        if self.fusion_min_qubits > self.fusion_max_qubits {
            return Err(SimError::InvalidConfig {
                message: format!(
                    "fusion window is empty: min {} > max {}",
                    self.fusion_min_qubits, self.fusion_max_qubits
                ),
            });
        }
        if self.fusion_max_qubits > MAX_FUSION_QUBITS {
            return Err(SimError::InvalidConfig {
                message: format!("fusion_max_qubits too large (max: {})", MAX_FUSION_QUBITS),
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(SimError::InvalidConfig {
                message: format!("tolerance must lie in (0, 1), got {}", self.tolerance),
            });
        }
        Ok(())
    }
}
