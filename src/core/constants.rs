//! Numeric constants shared across the simulator.

/// Tolerance for classical-value checks, collapse and series truncation.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Smallest fused operator (in qubits) the fusion window accepts.
pub const DEFAULT_FUSION_MIN_QUBITS: usize = 2;

/// Largest fused operator (in qubits) before the pending gates are flushed.
pub const DEFAULT_FUSION_MAX_QUBITS: usize = 5;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 1;

/// Vectors shorter than this are traversed serially by whole-vector passes.
pub const PARALLEL_MIN_LEN: usize = 1 << 12;

/// Amplitude groups per work group for the nd-range offload launch.
pub const OFFLOAD_WORK_GROUP_SIZE: usize = 64;
