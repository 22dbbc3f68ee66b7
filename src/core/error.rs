//! Error handling logic

use std::fmt;
use thiserror::Error;

/// Caller-assigned handle of one simulated qubit.
///
/// The id is independent of the bit position the qubit currently occupies in
/// the amplitude vector; positions are reassigned as other qubits come and go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QubitId(pub u64);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u64> for QubitId {
    fn from(id: u64) -> Self {
        QubitId(id)
    }
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised by the simulator.
///
/// Every variant reflects a contract violation by the caller (wrong id, wrong
/// ordering, premature deallocation); none of them is transient and nothing is
/// retried internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The id is already allocated.
    #[error("Qubit {id} is already allocated; qubit ids must be unique")]
    DuplicateId {
        /// Offending id
        id: QubitId,
    },

    /// The id is not allocated.
    #[error("Qubit {id} is not allocated")]
    UnknownId {
        /// Offending id
        id: QubitId,
    },

    /// Deallocation of a qubit that is not in a computational basis state.
    #[error("Qubit {id} has not been measured or uncomputed and cannot be deallocated")]
    NotClassical {
        /// Offending id
        id: QubitId,
    },

    /// A forced collapse onto an outcome with vanishing probability.
    #[error("Invalid collapse: requested outcome has probability {probability:e}")]
    ZeroProbability {
        /// Probability mass of the requested outcome
        probability: f64,
    },

    /// Two inputs that must agree in length do not.
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which inputs disagree
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Provided length
        actual: usize,
    },

    /// Ids are not a permutation of all allocated qubits.
    #[error("Invalid mapping: {message}")]
    InvalidMapping {
        /// InvalidMapping failure message
        message: String,
    },

    /// A prior invariant was violated.
    #[error("Internal consistency error: {message}")]
    InternalConsistency {
        /// InternalConsistency failure message
        message: String,
    },

    /// A gate or operator term is malformed.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// InvalidOperation failure message
        message: String,
    },

    /// The simulator configuration is unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// InvalidConfig failure message
        message: String,
    },

    /// A kernel backend could not be brought up.
    #[error("Backend error: {message}")]
    Backend {
        /// Backend failure message
        message: String,
    },

    /// State vector norm deviates from 1.
    #[error("State vector normalization failed: sum |a_i|^2 = {norm}")]
    Incoherence {
        /// Observed squared norm
        norm: f64,
    },
}
