// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod matrix;
pub(crate) mod state;
pub(crate) mod buffers;

pub mod constants;

pub use constants::DEFAULT_TOLERANCE;
pub use error::{QubitId, Result, SimError};
pub use matrix::GateMatrix;
pub(crate) use state::AmplitudeStore;
