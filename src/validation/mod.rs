// src/validation/mod.rs

//! Checks callers can run on amplitude vectors and gate matrices.
//!
//! The simulator itself never enforces unitarity or normalization on the hot
//! path; these helpers exist for hosts and tests that want to.

use crate::core::constants::PARALLEL_MIN_LEN;
use crate::core::{GateMatrix, Result, SimError};
use num_complex::Complex64;
use rayon::prelude::*;

// Default tolerance values (can be overridden by caller)
const DEFAULT_NORM_TOLERANCE: f64 = 1e-9;
const DEFAULT_UNITARITY_TOLERANCE: f64 = 1e-9;

/// Checks if the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `amplitudes` - The amplitude vector to check.
/// * `tolerance` - Allowed deviation from 1.0, defaults to 1e-9.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(SimError::Incoherence)` carrying the observed squared norm otherwise.
pub fn check_normalization(amplitudes: &[Complex64], tolerance: Option<f64>) -> Result<()> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_NORM_TOLERANCE);
    let norm: f64 = amplitudes
        .par_iter()
        .with_min_len(PARALLEL_MIN_LEN)
        .map(|a| a.norm_sqr())
        .sum();
    if (norm - 1.0).abs() > effective_tolerance {
        Err(SimError::Incoherence { norm })
    } else {
        Ok(())
    }
}

/// Checks `M^† M ≈ I` entry-wise.
///
/// # Returns
/// * `Err(SimError::InvalidOperation)` naming the worst deviation if the
///   matrix is not unitary within tolerance.
pub fn check_unitary(matrix: &GateMatrix, tolerance: Option<f64>) -> Result<()> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_UNITARITY_TOLERANCE);
    let dim = matrix.dim();
    let mut worst = 0.0f64;
    for r in 0..dim {
        for c in 0..dim {
            let product: Complex64 = (0..dim).map(|k| matrix.get(k, r).conj() * matrix.get(k, c)).sum();
            let expected = if r == c { 1.0 } else { 0.0 };
            worst = worst.max((product - expected).norm());
        }
    }
    if worst > effective_tolerance {
        return Err(SimError::InvalidOperation {
            message: format!("matrix is not unitary: max |(M^dag M - I)_ij| = {:.3e}", worst),
        });
    }
    Ok(())
}

/// Performs basic validation of a full register state: the vector must hold
/// `2^num_qubits` amplitudes and be normalized.
pub fn validate_state(amplitudes: &[Complex64], num_qubits: usize, norm_tolerance: Option<f64>) -> Result<()> {
    let expected = 1usize << num_qubits;
    if amplitudes.len() != expected {
        return Err(SimError::LengthMismatch { what: "state vector", expected, actual: amplitudes.len() });
    }
    check_normalization(amplitudes, norm_tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn normalization_reports_observed_norm() {
        let ok = [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(0.0, FRAC_1_SQRT_2)];
        assert!(check_normalization(&ok, None).is_ok());

        let bad = [Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)];
        match check_normalization(&bad, None) {
            Err(SimError::Incoherence { norm }) => assert!((norm - 2.0).abs() < 1e-12),
            other => panic!("expected Incoherence, got {:?}", other),
        }
    }

    #[test]
    fn unitary_check() -> Result<()> {
        assert!(check_unitary(&GateMatrix::pauli_y(), None).is_ok());
        assert!(check_unitary(&GateMatrix::identity(3), None).is_ok());
        let skewed = GateMatrix::new(2, vec![Complex64::new(1.0, 0.0); 4])?;
        assert!(matches!(check_unitary(&skewed, None), Err(SimError::InvalidOperation { .. })));
        Ok(())
    }

    #[test]
    fn validate_state_checks_length() {
        let amps = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        assert!(validate_state(&amps, 1, None).is_ok());
        assert!(matches!(validate_state(&amps, 2, None), Err(SimError::LengthMismatch { .. })));
    }
}
