// src/simulation/kernels/mod.rs

//! Kernels that apply a dense (fused) operator with a control mask to the
//! amplitude vector.
//!
//! Every backend implements the same contract: for each index `i` whose
//! control bits are all set,
//!
//! ```text
//! psi'[i] = sum_j M[row(i)][j] * psi[(i & !target_mask) | offset(j)]
//! ```
//!
//! where `row(i)` collects the target bits of `i` in matrix bit order and
//! `offset(j)` scatters the bits of `j` back onto the target positions.
//! Indices failing the control mask are left untouched.

mod offload;
mod scalar;
mod vector;

use crate::core::buffers::BufferPool;
use crate::core::{GateMatrix, Result, SimError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::config::SimulatorConfig;
pub(crate) use offload::{OffloadKernel, OffloadVariant};
pub(crate) use scalar::ScalarKernel;
pub(crate) use vector::VectorKernel;

/// Kernel implementation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Out-of-place per-amplitude gather, one thread.
    ScalarSerial,
    /// Out-of-place per-amplitude gather on the rayon pool.
    ScalarThreaded,
    /// In-place per-group update on split real/imaginary lanes, one thread.
    VectorSerial,
    /// In-place per-group update on split lanes, groups spread over rayon.
    VectorThreaded,
    /// Device queue launching a flat grid, one work item per amplitude.
    OffloadNvidia,
    /// Device queue launching fixed-size work groups over amplitude groups.
    OffloadIntel,
    /// `VectorThreaded` when more than one worker thread is available,
    /// otherwise `VectorSerial`.
    #[default]
    Auto,
}

impl Backend {
    /// Every concrete backend, in declaration order.
    pub const CONCRETE: [Backend; 6] = [
        Backend::ScalarSerial,
        Backend::ScalarThreaded,
        Backend::VectorSerial,
        Backend::VectorThreaded,
        Backend::OffloadNvidia,
        Backend::OffloadIntel,
    ];

    /// Resolves `Auto` against the current rayon pool; concrete backends
    /// are returned unchanged.
    pub fn resolve(self) -> Backend {
        match self {
            Backend::Auto if rayon::current_num_threads() > 1 => Backend::VectorThreaded,
            Backend::Auto => Backend::VectorSerial,
            other => other,
        }
    }

    /// Whether kernel calls run on more than one thread.
    pub fn is_threaded(self) -> bool {
        !matches!(self.resolve(), Backend::ScalarSerial | Backend::VectorSerial)
    }

    fn name(self) -> &'static str {
        match self {
            Backend::ScalarSerial => "scalar-serial",
            Backend::ScalarThreaded => "scalar-threaded",
            Backend::VectorSerial => "vector-serial",
            Backend::VectorThreaded => "vector-threaded",
            Backend::OffloadNvidia => "offload-nvidia",
            Backend::OffloadIntel => "offload-intel",
            Backend::Auto => "auto",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Backend {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        std::iter::once(Backend::Auto)
            .chain(Backend::CONCRETE)
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SimError::InvalidConfig { message: format!("unknown backend '{}'", s) })
    }
}

/// One kernel invocation: the operator, its target positions in matrix bit
/// order, and the control mask over vector positions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KernelTask<'a> {
    pub(crate) matrix: &'a GateMatrix,
    pub(crate) positions: &'a [usize],
    pub(crate) ctrl_mask: usize,
}

/// Strategy bound once at backend selection.
pub(crate) trait Kernel: Send + Sync + fmt::Debug {
    fn backend(&self) -> Backend;

    /// Applies `task` to `state`. Scratch vectors come from and go back to `pool`.
    fn apply(&self, state: &mut Vec<Complex64>, pool: &mut BufferPool, task: &KernelTask<'_>) -> Result<()>;
}

/// Instantiates the kernel for `backend`.
pub(crate) fn build(backend: Backend, config: &SimulatorConfig) -> Result<Box<dyn Kernel>> {
    let kernel: Box<dyn Kernel> = match backend {
        Backend::ScalarSerial => Box::new(ScalarKernel::new(false)),
        Backend::ScalarThreaded => Box::new(ScalarKernel::new(true)),
        Backend::VectorSerial => Box::new(VectorKernel::new(false)),
        Backend::VectorThreaded => Box::new(VectorKernel::new(true)),
        Backend::OffloadNvidia => Box::new(OffloadKernel::new(OffloadVariant::FlatGrid, config.offload_threads)?),
        Backend::OffloadIntel => Box::new(OffloadKernel::new(OffloadVariant::WorkGroups, config.offload_threads)?),
        Backend::Auto => auto(),
    };
    Ok(kernel)
}

/// The kernel `Backend::Auto` resolves to.
pub(crate) fn auto() -> Box<dyn Kernel> {
    Box::new(VectorKernel::new(Backend::Auto.resolve() == Backend::VectorThreaded))
}

/// Index arithmetic shared by all kernels for one set of target positions.
///
/// A *group* is the set of `2^k` indices that differ only in the target
/// bits; groups are enumerated by inserting zeros at the sorted target
/// positions into a counter running over `[0, len >> k)`.
#[derive(Debug, Clone)]
pub(crate) struct GroupLayout {
    positions: Vec<usize>,
    sorted: Vec<usize>,
    offsets: Vec<usize>,
    target_mask: usize,
    num_groups: usize,
}

impl GroupLayout {
    pub(crate) fn new(positions: &[usize], len: usize) -> Self {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        let offsets = (0..1usize << positions.len())
            .map(|j| {
                positions
                    .iter()
                    .enumerate()
                    .fold(0usize, |acc, (b, &p)| acc | (((j >> b) & 1) << p))
            })
            .collect();
        Self {
            positions: positions.to_vec(),
            sorted,
            offsets,
            target_mask: positions.iter().fold(0usize, |m, &p| m | (1 << p)),
            num_groups: len >> positions.len(),
        }
    }

    pub(crate) fn num_groups(&self) -> usize {
        self.num_groups
    }

    /// `offsets()[j]` is the index offset of matrix column `j` within a group.
    pub(crate) fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// First index (all target bits clear) of group `g`.
    #[inline]
    pub(crate) fn base(&self, g: usize) -> usize {
        self.sorted
            .iter()
            .fold(g, |i, &p| ((i >> p) << (p + 1)) | (i & ((1 << p) - 1)))
    }

    /// Matrix row addressed by vector index `i`.
    #[inline]
    pub(crate) fn row(&self, i: usize) -> usize {
        self.positions
            .iter()
            .enumerate()
            .fold(0usize, |acc, (b, &p)| acc | (((i >> p) & 1) << b))
    }

    /// Group base of vector index `i`.
    #[inline]
    pub(crate) fn base_of(&self, i: usize) -> usize {
        i & !self.target_mask
    }
}

/// New value of amplitude `i` under `task`, read from `src`.
#[inline]
pub(crate) fn gather_amplitude(src: &[Complex64], i: usize, layout: &GroupLayout, task: &KernelTask<'_>) -> Complex64 {
    if i & task.ctrl_mask != task.ctrl_mask {
        return src[i];
    }
    let base = layout.base_of(i);
    task.matrix
        .row(layout.row(i))
        .iter()
        .zip(layout.offsets())
        .fold(Complex64::new(0.0, 0.0), |acc, (m, &off)| acc + m * src[base | off])
}

// Raw pointer into an amplitude buffer, shared across rayon workers that
// each touch a disjoint set of groups.
#[derive(Clone, Copy)]
pub(crate) struct GroupView {
    ptr: *mut Complex64,
    len: usize,
}

unsafe impl Send for GroupView {}
unsafe impl Sync for GroupView {}

impl GroupView {
    pub(crate) fn new(buf: &mut [Complex64]) -> Self {
        Self { ptr: buf.as_mut_ptr(), len: buf.len() }
    }

    /// # Safety
    /// No other thread may write index `i` concurrently.
    #[inline]
    pub(crate) unsafe fn read(&self, i: usize) -> Complex64 {
        debug_assert!(i < self.len);
        // SAFETY: in bounds, and the caller owns the group containing `i`.
        unsafe { *self.ptr.add(i) }
    }

    /// # Safety
    /// No other thread may access index `i` concurrently.
    #[inline]
    pub(crate) unsafe fn write(&self, i: usize, value: Complex64) {
        debug_assert!(i < self.len);
        // SAFETY: in bounds, and the caller owns the group containing `i`.
        unsafe { *self.ptr.add(i) = value }
    }
}
