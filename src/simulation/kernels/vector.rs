// src/simulation/kernels/vector.rs

//! In-place group kernel. The amplitudes of one group are gathered into
//! split real/imaginary lanes and multiplied by a matrix stored in the same
//! split layout, `LANES` entries at a time.

use super::{Backend, GroupLayout, GroupView, Kernel, KernelTask};
use crate::core::buffers::BufferPool;
use crate::core::{GateMatrix, Result};
use num_complex::Complex64;
use rayon::prelude::*;

const LANES: usize = 4;

/// Row-major matrix with real and imaginary parts in separate arrays.
#[derive(Debug)]
struct SplitMatrix {
    dim: usize,
    re: Vec<f64>,
    im: Vec<f64>,
}

impl SplitMatrix {
    fn new(matrix: &GateMatrix) -> Self {
        let (re, im) = matrix.as_slice().iter().map(|c| (c.re, c.im)).unzip();
        Self { dim: matrix.dim(), re, im }
    }

    /// Row `r` times the vector held in `lanes`.
    #[inline]
    fn mul_row(&self, r: usize, lanes: &Lanes) -> Complex64 {
        let row = r * self.dim..(r + 1) * self.dim;
        let (mre, mim) = (&self.re[row.clone()], &self.im[row]);

        let mut acc_re = [0.0f64; LANES];
        let mut acc_im = [0.0f64; LANES];
        let blocks = mre
            .chunks_exact(LANES)
            .zip(mim.chunks_exact(LANES))
            .zip(lanes.re.chunks_exact(LANES).zip(lanes.im.chunks_exact(LANES)));
        for ((ar, ai), (vr, vi)) in blocks {
            for l in 0..LANES {
                acc_re[l] += ar[l] * vr[l] - ai[l] * vi[l];
                acc_im[l] += ar[l] * vi[l] + ai[l] * vr[l];
            }
        }

        let mut re: f64 = acc_re.iter().sum();
        let mut im: f64 = acc_im.iter().sum();
        for k in self.dim - self.dim % LANES..self.dim {
            re += mre[k] * lanes.re[k] - mim[k] * lanes.im[k];
            im += mre[k] * lanes.im[k] + mim[k] * lanes.re[k];
        }
        Complex64::new(re, im)
    }
}

/// Per-worker scratch holding one group's amplitudes.
#[derive(Debug, Clone)]
struct Lanes {
    re: Vec<f64>,
    im: Vec<f64>,
}

impl Lanes {
    fn new(dim: usize) -> Self {
        Self { re: vec![0.0; dim], im: vec![0.0; dim] }
    }

    #[inline]
    fn load(&mut self, k: usize, value: Complex64) {
        self.re[k] = value.re;
        self.im[k] = value.im;
    }
}

#[derive(Debug)]
pub(crate) struct VectorKernel {
    threaded: bool,
}

impl VectorKernel {
    pub(crate) fn new(threaded: bool) -> Self {
        Self { threaded }
    }
}

impl Kernel for VectorKernel {
    fn backend(&self) -> Backend {
        if self.threaded { Backend::VectorThreaded } else { Backend::VectorSerial }
    }

    fn apply(&self, state: &mut Vec<Complex64>, _pool: &mut BufferPool, task: &KernelTask<'_>) -> Result<()> {
        let layout = GroupLayout::new(task.positions, state.len());
        let matrix = SplitMatrix::new(task.matrix);
        let offsets = layout.offsets();
        let ctrl_mask = task.ctrl_mask;

        if self.threaded {
            let view = GroupView::new(state);
            (0..layout.num_groups()).into_par_iter().for_each_init(
                || Lanes::new(matrix.dim),
                |lanes, g| {
                    let base = layout.base(g);
                    if base & ctrl_mask != ctrl_mask {
                        return;
                    }
                    // SAFETY: groups partition the index space, so group `g`
                    // is read and written by this worker only.
                    unsafe {
                        for (k, &off) in offsets.iter().enumerate() {
                            lanes.load(k, view.read(base | off));
                        }
                        for (r, &off) in offsets.iter().enumerate() {
                            view.write(base | off, matrix.mul_row(r, lanes));
                        }
                    }
                },
            );
        } else {
            let mut lanes = Lanes::new(matrix.dim);
            for g in 0..layout.num_groups() {
                let base = layout.base(g);
                if base & ctrl_mask != ctrl_mask {
                    continue;
                }
                for (k, &off) in offsets.iter().enumerate() {
                    lanes.load(k, state[base | off]);
                }
                for (r, &off) in offsets.iter().enumerate() {
                    state[base | off] = matrix.mul_row(r, &lanes);
                }
            }
        }
        Ok(())
    }
}
