// src/simulation/kernels/scalar.rs

//! Out-of-place gather kernel: every output amplitude is computed from the
//! untouched input, then the buffers are swapped.

use super::{Backend, GroupLayout, Kernel, KernelTask, gather_amplitude};
use crate::core::Result;
use crate::core::buffers::BufferPool;
use num_complex::Complex64;
use rayon::prelude::*;
use std::mem;

#[derive(Debug)]
pub(crate) struct ScalarKernel {
    threaded: bool,
}

impl ScalarKernel {
    pub(crate) fn new(threaded: bool) -> Self {
        Self { threaded }
    }
}

impl Kernel for ScalarKernel {
    fn backend(&self) -> Backend {
        if self.threaded { Backend::ScalarThreaded } else { Backend::ScalarSerial }
    }

    fn apply(&self, state: &mut Vec<Complex64>, pool: &mut BufferPool, task: &KernelTask<'_>) -> Result<()> {
        let layout = GroupLayout::new(task.positions, state.len());
        let mut next = pool.take_zeroed(state.len());
        let src = state.as_slice();
        if self.threaded {
            next.par_iter_mut()
                .enumerate()
                .for_each(|(i, out)| *out = gather_amplitude(src, i, &layout, task));
        } else {
            for (i, out) in next.iter_mut().enumerate() {
                *out = gather_amplitude(src, i, &layout, task);
            }
        }
        let old = mem::replace(state, next);
        pool.recycle(old);
        Ok(())
    }
}
