// src/simulation/kernels/offload.rs

//! Accelerator-style kernels driven through a device queue.
//!
//! The queue is a dedicated rayon pool owned by the backend. Each call stages
//! the state into a device buffer, launches the kernel on the queue, blocks
//! until the launch completes and writes the result back to the host vector.

use super::{Backend, GroupLayout, GroupView, Kernel, KernelTask, gather_amplitude};
use crate::core::buffers::{BufferPool, copy_amplitudes};
use crate::core::constants::OFFLOAD_WORK_GROUP_SIZE;
use crate::core::{Result, SimError};
use num_complex::Complex64;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use tracing::{debug, trace};

/// Launch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OffloadVariant {
    /// One work item per amplitude.
    FlatGrid,
    /// Work groups of `OFFLOAD_WORK_GROUP_SIZE` amplitude groups.
    WorkGroups,
}

pub(crate) struct OffloadKernel {
    variant: OffloadVariant,
    queue: ThreadPool,
}

impl fmt::Debug for OffloadKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffloadKernel")
            .field("variant", &self.variant)
            .field("queue_threads", &self.queue.current_num_threads())
            .finish()
    }
}

impl OffloadKernel {
    /// Brings up the device queue. `threads == 0` sizes it to the machine.
    pub(crate) fn new(variant: OffloadVariant, threads: usize) -> Result<Self> {
        let queue = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("svsim-offload-{}", i))
            .build()
            .map_err(|e| SimError::Backend { message: format!("failed to create device queue: {}", e) })?;
        debug!(?variant, threads = queue.current_num_threads(), "device queue ready");
        Ok(Self { variant, queue })
    }
}

impl Kernel for OffloadKernel {
    fn backend(&self) -> Backend {
        match self.variant {
            OffloadVariant::FlatGrid => Backend::OffloadNvidia,
            OffloadVariant::WorkGroups => Backend::OffloadIntel,
        }
    }

    fn apply(&self, state: &mut Vec<Complex64>, pool: &mut BufferPool, task: &KernelTask<'_>) -> Result<()> {
        let layout = GroupLayout::new(task.positions, state.len());

        // Stage host -> device.
        let device_in = pool.take_copy(state);
        let mut device_out = pool.take_zeroed(state.len());

        let src = device_in.as_slice();
        let dst = device_out.as_mut_slice();
        match self.variant {
            OffloadVariant::FlatGrid => {
                trace!(work_items = dst.len(), "launching flat grid");
                self.queue.install(|| {
                    dst.par_iter_mut()
                        .enumerate()
                        .for_each(|(i, out)| *out = gather_amplitude(src, i, &layout, task));
                });
            }
            OffloadVariant::WorkGroups => {
                let num_work_groups = layout.num_groups().div_ceil(OFFLOAD_WORK_GROUP_SIZE);
                trace!(num_work_groups, group_size = OFFLOAD_WORK_GROUP_SIZE, "launching work groups");
                let view = GroupView::new(dst);
                self.queue.install(|| {
                    (0..num_work_groups).into_par_iter().for_each(|wg| {
                        let first = wg * OFFLOAD_WORK_GROUP_SIZE;
                        let last = (first + OFFLOAD_WORK_GROUP_SIZE).min(layout.num_groups());
                        for g in first..last {
                            run_group(src, view, &layout, task, layout.base(g));
                        }
                    });
                });
            }
        }

        // Device -> host.
        copy_amplitudes(state, &device_out);
        pool.recycle(device_out);
        pool.recycle(device_in);
        Ok(())
    }
}

/// One work item of the work-group launch: updates the whole group at `base`.
#[inline]
fn run_group(src: &[Complex64], dst: GroupView, layout: &GroupLayout, task: &KernelTask<'_>, base: usize) {
    let offsets = layout.offsets();
    let active = base & task.ctrl_mask == task.ctrl_mask;
    for (r, &out_off) in offsets.iter().enumerate() {
        let value = if active {
            task.matrix
                .row(r)
                .iter()
                .zip(offsets)
                .fold(Complex64::new(0.0, 0.0), |acc, (m, &off)| acc + m * src[base | off])
        } else {
            src[base | out_off]
        };
        // SAFETY: each group is owned by exactly one work item.
        unsafe { dst.write(base | out_off, value) };
    }
}
