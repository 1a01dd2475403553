//! Barriers and memory fences.
//!
//! On the CPU path a work-group never spans threads, so a barrier is a
//! phase boundary: every work-item finishes phase `k` before any starts
//! phase `k + 1`. The runner applies the barrier's fence flags between
//! phases.

use std::sync::atomic::{compiler_fence, fence, Ordering};

pub const CLK_LOCAL_MEM_FENCE: u32 = 1;
pub const CLK_GLOBAL_MEM_FENCE: u32 = 2;

pub(crate) const FENCE_MASK: u32 = CLK_LOCAL_MEM_FENCE | CLK_GLOBAL_MEM_FENCE;

/// Orders loads and stores of the given spaces.
///
/// Local memory is only touched by the thread running the group, so a
/// compiler fence is enough for it.
pub fn mem_fence(flags: u32) {
    if flags & CLK_GLOBAL_MEM_FENCE != 0 {
        fence(Ordering::SeqCst);
    } else if flags & CLK_LOCAL_MEM_FENCE != 0 {
        compiler_fence(Ordering::SeqCst);
    }
}

pub fn read_mem_fence(flags: u32) {
    if flags & CLK_GLOBAL_MEM_FENCE != 0 {
        fence(Ordering::Acquire);
    } else if flags & CLK_LOCAL_MEM_FENCE != 0 {
        compiler_fence(Ordering::Acquire);
    }
}

pub fn write_mem_fence(flags: u32) {
    if flags & CLK_GLOBAL_MEM_FENCE != 0 {
        fence(Ordering::Release);
    } else if flags & CLK_LOCAL_MEM_FENCE != 0 {
        compiler_fence(Ordering::Release);
    }
}
