//! Work-item functions.
//!
//! A [`WorkItem`] is the execution context of one logical GPU thread. The
//! scheduler builds a fresh one for every work-item of every phase and
//! passes it by reference to the kernel; nothing is kept in thread-local
//! storage. Out-of-range dimensions follow the usual convention: ids
//! report 0 and sizes report 1.

use crate::scheduler::grid::WorkGroupGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    work_dim: u32,
    group_id: [u32; 3],
    local_id: [u32; 3],
    local_size: [u32; 3],
    num_groups: [u32; 3],
    generation: u32,
}

impl WorkItem {
    pub fn new(grid: &WorkGroupGrid, group_id: [u32; 3], local_id: [u32; 3], generation: u32) -> Self {
        Self {
            work_dim: grid.work_dim(),
            group_id,
            local_id,
            local_size: grid.local_size(),
            num_groups: grid.num_groups(),
            generation,
        }
    }

    #[inline]
    fn component(values: &[u32; 3], dim: u32, fallback: u32) -> u32 {
        values.get(dim as usize).copied().unwrap_or(fallback)
    }

    pub fn get_work_dim(&self) -> u32 {
        self.work_dim
    }

    pub fn get_global_id(&self, dim: u32) -> usize {
        if dim >= 3 {
            return 0;
        }
        let d = dim as usize;
        self.group_id[d] as usize * self.local_size[d] as usize + self.local_id[d] as usize
    }

    pub fn get_local_id(&self, dim: u32) -> usize {
        Self::component(&self.local_id, dim, 0) as usize
    }

    pub fn get_group_id(&self, dim: u32) -> usize {
        Self::component(&self.group_id, dim, 0) as usize
    }

    pub fn get_local_size(&self, dim: u32) -> usize {
        Self::component(&self.local_size, dim, 1) as usize
    }

    pub fn get_num_groups(&self, dim: u32) -> usize {
        Self::component(&self.num_groups, dim, 1) as usize
    }

    /// Launched size: whole work-groups, so it may exceed the requested size
    /// when that is not a multiple of the local size.
    pub fn get_global_size(&self, dim: u32) -> usize {
        self.get_num_groups(dim) * self.get_local_size(dim)
    }

    pub fn get_global_offset(&self, _dim: u32) -> usize {
        0
    }

    /// Row-major (x fastest) index of the work-item within its group.
    pub fn get_local_linear_id(&self) -> usize {
        let [x, y, z] = self.local_id.map(|v| v as usize);
        let [sx, sy, _] = self.local_size.map(|v| v as usize);
        (z * sy + y) * sx + x
    }

    pub fn get_global_linear_id(&self) -> usize {
        let (gx, gy) = (self.get_global_size(0), self.get_global_size(1));
        (self.get_global_id(2) * gy + self.get_global_id(1)) * gx + self.get_global_id(0)
    }

    /// Number of barriers the group has passed before this call.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
