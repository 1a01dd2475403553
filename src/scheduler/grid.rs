//! Work decomposition: from a global size to a grid of work-groups.

use crate::error::{Error, Result};

/// Work-group shapes for 1, 2 and 3 dimensional launches.
///
/// Components are doubled round-robin over the active axes until the
/// product reaches `subgroup_size`, so the product of every shape equals the
/// subgroup size exactly. A subgroup size of 4 yields `[4,1,1]`, `[2,2,1]`
/// and `[2,2,1]` again for three.
pub fn work_group_shape(subgroup_size: u32) -> Result<[[u32; 3]; 3]> {
    if !subgroup_size.is_power_of_two() {
        return Err(Error::config(format!(
            "work-group size {} is not a power of two",
            subgroup_size
        )));
    }

    let mut shapes = [[1u32; 3]; 3];
    for (dim, shape) in (1..=3usize).zip(shapes.iter_mut()) {
        let mut axis = 0;
        while shape.iter().product::<u32>() < subgroup_size {
            shape[axis] *= 2;
            axis = (axis + 1) % dim;
        }
    }
    Ok(shapes)
}

/// Launch geometry of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGroupGrid {
    work_dim: u32,
    works: [u32; 3],
    local_size: [u32; 3],
    num_groups: [u32; 3],
    total_groups: usize,
    group_len: usize,
}

impl WorkGroupGrid {
    /// `works` and `local_size` are padded with 1 past `work_dim`.
    ///
    /// Fails with [`Error::OutOfRange`] when the launched work-items cannot
    /// be counted in a `usize`, so every linear id of the grid fits.
    pub fn new(works: [u32; 3], local_size: [u32; 3], work_dim: u32) -> Result<Self> {
        let mut num_groups = [0u32; 3];
        for ((n, &w), &l) in num_groups.iter_mut().zip(&works).zip(&local_size) {
            *n = w.div_ceil(l.max(1));
        }

        let too_large = || {
            Error::out_of_range(format!(
                "global size {:?} with work-group size {:?} overflows the grid",
                works, local_size
            ))
        };
        let total_groups = checked_product(num_groups).ok_or_else(too_large)?;
        let group_len = checked_product(local_size).ok_or_else(too_large)?;
        total_groups.checked_mul(group_len).ok_or_else(too_large)?;

        Ok(Self {
            work_dim,
            works,
            local_size,
            num_groups,
            total_groups,
            group_len,
        })
    }

    pub fn work_dim(&self) -> u32 {
        self.work_dim
    }

    /// Requested global size.
    pub fn works(&self) -> [u32; 3] {
        self.works
    }

    pub fn local_size(&self) -> [u32; 3] {
        self.local_size
    }

    pub fn num_groups(&self) -> [u32; 3] {
        self.num_groups
    }

    pub fn total_groups(&self) -> usize {
        self.total_groups
    }

    /// Work-items per group.
    pub fn group_len(&self) -> usize {
        self.group_len
    }

    /// Work-items launched, padding of partial groups included.
    pub fn total_work_items(&self) -> usize {
        self.total_groups * self.group_len
    }

    /// 3-D id of the `linear`-th group, x fastest.
    pub fn group_id(&self, linear: usize) -> [u32; 3] {
        unflatten(linear, self.num_groups)
    }

    /// 3-D local id of the `linear`-th work-item of a group, x fastest.
    pub fn local_id(&self, linear: usize) -> [u32; 3] {
        unflatten(linear, self.local_size)
    }
}

fn checked_product(extent: [u32; 3]) -> Option<usize> {
    extent
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n as usize))
}

fn unflatten(linear: usize, extent: [u32; 3]) -> [u32; 3] {
    let [ex, ey, _] = extent.map(|e| e.max(1) as usize);
    [
        (linear % ex) as u32,
        ((linear / ex) % ey) as u32,
        (linear / (ex * ey)) as u32,
    ]
}
