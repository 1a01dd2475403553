//! Execution of whole work-groups on one worker.

use super::grid::WorkGroupGrid;
use crate::cl::synchronization::mem_fence;
use crate::cl::work_item::WorkItem;
use crate::kernel::{LocalMemory, Phase};

/// Per-task state for running work-groups one after another.
///
/// A task owns one local-memory region and one private slot per work-item;
/// both are reset before every group. Work-items of a group run one phase
/// at a time in row-major local order, so everything written before a
/// barrier is visible to every work-item after it. The barrier generation
/// a work-item sees is the index of the phase it runs in.
pub(crate) struct GroupRunner<'k, A, P> {
    grid: &'k WorkGroupGrid,
    phases: &'k [Phase<A, P>],
    barriers: &'k [u32],
    local: LocalMemory,
    private: Vec<P>,
    local_ids: Vec<[u32; 3]>,
}

impl<'k, A, P: Default> GroupRunner<'k, A, P> {
    /// `barriers[k]` holds the fence flags of the barrier after phase `k`.
    pub(crate) fn new(
        grid: &'k WorkGroupGrid,
        phases: &'k [Phase<A, P>],
        barriers: &'k [u32],
        local: LocalMemory,
    ) -> Self {
        let len = grid.group_len();
        Self {
            grid,
            phases,
            barriers,
            local,
            private: (0..len).map(|_| P::default()).collect(),
            local_ids: (0..len).map(|i| grid.local_id(i)).collect(),
        }
    }

    pub(crate) fn run_group(&mut self, args: &A, linear_group: usize) {
        let group_id = self.grid.group_id(linear_group);

        self.local.clear();
        for slot in &mut self.private {
            *slot = P::default();
        }

        for (k, phase) in self.phases.iter().enumerate() {
            let generation = k as u32;
            for (slot, &local_id) in self.private.iter_mut().zip(&self.local_ids) {
                let item = WorkItem::new(self.grid, group_id, local_id, generation);
                phase(&item, args, &self.local, slot);
            }

            if let Some(&flags) = self.barriers.get(k) {
                mem_fence(flags);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl::synchronization::CLK_LOCAL_MEM_FENCE;
    use crate::kernel::boxed_phase;
    use crate::memory::SystemMemoryResource;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn local(bytes: usize) -> LocalMemory {
        LocalMemory::new(Arc::new(SystemMemoryResource::new()), bytes).unwrap()
    }

    #[test]
    fn test_phases_run_in_lockstep() {
        let grid = WorkGroupGrid::new([8, 1, 1], [4, 1, 1], 1).unwrap();
        let log = Mutex::new(Vec::new());
        let phases: Vec<Phase<Mutex<Vec<(u32, usize)>>, ()>> = vec![
            boxed_phase(|item, log: &Mutex<Vec<(u32, usize)>>, _, _| {
                log.lock().unwrap().push((item.generation(), item.get_local_id(0)))
            }),
            boxed_phase(|item, log: &Mutex<Vec<(u32, usize)>>, _, _| {
                log.lock().unwrap().push((item.generation(), item.get_local_id(0)))
            }),
        ];
        let barriers = [CLK_LOCAL_MEM_FENCE];

        let mut runner = GroupRunner::new(&grid, &phases, &barriers, local(0));
        runner.run_group(&log, 1);

        let log = log.into_inner().unwrap();
        assert_eq!(
            log,
            vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2), (1, 3)]
        );
    }

    #[test]
    fn test_private_slots_reset_per_group() {
        let grid = WorkGroupGrid::new([4, 1, 1], [2, 1, 1], 1).unwrap();
        let seen = Mutex::new(Vec::new());
        let phases: Vec<Phase<Mutex<Vec<u32>>, u32>> = vec![
            boxed_phase(|_, _, _, slot: &mut u32| *slot += 5),
            boxed_phase(|_, seen: &Mutex<Vec<u32>>, _, slot: &mut u32| {
                seen.lock().unwrap().push(*slot)
            }),
        ];
        let barriers = [CLK_LOCAL_MEM_FENCE];

        let mut runner = GroupRunner::new(&grid, &phases, &barriers, local(0));
        runner.run_group(&seen, 0);
        runner.run_group(&seen, 1);

        assert_eq!(seen.into_inner().unwrap(), vec![5, 5, 5, 5]);
    }
}
