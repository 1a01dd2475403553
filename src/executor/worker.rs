//! Worker threads of the CPU pool.

use super::panic_handler;
use super::task::Task;
use crossbeam_deque::{Injector, Steal, Stealer, Worker as WorkerQueue};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub type WorkerId = usize;

/// Counters of one worker, readable from any thread.
#[derive(Debug, Default)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub tasks_stolen: AtomicU64,
    pub tasks_panicked: AtomicU64,
    pub busy_time_ns: AtomicU64,
}

/// Shared queues a worker pulls from.
pub(crate) struct Sources {
    pub stealers: Vec<Stealer<Task>>,
    pub injector: Arc<Injector<Task>>,
    pub shutdown: Arc<AtomicBool>,
    pub pending_tasks: Arc<AtomicUsize>,
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub local_queue: WorkerQueue<Task>,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            local_queue: WorkerQueue::new_fifo(),
            state: Arc::new(WorkerState::default()),
        }
    }

    /// Run until shutdown. Queued tasks are drained first, so every
    /// dispatch task submitted before shutdown still reports back.
    pub fn run(&self, sources: Sources) {
        let mut idle_rounds = 0u32;

        loop {
            match self.next_task(&sources) {
                Some(task) => {
                    idle_rounds = 0;
                    self.execute(task);
                    sources.pending_tasks.fetch_sub(1, Ordering::Relaxed);
                }
                None if sources.shutdown.load(Ordering::Acquire) => break,
                None => Self::idle(&mut idle_rounds),
            }
        }

        tracing::trace!(worker = self.id, "worker exiting");
    }

    fn next_task(&self, sources: &Sources) -> Option<Task> {
        self.local_queue
            .pop()
            .or_else(|| Self::drain(|| sources.injector.steal_batch_and_pop(&self.local_queue)))
            .or_else(|| self.steal(&sources.stealers))
    }

    fn drain(mut attempt: impl FnMut() -> Steal<Task>) -> Option<Task> {
        loop {
            match attempt() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    // victims are visited round-robin from a random start
    fn steal(&self, stealers: &[Stealer<Task>]) -> Option<Task> {
        let n = stealers.len();
        if n <= 1 {
            return None;
        }

        let start = rand::thread_rng().gen_range(0..n);
        let task = (0..n)
            .map(|k| (start + k) % n)
            .filter(|&victim| victim != self.id)
            .find_map(|victim| {
                Self::drain(|| stealers[victim].steal_batch_and_pop(&self.local_queue))
            })?;

        self.state.tasks_stolen.fetch_add(1, Ordering::Relaxed);
        Some(task)
    }

    fn execute(&self, task: Task) {
        let task_id = task.id;
        let start = Instant::now();

        // dispatch tasks report their own panics; this keeps the worker alive
        // for anything else
        if let Err(info) = panic_handler::catch(|| task.execute()) {
            self.state.tasks_panicked.fetch_add(1, Ordering::Relaxed);
            tracing::error!(worker = self.id, task = ?task_id, message = %info, "task panicked");
        }

        self.state
            .busy_time_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    // spin, then yield, then park briefly
    fn idle(rounds: &mut u32) {
        *rounds += 1;
        match *rounds {
            1..=10 => (0..1u32 << (*rounds).min(6)).for_each(|_| std::hint::spin_loop()),
            11..=20 => thread::yield_now(),
            _ => thread::park_timeout(Duration::from_micros(100)),
        }
    }
}
