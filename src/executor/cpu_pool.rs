use super::task::Task;
use super::worker::{Sources, Worker, WorkerId, WorkerState};
use crate::config::PlatformOptions;
use crate::error::{Error, Result};
use crossbeam_deque::Injector;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id % libc::CPU_SETSIZE as usize, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            tracing::warn!(
                thread = thread::current().name().unwrap_or("unknown"),
                core_id,
                "failed to pin worker thread"
            );
        }
    }
}

/// Fixed-size pool of worker threads created once per CPU sub-platform.
#[derive(Debug)]
pub struct CpuPool {
    workers: Mutex<Vec<WorkerHandle>>,
    unparkers: Vec<thread::Thread>,
    states: Vec<Arc<WorkerState>>,
    injector: Arc<Injector<Task>>,
    shutdown: Arc<AtomicBool>,
    // held shared while submitting, exclusively while flagging shutdown,
    // so no task can be queued after the workers start draining
    submit_gate: RwLock<()>,
    num_threads: usize,
    pending_tasks: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct WorkerHandle {
    id: WorkerId,
    thread: JoinHandle<()>,
}

impl CpuPool {
    pub fn new(options: &PlatformOptions) -> Result<Self> {
        let num_threads = options.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let pending_tasks = Arc::new(AtomicUsize::new(0));

        let workers: Vec<Worker> = (0..num_threads).map(Worker::new).collect();
        let stealers: Vec<_> = workers.iter().map(|w| w.local_queue.stealer()).collect();
        let states: Vec<_> = workers.iter().map(|w| w.state.clone()).collect();

        let mut handles = Vec::with_capacity(num_threads);
        let mut unparkers = Vec::with_capacity(num_threads);

        for worker in workers {
            let id = worker.id;
            let sources = Sources {
                stealers: stealers.clone(),
                injector: injector.clone(),
                shutdown: shutdown.clone(),
                pending_tasks: pending_tasks.clone(),
            };
            let name = format!("{}-{}", options.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = options.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = options.pin_workers;
            let spawned = builder.spawn(move || {
                #[cfg(target_os = "linux")]
                if pin_workers {
                    pin_thread_to_core(id);
                }
                #[cfg(not(target_os = "linux"))]
                let _ = pin_workers;

                worker.run(sources);
            });

            let thread = match spawned {
                Ok(thread) => thread,
                Err(e) => {
                    // release the threads already started
                    shutdown.store(true, Ordering::Release);
                    for handle in handles {
                        let WorkerHandle { thread, .. } = handle;
                        thread.thread().unpark();
                        let _ = thread.join();
                    }
                    return Err(e.into());
                }
            };

            unparkers.push(thread.thread().clone());
            handles.push(WorkerHandle { id, thread });
        }

        tracing::debug!(num_threads, "cpu pool started");

        Ok(Self {
            workers: Mutex::new(handles),
            unparkers,
            states,
            injector,
            shutdown,
            submit_gate: RwLock::new(()),
            num_threads,
            pending_tasks,
        })
    }

    pub(crate) fn submit(&self, task: Task) -> Result<()> {
        {
            let _gate = self.submit_gate.read();
            if self.shutdown.load(Ordering::Acquire) {
                return Err(Error::executor("cpu pool is shut down"));
            }
            self.pending_tasks.fetch_add(1, Ordering::Relaxed);
            self.injector.push(task);
        }

        for unparker in &self.unparkers {
            unparker.unpark();
        }
        Ok(())
    }

    pub fn pending_tasks(&self) -> usize {
        self.pending_tasks.load(Ordering::Relaxed)
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn tasks_executed(&self) -> u64 {
        self.states
            .iter()
            .map(|s| s.tasks_executed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn tasks_panicked(&self) -> u64 {
        self.states
            .iter()
            .map(|s| s.tasks_panicked.load(Ordering::Relaxed))
            .sum()
    }

    /// Stop accepting tasks, let the workers drain the queues and join them.
    pub fn shutdown(&self) {
        {
            let _gate = self.submit_gate.write();
            self.shutdown.store(true, Ordering::Release);
        }

        // wake everyone up to check shutdown flag
        for unparker in &self.unparkers {
            unparker.unpark();
        }

        let handles = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for handle in handles {
            if handle.thread.thread().id() == current {
                continue;
            }
            if handle.thread.join().is_err() {
                tracing::error!(worker = handle.id, "worker thread panicked");
            }
        }
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SystemMemoryResource;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn options(threads: usize) -> PlatformOptions {
        PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
            .cpu_num_of_threads(threads)
            .thread_name_prefix("pool-test")
            .build()
            .unwrap()
    }

    #[test]
    fn test_pool_runs_tasks() {
        let pool = CpuPool::new(&options(3)).unwrap();
        assert_eq!(pool.num_threads(), 3);

        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..100 {
            let counter = counter.clone();
            pool.submit(Task::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(pool.tasks_executed(), 100);
        assert_eq!(pool.pending_tasks(), 0);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = CpuPool::new(&options(1)).unwrap();
        pool.shutdown();
        assert!(pool.is_shutdown());
        assert!(pool.submit(Task::new(|| {})).is_err());
    }

    #[test]
    fn test_panicking_task_keeps_worker_alive() {
        let pool = CpuPool::new(&options(1)).unwrap();
        pool.submit(Task::new(|| panic!("boom"))).unwrap();

        let (tx, rx) = crossbeam_channel::bounded(1);
        pool.submit(Task::new(move || {
            let _ = tx.send(());
        }))
        .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        pool.shutdown();
        assert_eq!(pool.tasks_panicked(), 1);
    }
}
