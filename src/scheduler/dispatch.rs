//! Blocking fan-out of a dispatch onto the CPU pool.

use crate::error::{Error, Result};
use crate::executor::panic_handler;
use crate::executor::{CpuPool, Task};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::marker::PhantomData;

/// Tasks spawned into the pool that may borrow from the caller's stack.
///
/// Every task reports back exactly once, panicking or not, and the scope
/// does not return (or drop) before all of them have.
pub struct DispatchScope<'scope> {
    pool: &'scope CpuPool,
    tx: Sender<Result<()>>,
    rx: Receiver<Result<()>>,
    pending: usize,
    _marker: PhantomData<&'scope ()>,
}

impl<'scope> DispatchScope<'scope> {
    fn new(pool: &'scope CpuPool) -> Self {
        let (tx, rx) = unbounded();
        Self {
            pool,
            tx,
            rx,
            pending: 0,
            _marker: PhantomData,
        }
    }

    pub fn spawn<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'scope,
    {
        let tx = self.tx.clone();

        let f: Box<dyn FnOnce() -> Result<()> + Send + 'scope> = Box::new(f);
        // SAFETY: the scope waits for every submitted task before it goes
        // away, so nothing borrowed for 'scope is touched afterwards.
        let f: Box<dyn FnOnce() -> Result<()> + Send + 'static> = unsafe { std::mem::transmute(f) };

        self.pool.submit(Task::new(move || {
            let result = match panic_handler::catch(f) {
                Ok(result) => result,
                Err(info) => Err(Error::WorkerPanic(info.message)),
            };
            let _ = tx.send(result);
        }))?;
        self.pending += 1;
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Wait for every task; the first error reported wins.
    pub fn join(mut self) -> Result<()> {
        self.wait_all()
    }

    fn wait_all(&mut self) -> Result<()> {
        let mut first_error = None;
        while self.pending > 0 {
            let result = self
                .rx
                .recv()
                .map_err(|_| Error::executor("dispatch task vanished"));
            self.pending -= 1;
            if let Err(e) = result.and_then(|r| r) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for DispatchScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchScope")
            .field("pending", &self.pending)
            .finish()
    }
}

impl<'scope> Drop for DispatchScope<'scope> {
    fn drop(&mut self) {
        if self.pending > 0 {
            let _ = self.wait_all();
        }
    }
}

/// Run `f` with a scope on `pool` and block until all of its tasks finish.
///
/// An error from `f` itself still waits for the tasks already spawned.
pub fn dispatch_scope<'scope, F>(pool: &'scope CpuPool, f: F) -> Result<()>
where
    F: FnOnce(&mut DispatchScope<'scope>) -> Result<()>,
{
    let mut scope = DispatchScope::new(pool);
    let spawned = f(&mut scope);
    let joined = scope.join();
    spawned.and(joined)
}
