//! Deferred update scheduling.
//!
//! Writes never run subscribers directly. They enqueue a settle task, and the
//! queue runs in one batch when the [`Scheduler`] is flushed. What triggers a
//! flush is decided by a [`TickDriver`]: the default [`ManualDriver`] waits
//! for an explicit [`Scheduler::flush`], while [`SpawnDriver`] spawns the
//! flush on a local executor so it runs once the current turn yields.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll, Waker};

use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, error, warn};
use weft_core::Result;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() -> Result<()>>;

/// Flush rounds `run_until_idle` allows before giving up on a queue that
/// keeps refilling itself.
const MAX_IDLE_ROUNDS: usize = 100;

/// Decides when a pending queue gets flushed.
pub trait TickDriver {
    /// Called once when the queue goes from empty to pending.
    fn request_flush(&self, scheduler: &Scheduler);
}

/// A driver that never flushes on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualDriver;

impl TickDriver for ManualDriver {
    fn request_flush(&self, _scheduler: &Scheduler) {}
}

/// A driver that spawns the flush as a task on a local executor, such as
/// the spawner of a `futures::executor::LocalPool`.
///
/// The flush runs when the executor next polls its tasks, after the code
/// that wrote has returned, and keeps flushing until the queue is idle.
pub struct SpawnDriver<S> {
    spawner: S,
}

impl<S: LocalSpawn> SpawnDriver<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S: LocalSpawn> TickDriver for SpawnDriver<S> {
    fn request_flush(&self, scheduler: &Scheduler) {
        let scheduler = scheduler.clone();
        let spawned = self.spawner.spawn_local(async move {
            scheduler.run_until_idle();
        });
        if let Err(err) = spawned {
            warn!(error = %err, "flush could not be spawned, waiting for a manual flush");
        }
    }
}

/// Outcome of one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Tasks that completed.
    pub ran: usize,
    /// Tasks that returned an error or panicked.
    pub failed: usize,
}

impl FlushReport {
    /// Total number of tasks executed.
    #[inline]
    pub fn total(&self) -> usize {
        self.ran + self.failed
    }
}

struct Inner {
    queue: RefCell<Vec<Task>>,
    pending: Cell<bool>,
    flushing: Cell<Option<u64>>,
    epoch: Cell<u64>,
    driver: RefCell<Rc<dyn TickDriver>>,
}

/// The update queue. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler driven by [`ManualDriver`].
    pub fn new() -> Self {
        Self::with_driver(ManualDriver)
    }

    /// Creates a scheduler with a custom driver.
    pub fn with_driver<D: TickDriver + 'static>(driver: D) -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(Vec::new()),
                pending: Cell::new(false),
                flushing: Cell::new(None),
                epoch: Cell::new(0),
                driver: RefCell::new(Rc::new(driver)),
            }),
        }
    }

    /// Replaces the driver.
    pub fn set_driver<D: TickDriver + 'static>(&self, driver: D) {
        *self.inner.driver.borrow_mut() = Rc::new(driver);
    }

    /// Appends a task to the queue.
    ///
    /// The first task of a batch asks the driver for a flush.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.inner.queue.borrow_mut().push(Box::new(task));
        if !self.inner.pending.replace(true) {
            let driver = Rc::clone(&*self.inner.driver.borrow());
            driver.request_flush(self);
        }
    }

    /// Runs `callback` after the updates queued so far.
    pub fn next_tick<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.schedule(move || {
            callback();
            Ok(())
        });
    }

    /// Returns a future that resolves once the updates queued so far have
    /// run. Like [`Scheduler::next_tick`] it takes a place in the queue.
    pub fn after_flush(&self) -> FlushSignal {
        let state = Rc::new(SignalState::default());
        let done = Rc::clone(&state);
        self.schedule(move || {
            done.complete();
            Ok(())
        });
        FlushSignal { state }
    }

    /// Runs every task queued before this call, in FIFO order.
    ///
    /// Tasks scheduled while flushing land in the next batch. A failing or
    /// panicking task is logged and does not stop the rest of the batch.
    /// Calling `flush` from inside a task is a no-op.
    pub fn flush(&self) -> FlushReport {
        if self.inner.flushing.get().is_some() {
            debug!("flush requested while flushing, ignored");
            return FlushReport::default();
        }
        let tasks = mem::take(&mut *self.inner.queue.borrow_mut());
        self.inner.pending.set(false);

        let epoch = self.inner.epoch.get() + 1;
        self.inner.epoch.set(epoch);
        self.inner.flushing.set(Some(epoch));
        debug!(epoch, tasks = tasks.len(), "flushing");

        let mut report = FlushReport::default();
        for task in tasks {
            match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => report.ran += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    error!(epoch, error = %err, "scheduled task failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    error!(epoch, panic = %panic_message(&*payload), "scheduled task panicked");
                }
            }
        }
        self.inner.flushing.set(None);
        report
    }

    /// Flushes until the queue stays empty.
    pub fn run_until_idle(&self) -> FlushReport {
        let mut total = FlushReport::default();
        for _ in 0..MAX_IDLE_ROUNDS {
            let report = self.flush();
            total.ran += report.ran;
            total.failed += report.failed;
            if !self.is_pending() {
                return total;
            }
        }
        warn!(
            rounds = MAX_IDLE_ROUNDS,
            queued = self.len(),
            "queue did not settle"
        );
        total
    }

    /// Returns true if tasks are waiting for a flush.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    /// Returns true while a flush is running.
    #[inline]
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get().is_some()
    }

    /// Returns the number of queued tasks.
    pub fn len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Returns true if no task is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Returns the epoch of the running flush, if any.
    ///
    /// Epochs increase by one per flush and start at 1.
    #[inline]
    pub fn current_epoch(&self) -> Option<u64> {
        self.inner.flushing.get()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.len())
            .field("pending", &self.is_pending())
            .field("epoch", &self.inner.epoch.get())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Default)]
struct SignalState {
    done: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl SignalState {
    fn complete(&self) {
        self.done.set(true);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Resolves when its place in the queue is reached.
pub struct FlushSignal {
    state: Rc<SignalState>,
}

impl FlushSignal {
    /// Returns true once the signal's place in the queue has run.
    pub fn is_complete(&self) -> bool {
        self.state.done.get()
    }
}

impl Future for FlushSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.state.done.get() {
            Poll::Ready(())
        } else {
            *self.state.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl fmt::Debug for FlushSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushSignal")
            .field("complete", &self.is_complete())
            .finish()
    }
}
