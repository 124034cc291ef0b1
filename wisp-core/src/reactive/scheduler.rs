//! Batch scheduler.
//!
//! Two queues share one deduplication discipline: a stack of synchronous
//! frames drained to a fixed point before
//! [`sync_batch`](Scheduler::sync_batch) returns, and a single
//! asynchronous frame drained once per microtask. Each frame is an
//! [`indexmap::IndexMap`] keyed by [`SubscriberId`] — insertion order is
//! preserved for notify-in-registration-order, and key presence alone
//! gives the "already queued" dedup check, so a given observer's callback
//! enqueues at most once per pass no matter how many of its dependencies
//! changed.
//!
//! State lives in a thread-local, `RefCell`-guarded registry, structured
//! as a stack of frames plus one async frame rather than a single flat
//! registry, since nested `sync_batch` calls each need their own
//! convergence loop.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

use super::subscriber::SubscriberId;

struct Frame {
    entries: RefCell<IndexMap<SubscriberId, Rc<dyn Fn()>>>,
}

impl Frame {
    fn new() -> Self {
        Self {
            entries: RefCell::new(IndexMap::new()),
        }
    }

    /// Queue `cb` under `id`. Returns `false` if `id` was already queued
    /// in this frame.
    fn push(&self, id: SubscriberId, cb: Rc<dyn Fn()>) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&id) {
            return false;
        }
        entries.insert(id, cb);
        true
    }

    /// Take every currently queued callback, clearing the frame so
    /// callbacks run from this batch may re-queue within the same pass.
    fn drain(&self) -> Vec<Rc<dyn Fn()>> {
        std::mem::take(&mut *self.entries.borrow_mut())
            .into_values()
            .collect()
    }
}

thread_local! {
    static SYNC_STACK: RefCell<Vec<Rc<Frame>>> = const { RefCell::new(Vec::new()) };
    static ASYNC_FRAME: Rc<Frame> = Rc::new(Frame::new());
    static ASYNC_SCHEDULED: Cell<bool> = const { Cell::new(false) };
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Namespace over the scheduler's thread-local state. There is exactly
/// one scheduler per thread, so every operation here is a bare function,
/// not a value a caller constructs.
pub struct Scheduler;

impl Scheduler {
    /// Install a runtime configuration. Call once at startup; tests
    /// typically install a `ManualMicrotask`-backed config so they can
    /// drive the async flush explicitly rather than waiting on a real
    /// event loop.
    pub fn configure(config: RuntimeConfig) {
        CONFIG.with(|c| *c.borrow_mut() = config);
    }

    /// Enqueue `cb` keyed by `id`: onto the top synchronous frame if one
    /// is open, otherwise onto the async frame, scheduling exactly one
    /// microtask flush for it.
    pub fn queue(id: SubscriberId, cb: Rc<dyn Fn()>) {
        let queued_sync = SYNC_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.push(id, Rc::clone(&cb)))
        });

        match queued_sync {
            Some(_) => trace!("queued onto sync frame"),
            None => {
                let pushed = ASYNC_FRAME.with(|frame| frame.push(id, cb));
                if pushed {
                    trace!("queued onto async frame");
                    Self::schedule_async_flush();
                }
            }
        }
    }

    fn schedule_async_flush() {
        let already_scheduled = ASYNC_SCHEDULED.with(|s| s.replace(true));
        if already_scheduled {
            return;
        }
        let microtask = CONFIG.with(|c| Rc::clone(&c.borrow().microtask));
        microtask.schedule(Box::new(Self::flush_async));
    }

    /// Drain the async frame to a fixed point. This is what the installed
    /// [`Microtask`](crate::config::Microtask) backend invokes; exposed
    /// publicly so a `ManualMicrotask`-driven test can trigger it
    /// directly.
    pub fn flush_async() {
        ASYNC_SCHEDULED.with(|s| s.set(false));
        ASYNC_FRAME.with(|frame| loop {
            let callbacks = frame.drain();
            if callbacks.is_empty() {
                break;
            }
            debug!(count = callbacks.len(), "flushing async batch pass");
            for cb in callbacks {
                cb();
            }
        });
    }

    /// Run `f` inside a fresh synchronous frame, then drain cascading
    /// notifications to a fixed point before returning. If `f` panics,
    /// the frame is discarded without ever draining — partial effects
    /// from `f` are not notified.
    pub fn sync_batch<T>(f: impl FnOnce() -> T) -> Result<T, RuntimeError> {
        let frame = Rc::new(Frame::new());
        SYNC_STACK.with(|stack| stack.borrow_mut().push(Rc::clone(&frame)));

        struct PopGuard;
        impl Drop for PopGuard {
            fn drop(&mut self) {
                SYNC_STACK.with(|stack| {
                    stack.borrow_mut().pop();
                });
            }
        }
        let _pop = PopGuard;

        let result = f();

        let max_passes = CONFIG.with(|c| c.borrow().max_convergence_passes);
        let mut passes = 0usize;
        loop {
            let callbacks = frame.drain();
            if callbacks.is_empty() {
                break;
            }
            passes += 1;
            if passes > max_passes {
                return Err(RuntimeError::NoConvergence(max_passes));
            }
            debug!(pass = passes, count = callbacks.len(), "sync batch convergence pass");
            for cb in callbacks {
                cb();
            }
        }

        Ok(result)
    }
}

/// Ergonomic alias over [`Scheduler::sync_batch`].
pub fn batch<T>(f: impl FnOnce() -> T) -> Result<T, RuntimeError> {
    Scheduler::sync_batch(f)
}
