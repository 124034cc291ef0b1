//! Runtime configuration and the injected microtask backend.
//!
//! Microtask batching sits behind an injected scheduler interface so the
//! engine is testable with a manual tick primitive instead of a real
//! event loop. [`Microtask`] is that interface; [`WasmMicrotask`] is the
//! real backend (`wasm_bindgen_futures::spawn_local`) and
//! [`ManualMicrotask`] is the test stand-in.

use std::cell::RefCell;
use std::rc::Rc;

/// A place to schedule a closure to run at the next microtask boundary.
pub trait Microtask {
    fn schedule(&self, f: Box<dyn FnOnce()>);
}

/// Schedules onto the browser's real microtask queue via
/// `wasm_bindgen_futures::spawn_local`.
#[cfg(feature = "dom")]
pub struct WasmMicrotask;

#[cfg(feature = "dom")]
impl Microtask for WasmMicrotask {
    fn schedule(&self, f: Box<dyn FnOnce()>) {
        wasm_bindgen_futures::spawn_local(async move { f() });
    }
}

/// Defers scheduled closures until [`ManualMicrotask::run_pending`] is
/// called. Used by host-target unit and integration tests, which drive
/// microtask flushes explicitly instead of running an event loop.
#[derive(Default)]
pub struct ManualMicrotask {
    pending: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl ManualMicrotask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every closure scheduled so far, including ones scheduled by a
    /// closure run during this same call — a real microtask queue never
    /// runs dry while new microtasks are still being enqueued within the
    /// current drain.
    pub fn run_pending(&self) {
        loop {
            let batch = std::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for f in batch {
                f();
            }
        }
    }
}

impl Microtask for ManualMicrotask {
    fn schedule(&self, f: Box<dyn FnOnce()>) {
        self.pending.borrow_mut().push(f);
    }
}

/// Process-wide tunables for the reactivity engine.
pub struct RuntimeConfig {
    /// Upper bound on convergence passes within a single `sync_batch`
    /// before it is treated as a runaway feedback loop.
    pub max_convergence_passes: usize,
    pub microtask: Rc<dyn Microtask>,
}

impl RuntimeConfig {
    pub fn new(microtask: Rc<dyn Microtask>) -> Self {
        Self {
            max_convergence_passes: 10_000,
            microtask,
        }
    }

    pub fn with_max_convergence_passes(mut self, passes: usize) -> Self {
        self.max_convergence_passes = passes;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        #[cfg(feature = "dom")]
        {
            Self::new(Rc::new(WasmMicrotask))
        }
        #[cfg(not(feature = "dom"))]
        {
            Self::new(Rc::new(ManualMicrotask::new()))
        }
    }
}
