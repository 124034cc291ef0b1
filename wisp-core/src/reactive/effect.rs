//! Standalone effects and the cleanup-scope stack.
//!
//! An effect is an [`Observer`] that re-runs its own body instead of
//! notifying an external render callback. `on_cleanup` needs somewhere to
//! register a dispose callback whether the caller is inside a standalone
//! effect or inside a component's setup (`component::instance` pushes
//! onto the same stack) — this module owns that shared stack so both
//! callers agree on one mechanism: cleanup runs before the next re-run,
//! and once more on final dispose.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::error::RuntimeError;

use super::observer::Observer;

thread_local! {
    static CLEANUP_STACK: RefCell<Vec<Rc<RefCell<Vec<Box<dyn FnOnce()>>>>>> = RefCell::new(Vec::new());
}

/// Push a fresh cleanup-collector scope, returning a handle used to pop
/// and run it later. Called by [`create_effect`]'s run loop and by
/// component setup (`component::instance::ComponentInstance::setup`).
pub(crate) fn push_cleanup_scope() -> Rc<RefCell<Vec<Box<dyn FnOnce()>>>> {
    let scope = Rc::new(RefCell::new(Vec::new()));
    CLEANUP_STACK.with(|stack| stack.borrow_mut().push(scope.clone()));
    scope
}

pub(crate) fn pop_cleanup_scope() {
    CLEANUP_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Run every cleanup registered in `scope`, in registration order.
/// Individual failures are logged and do not stop the remaining cleanups
/// from running; a panicking cleanup never propagates out of this call.
pub(crate) fn run_cleanups(scope: &Rc<RefCell<Vec<Box<dyn FnOnce()>>>>) {
    let callbacks = std::mem::take(&mut *scope.borrow_mut());
    for cleanup in callbacks {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup));
        if result.is_err() {
            warn!("cleanup callback panicked; remaining cleanups still ran");
        }
    }
}

/// Register `f` to run once, either before the enclosing effect/component
/// re-runs or when it is finally disposed. Must be called while an effect
/// is executing or a component is inside `setup`. Cleanup callbacks may
/// not register further cleanups against their own scope — `f` runs
/// after this scope has already been popped from the stack, so a nested
/// `on_cleanup` call from within `f` always hits a different (or absent)
/// scope.
pub fn on_cleanup(f: impl FnOnce() + 'static) -> Result<(), RuntimeError> {
    CLEANUP_STACK.with(|stack| match stack.borrow().last() {
        Some(scope) => {
            scope.borrow_mut().push(Box::new(f));
            Ok(())
        }
        None => Err(RuntimeError::ScopeViolation(
            "on_cleanup called with no active effect or component setup",
        )),
    })
}

struct EffectInner {
    observer: Observer,
    body: Box<dyn Fn()>,
    scope: RefCell<Option<Rc<RefCell<Vec<Box<dyn FnOnce()>>>>>>,
}

impl EffectInner {
    /// Run any cleanup registered by the previous run, then re-run the
    /// body, collecting whatever it registers for next time.
    fn run(&self) {
        if let Some(previous) = self.scope.borrow_mut().take() {
            run_cleanups(&previous);
        }
        let scope = push_cleanup_scope();
        (self.body)();
        pop_cleanup_scope();
        *self.scope.borrow_mut() = Some(scope);
    }

    fn run_tracked(&self) {
        let _guard = self.observer.observe();
        self.run();
    }
}

/// A side-effecting computation that re-runs whenever a signal it read
/// during its last run changes. Unlike a [`Derived`](super::Derived)
/// entry, an effect has no return value and runs eagerly as soon as the
/// scheduler drains its notification rather than lazily on next read.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create and immediately run `body` once to establish its initial
    /// dependencies. Any `on_cleanup` registered during a run is executed
    /// before the next run, and once more when the effect is disposed.
    pub fn new(body: impl Fn() + 'static) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<EffectInner>| {
            let weak_for_observer = weak.clone();
            let observer = Observer::new(move || {
                if let Some(inner) = weak_for_observer.upgrade() {
                    inner.run_tracked();
                }
            });
            EffectInner {
                observer,
                body: Box::new(body),
                scope: RefCell::new(None),
            }
        });
        inner.run_tracked();
        Self { inner }
    }

    pub fn dispose(&self) {
        self.inner.observer.dispose();
        if let Some(scope) = self.inner.scope.borrow_mut().take() {
            run_cleanups(&scope);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.observer.is_disposed()
    }
}
