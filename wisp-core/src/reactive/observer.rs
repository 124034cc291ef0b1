//! Observer — a reactive scope that subscribes to whatever signals it
//! reads while active, and forgets all of them the next time it observes.
//!
//! Subscriber bookkeeping is built around the `Tracking` trait
//! `context.rs` defines and the `Rc<RefCell<_>>`/`thread_local!` model
//! this crate uses throughout instead of `Arc`/atomics.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::context::{ReactiveContext, Tracking};
use super::scheduler::Scheduler;
use super::subscriber::SubscriberId;

struct ObserverInner {
    id: SubscriberId,
    weak_self: RefCell<Weak<ObserverInner>>,
    notify: Box<dyn Fn()>,
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
    /// Whether a signal notification reaching this observer is deferred
    /// onto the batch scheduler (components, standalone effects) or runs
    /// synchronously in the signal's own notify pass (a derived entry's
    /// inner scope, which only flips a dirty flag — see
    /// `derived.rs`/`Observer::new_immediate`).
    scheduled: bool,
}

/// A reactive scope. Construct with the callback to run when any signal
/// read during the most recent [`observe`](Observer::observe) window
/// changes, then call `observe()` around the tracked read.
pub struct Observer {
    inner: Rc<ObserverInner>,
}

/// Scope guard returned by [`Observer::observe`]. Dropping it pops the
/// observer stack, ending the tracking window it opened.
pub struct ObserveGuard {
    _private: (),
}

impl Drop for ObserveGuard {
    fn drop(&mut self) {
        ReactiveContext::pop();
    }
}

impl Observer {
    /// Create a new observer with the given notify callback. The
    /// callback is fixed at construction and is not invoked
    /// directly by a signal write — each signal read instead registers a
    /// wrapper that enqueues this observer onto the [`Scheduler`], which
    /// is what gives "three writes in a batch ⇒ one notification".
    pub fn new(notify: impl Fn() + 'static) -> Self {
        Self::new_with_scheduling(notify, true)
    }

    /// Like [`new`](Self::new), but a signal notification reaching this
    /// observer runs `notify` synchronously within the signal's own
    /// notify pass instead of enqueuing onto the batch scheduler.
    ///
    /// Used only by [`Derived`](super::derived::Derived)'s inner scope:
    /// marking a derived entry dirty is bookkeeping with no user-visible
    /// side effect, so it must happen immediately — deferring it to a
    /// microtask would leave `Derived::get` reading a stale cache for
    /// callers that read it outside any `sync_batch`.
    pub(crate) fn new_immediate(notify: impl Fn() + 'static) -> Self {
        Self::new_with_scheduling(notify, false)
    }

    fn new_with_scheduling(notify: impl Fn() + 'static, scheduled: bool) -> Self {
        let inner = Rc::new_cyclic(|weak| ObserverInner {
            id: SubscriberId::new(),
            weak_self: RefCell::new(weak.clone()),
            notify: Box::new(notify),
            disposers: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
            scheduled,
        });
        Self { inner }
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Begin a tracking window: disposes all subscriptions from the
    /// previous window (enabling conditional-dependency tracking: a
    /// branch not taken this time no longer holds a subscription), then
    /// pushes this observer as current. Signals
    /// read before the returned guard drops subscribe to this observer.
    pub fn observe(&self) -> ObserveGuard {
        self.clear_subscriptions();
        trace!(id = ?self.inner.id, "observer entering tracking window");
        ReactiveContext::push(self.inner.clone() as Rc<dyn Tracking>);
        ObserveGuard { _private: () }
    }

    fn clear_subscriptions(&self) {
        let disposers = std::mem::take(&mut *self.inner.disposers.borrow_mut());
        for dispose in disposers {
            dispose();
        }
    }

    /// Permanently stop this observer: drop all current subscriptions and
    /// mark it so its notify callback never fires again, even for writes
    /// already enqueued onto the scheduler.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.clear_subscriptions();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of signals currently subscribed (test/debug helper).
    pub fn subscription_count(&self) -> usize {
        self.inner.disposers.borrow().len()
    }
}

impl Tracking for ObserverInner {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn notify_callback(&self) -> Rc<dyn Fn()> {
        let weak = self.weak_self.borrow().clone();
        let scheduled = self.scheduled;
        Rc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.disposed.get() {
                return;
            }
            if !scheduled {
                (inner.notify)();
                return;
            }
            let id = inner.id;
            let weak_for_run = weak.clone();
            Scheduler::queue(
                id,
                Rc::new(move || {
                    if let Some(inner) = weak_for_run.upgrade() {
                        if !inner.disposed.get() {
                            (inner.notify)();
                        }
                    }
                }),
            );
        })
    }

    fn record_subscription(&self, dispose: Box<dyn FnOnce()>) {
        self.disposers.borrow_mut().push(dispose);
    }
}
