//! Signal — the fundamental observable primitive.
//!
//! A Signal holds a value and a set of subscriber callbacks. Reading it
//! inside an active [`Observer`](super::Observer) scope registers that
//! observer; writing it invokes every subscriber exactly once, in
//! insertion order, using a snapshot taken before any callback runs so
//! that subscribers added mid-notification are not invoked in the same
//! pass.
//!
//! The engine is single-threaded by design, so this uses `Rc<RefCell<_>>`
//! rather than `Arc<RwLock<_>>`: there is no multi-threaded caller to
//! guard against, so that machinery has no remaining use here.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::context::ReactiveContext;
use super::subscriber::SubscriberId;

struct Inner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(SubscriberId, Rc<dyn Fn()>)>>,
}

/// A reactive container for a value of type `T`.
///
/// # Example
///
/// ```
/// use wisp_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Read the current value. If called inside an active observer scope,
    /// that observer is registered as a subscriber of this signal.
    pub fn get(&self) -> T {
        if let Some(scope) = ReactiveContext::current() {
            let id = scope.id();
            let notify = scope.notify_callback();
            let dispose = self.subscribe(id, notify);
            scope.record_subscription(dispose);
        }
        self.get_untracked()
    }

    /// Read the current value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Register `notify` to run whenever this signal's value changes.
    /// Returns a dispose closure that removes the subscription.
    ///
    /// This is the primitive [`Observer`](super::Observer) builds on: the
    /// `notify` callback an observer passes here already enqueues onto the
    /// batch scheduler rather than running synchronously, so `Signal`
    /// itself stays free of scheduling concerns.
    pub fn subscribe(&self, id: SubscriberId, notify: Rc<dyn Fn()>) -> Box<dyn FnOnce()> {
        self.inner.subscribers.borrow_mut().push((id, notify));
        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .subscribers
                    .borrow_mut()
                    .retain(|(sub_id, _)| *sub_id != id);
            }
        })
    }

    /// Set a new value. Notifies subscribers unless the new value equals
    /// the old one.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        let changed = {
            let mut guard = self.inner.value.borrow_mut();
            let changed = *guard != value;
            *guard = value;
            changed
        };
        if changed {
            self.notify();
        }
    }

    /// Set a new value and notify subscribers unconditionally, ignoring
    /// equality. Used for array `length` writes, which count as
    /// always-changed regardless of the numeric value.
    pub fn set_always_notify(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Update the value via a function of the current value, applying the
    /// same change-detection as [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&T) -> T)
    where
        T: PartialEq,
    {
        let new_value = f(&self.inner.value.borrow());
        self.set(new_value);
    }

    /// Invoke every current subscriber exactly once, using a snapshot so
    /// subscribers added during this pass are excluded from it.
    pub fn notify(&self) {
        let snapshot: Vec<Rc<dyn Fn()>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in snapshot {
            cb();
        }
    }

    /// Number of currently registered subscribers (test/debug helper).
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl<T: Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.value.borrow())
            .field("subscriber_count", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_and_set() {
        let s = Signal::new(0);
        assert_eq!(s.get(), 0);
        s.set(42);
        assert_eq!(s.get(), 42);
    }

    #[test]
    fn update_reads_current_value() {
        let s = Signal::new(10);
        s.update(|v| v + 5);
        assert_eq!(s.get(), 15);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let s = Signal::new(1);
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let _dispose = s.subscribe(
            SubscriberId::new(),
            Rc::new(move || count2.set(count2.get() + 1)),
        );
        s.set(1);
        assert_eq!(count.get(), 0);
        s.set(2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn always_notify_ignores_equality() {
        let s = Signal::new(3usize);
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let _dispose = s.subscribe(
            SubscriberId::new(),
            Rc::new(move || count2.set(count2.get() + 1)),
        );
        s.set_always_notify(3);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn subscribers_added_during_notify_are_not_invoked_this_pass() {
        let s = Signal::new(0);
        let second_ran = Rc::new(Cell::new(false));
        let second_ran2 = second_ran.clone();
        let s2 = s.clone();

        let _d1 = s.subscribe(
            SubscriberId::new(),
            Rc::new(move || {
                let ran = second_ran2.clone();
                // Adding a new subscriber from inside a notification pass
                // must not run it in this same pass.
                std::mem::forget(s2.subscribe(SubscriberId::new(), Rc::new(move || ran.set(true))));
            }),
        );

        s.set(1);
        assert!(!second_ran.get());
        s.set(2);
        assert!(second_ran.get());
    }

    #[test]
    fn dispose_removes_subscriber() {
        let s = Signal::new(0);
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let dispose = s.subscribe(
            SubscriberId::new(),
            Rc::new(move || count2.set(count2.get() + 1)),
        );
        s.set(1);
        assert_eq!(count.get(), 1);
        dispose();
        s.set(2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let s1 = Signal::new(0);
        let s2 = s1.clone();
        s1.set(42);
        assert_eq!(s2.get(), 42);
    }
}
