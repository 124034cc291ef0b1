//! Reactive context — the process-wide "current observer" stack.
//!
//! Tracks which [`Observer`](super::Observer) scope is currently running so
//! that a [`Signal`](super::Signal) read anywhere below it can register that
//! observer as a subscriber without the caller threading a context value
//! through every function call.
//!
//! # Implementation
//!
//! A thread-local stack holds the chain of currently-observing scopes.
//! Entering pushes, a `Drop` guard pops — this is what keeps the stack
//! balanced even if the tracked closure panics or returns early via `?`.
//!
//! The entry pushed here is the tracking scope itself (anything
//! implementing [`Tracking`]), not just its id: a signal read needs to
//! hand its dispose handle directly to the current observer, not merely
//! record that a dependency existed for later reconciliation.

use std::cell::RefCell;
use std::rc::Rc;

use super::SubscriberId;

/// Anything that can sit on the observer stack and receive subscriptions.
///
/// Implemented by [`Observer`](super::Observer)'s inner state. Kept as a
/// trait (rather than naming `Observer` directly) so the context module
/// does not need to depend on the observer module's concrete type.
pub(crate) trait Tracking {
    fn id(&self) -> SubscriberId;
    /// The callback a signal should invoke on change. This is already
    /// wrapped so that invoking it enqueues the observer onto the batch
    /// scheduler rather than running synchronously.
    fn notify_callback(&self) -> Rc<dyn Fn()>;
    /// Record a dispose handle obtained by subscribing to a signal.
    fn record_subscription(&self, dispose: Box<dyn FnOnce()>);
}

thread_local! {
    static STACK: RefCell<Vec<Rc<dyn Tracking>>> = const { RefCell::new(Vec::new()) };
}

/// Namespace for the free functions operating on the thread-local stack.
pub struct ReactiveContext;

impl ReactiveContext {
    /// Whether any observer is currently tracking.
    pub fn is_active() -> bool {
        STACK.with(|s| !s.borrow().is_empty())
    }

    /// The id of the innermost active observer, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        STACK.with(|s| s.borrow().last().map(|t| t.id()))
    }

    /// The innermost active tracking scope, if any. Cloning the `Rc` is
    /// cheap and lets the caller (a [`Signal`](super::Signal) read) both
    /// subscribe to it and hand back the resulting dispose handle.
    pub(crate) fn current() -> Option<Rc<dyn Tracking>> {
        STACK.with(|s| s.borrow().last().cloned())
    }

    pub(crate) fn push(scope: Rc<dyn Tracking>) {
        STACK.with(|s| s.borrow_mut().push(scope));
    }

    pub(crate) fn pop() {
        STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }

    /// Run `f` with no observer considered current, even if one is active
    /// on entry. Used internally to take untracked reads (`Signal::get_untracked`,
    /// and the scheduler's own bookkeeping reads).
    pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
        let suspended = STACK.with(|s| std::mem::take(&mut *s.borrow_mut()));
        let result = f();
        STACK.with(|s| *s.borrow_mut() = suspended);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct MockScope {
        id: SubscriberId,
        subs: RefCell<Vec<()>>,
    }

    impl Tracking for MockScope {
        fn id(&self) -> SubscriberId {
            self.id
        }
        fn notify_callback(&self) -> Rc<dyn Fn()> {
            Rc::new(|| {})
        }
        fn record_subscription(&self, dispose: Box<dyn FnOnce()>) {
            dispose();
            self.subs.borrow_mut().push(());
        }
    }

    #[test]
    fn stack_balances_across_push_pop() {
        assert!(!ReactiveContext::is_active());
        let scope = Rc::new(MockScope {
            id: SubscriberId::new(),
            subs: RefCell::new(Vec::new()),
        });
        ReactiveContext::push(scope.clone());
        assert!(ReactiveContext::is_active());
        assert_eq!(ReactiveContext::current_subscriber(), Some(scope.id()));
        ReactiveContext::pop();
        assert!(!ReactiveContext::is_active());
    }

    #[test]
    fn nested_scopes_restore_outer_on_pop() {
        let outer = Rc::new(MockScope {
            id: SubscriberId::new(),
            subs: RefCell::new(Vec::new()),
        });
        let inner = Rc::new(MockScope {
            id: SubscriberId::new(),
            subs: RefCell::new(Vec::new()),
        });

        ReactiveContext::push(outer.clone());
        ReactiveContext::push(inner.clone());
        assert_eq!(ReactiveContext::current_subscriber(), Some(inner.id()));
        ReactiveContext::pop();
        assert_eq!(ReactiveContext::current_subscriber(), Some(outer.id()));
        ReactiveContext::pop();
        assert!(!ReactiveContext::is_active());
    }

    #[test]
    fn untrack_hides_current_observer() {
        let scope = Rc::new(MockScope {
            id: SubscriberId::new(),
            subs: RefCell::new(Vec::new()),
        });
        ReactiveContext::push(scope.clone());
        let was_active_inside = Cell::new(true);
        ReactiveContext::untrack(|| {
            was_active_inside.set(ReactiveContext::is_active());
        });
        assert!(!was_active_inside.get());
        assert!(ReactiveContext::is_active());
        ReactiveContext::pop();
    }
}
