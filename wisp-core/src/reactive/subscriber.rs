//! Subscriber identity.
//!
//! A [`SubscriberId`] names any reactive scope that can depend on signals:
//! an [`Observer`](super::Observer) driving a component render, a derived
//! entry's inner observer, or a standalone effect. IDs are only ever
//! compared for equality and used as map/set keys; the counter does not
//! need to survive a process restart, and does not need to be thread-safe
//! since the whole engine is confined to one thread (see `ReactiveContext`).

use std::cell::Cell;

/// Unique identifier for a subscriber.
///
/// Every [`Observer`](super::Observer) is assigned one on construction.
/// The scheduler's dedup set and a signal's per-subscriber notifier list are
/// keyed on this, never on the observer's address, so a moved or cloned
/// handle still dedups correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new, process-unique subscriber id.
    pub fn new() -> Self {
        thread_local! {
            static COUNTER: Cell<u64> = const { Cell::new(0) };
        }
        COUNTER.with(|c| {
            let id = c.get();
            c.set(id + 1);
            Self(id)
        })
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = SubscriberId::new();
        let b = SubscriberId::new();
        let c = SubscriberId::new();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
