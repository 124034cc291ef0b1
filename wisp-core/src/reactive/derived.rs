//! Derived table — a named set of memoised computations.
//!
//! Each entry pairs a dirty flag and a cached value with an inner
//! [`Observer`] whose notify callback marks the entry dirty and fires an
//! outer [`Signal`]; reading the entry subscribes the caller to that
//! outer signal, not to the entry's own inputs directly, so a reader
//! never needs to know what the computation touches.
//!
//! Built on this crate's own `Observer`/`Signal` pair (`observer.rs`,
//! `signal.rs`): the single-threaded, stack-based tracking model here has
//! no use for a separate global registry mediating recomputation, so each
//! entry just owns its own inner observer directly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::observer::Observer;
use super::signal::Signal;

struct Entry<T> {
    dirty: Rc<std::cell::Cell<bool>>,
    cache: RefCell<Option<T>>,
    outer: Signal<()>,
    inner: Observer,
    compute: Rc<dyn Fn() -> T>,
}

impl<T: Clone + PartialEq + 'static> Entry<T> {
    fn new(compute: impl Fn() -> T + 'static) -> Rc<Self> {
        let dirty = Rc::new(std::cell::Cell::new(true));
        let outer = Signal::new(());
        Rc::new_cyclic(|weak: &std::rc::Weak<Entry<T>>| {
            let weak_for_inner = weak.clone();
            let inner = Observer::new_immediate(move || {
                if let Some(entry) = weak_for_inner.upgrade() {
                    entry.dirty.set(true);
                    entry.outer.set_always_notify(());
                }
            });
            Entry {
                dirty,
                cache: RefCell::new(None),
                outer,
                inner,
                compute: Rc::new(compute),
            }
        })
    }

    /// Read the entry's value, subscribing the calling observer (if any)
    /// to the outer signal; recompute inside the inner observer if dirty.
    fn get(&self) -> T {
        self.outer.get();
        if self.dirty.get() {
            let value = {
                let _guard = self.inner.observe();
                (self.compute)()
            };
            self.dirty.set(false);
            *self.cache.borrow_mut() = Some(value.clone());
            value
        } else {
            self.cache
                .borrow()
                .clone()
                .expect("clean derived entry must have a cached value")
        }
    }

    fn dispose(&self) {
        self.inner.dispose();
    }
}

/// A mapping of name → memoised computation. Entries may read other
/// entries in the same or a different table; cycles are the caller's
/// responsibility.
pub struct Derived<T> {
    entries: IndexMap<Rc<str>, Rc<Entry<T>>>,
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    /// Build a table from named compute functions. None of the
    /// computations run yet — each entry is dirty until first read.
    pub fn new(table: impl IntoIterator<Item = (&'static str, Rc<dyn Fn() -> T>)>) -> Self {
        let entries = table
            .into_iter()
            .map(|(name, compute)| {
                let compute = compute.clone();
                (Rc::from(name), Entry::new(move || compute()))
            })
            .collect();
        Self { entries }
    }

    /// Read a named entry's current value, recomputing it first if dirty.
    pub fn get(&self, name: &str) -> Option<T> {
        self.entries.get(name).map(|entry| entry.get())
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Dispose every entry's inner observer. Required when the owning
    /// component unmounts.
    pub fn dispose_all(&self) {
        for entry in self.entries.values() {
            entry.dispose();
        }
    }
}

/// Convenience constructor for a single unnamed derived computation, used
/// where a whole named table would be overkill (e.g. inline in a
/// component's setup).
pub struct SingleDerived<T> {
    entry: Rc<Entry<T>>,
}

impl<T: Clone + PartialEq + 'static> SingleDerived<T> {
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        Self {
            entry: Entry::new(compute),
        }
    }

    pub fn get(&self) -> T {
        self.entry.get()
    }

    pub fn dispose(&self) {
        self.entry.dispose();
    }
}

impl<T: Clone + PartialEq + 'static> Clone for SingleDerived<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Rc::clone(&self.entry),
        }
    }
}

/// Build a `Derived` table from a plain `HashMap` of compute functions,
/// for callers assembling names dynamically rather than from a literal
/// list; the iterable-of-pairs entry point above covers the literal
/// case.
pub fn create_derived<T: Clone + PartialEq + 'static>(
    table: HashMap<&'static str, Rc<dyn Fn() -> T>>,
) -> Derived<T> {
    Derived::new(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::scheduler::Scheduler;
    use crate::reactive::Signal as StateSignal;
    use std::cell::Cell;

    #[test]
    fn entry_is_lazy_until_first_read() {
        let runs = Rc::new(Cell::new(0));
        let runs2 = runs.clone();
        let single = SingleDerived::new(move || {
            runs2.set(runs2.get() + 1);
            42
        });
        assert_eq!(runs.get(), 0);
        assert_eq!(single.get(), 42);
        assert_eq!(runs.get(), 1);
        assert_eq!(single.get(), 42);
        assert_eq!(runs.get(), 1, "clean read should not recompute");
    }

    #[test]
    fn diamond_dependency_notifies_observer_once() {
        let v = StateSignal::new(0i64);
        let v1 = v.clone();
        let v2 = v.clone();
        let d1 = SingleDerived::new(move || v1.get() * 2);
        let d2 = SingleDerived::new(move || v2.get() * 3);
        let d1_for_d3 = d1.clone();
        let d2_for_d3 = d2.clone();
        let d3 = SingleDerived::new(move || d1_for_d3.get() + d2_for_d3.get());

        let runs = Rc::new(Cell::new(0));
        let runs2 = runs.clone();
        let d3_for_observer = d3.clone();
        let observer = Observer::new(move || {
            runs2.set(runs2.get() + 1);
            let _ = d3_for_observer.get();
        });
        {
            let _guard = observer.observe();
            assert_eq!(d3.get(), 0);
        }

        Scheduler::sync_batch(|| v.set(5)).unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(d3.get(), 25);
    }

    #[test]
    fn conditional_dependency_tracks_only_active_branch() {
        let use_a = StateSignal::new(true);
        let a = StateSignal::new(10i64);
        let b = StateSignal::new(20i64);

        let use_a2 = use_a.clone();
        let a2 = a.clone();
        let b2 = b.clone();
        let recomputes = Rc::new(Cell::new(0));
        let recomputes2 = recomputes.clone();
        let derived = SingleDerived::new(move || {
            recomputes2.set(recomputes2.get() + 1);
            if use_a2.get() {
                a2.get()
            } else {
                b2.get()
            }
        });

        assert_eq!(derived.get(), 10);
        assert_eq!(recomputes.get(), 1);

        b.set(99);
        assert_eq!(derived.get(), 10);
        assert_eq!(recomputes.get(), 1, "b is not a dependency while use_a is true");

        use_a.set(false);
        assert_eq!(derived.get(), 99);
        assert_eq!(recomputes.get(), 2);

        a.set(0);
        assert_eq!(derived.get(), 99);
        assert_eq!(recomputes.get(), 2, "a is no longer a dependency once use_a is false");
    }

    #[test]
    fn dispose_stops_inner_observer_from_notifying_outer_signal() {
        let v = StateSignal::new(1i64);
        let v2 = v.clone();
        let derived = SingleDerived::new(move || v2.get());
        assert_eq!(derived.get(), 1);
        derived.dispose();
        // Dirty flag never flips again because the inner observer is
        // disposed, so a later read returns the stale cached value.
        v.set(2);
        assert_eq!(derived.get(), 1);
    }
}
