//! Reactive props.
//!
//! A read-only view over a component instance's current props. Reading a
//! key inside an observer scope subscribes that observer to a per-key
//! signal allocated lazily on first read; prop reception fires those
//! signals for whichever keys actually changed.
//!
//! Built as a thin read-only wrapper over
//! [`ObjectState`](crate::reactive::ObjectState) rather than a parallel
//! implementation: the proxy's read/subscribe/allocate-on-read semantics
//! are exactly `ObjectState`'s, the same signal-map primitive that backs
//! top-level reactive state, reused here for a second proxy shape.

use std::rc::Rc;

use crate::reactive::{ObjectState, Value};

/// Reserved prop key for a ref callback/cell. Reading this key never
/// establishes a dependency — special keys bypass reactivity entirely.
pub const REF_KEY: &str = "ref";

/// Reserved prop key identifying which user component function produced
/// this instance. Also bypasses reactivity.
pub const COMPONENT_KEY: &str = "__wisp_component";

fn is_special_key(key: &str) -> bool {
    key == REF_KEY || key == COMPONENT_KEY
}

/// Read-only reactive view over a component's current props.
pub struct ReactiveProps {
    inner: Rc<ObjectState>,
}

impl ReactiveProps {
    pub fn new(initial: impl IntoIterator<Item = (Rc<str>, Value)>) -> Self {
        Self {
            inner: ObjectState::from_fields(initial),
        }
    }

    /// Read a prop, subscribing the current observer unless `key` is one
    /// of the reserved special keys.
    pub fn get(&self, key: &str) -> Value {
        if is_special_key(key) {
            self.inner.get_untracked(key)
        } else {
            self.inner.get(key)
        }
    }

    pub fn get_untracked(&self, key: &str) -> Value {
        self.inner.get_untracked(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.inner.keys()
    }

    /// Prop reception: swap in `new_props`, one `set` per
    /// key. Each `ObjectState::set` already only notifies a key's signal
    /// if that signal exists (i.e. some observer previously read it) and
    /// the value actually changed — exactly "for every changed prop key
    /// whose signal exists, fire its signal." Returns the keys whose
    /// value differed from the prior value, for the caller's
    /// `shouldComponentUpdate` bookkeeping.
    ///
    /// The caller is responsible for wrapping this in
    /// [`sync_batch`](crate::reactive::Scheduler::sync_batch) so that
    /// downstream observers (including the component's own render
    /// observer) see one deduplicated notification per reconciliation
    /// even when several props changed.
    pub fn receive(&self, new_props: impl IntoIterator<Item = (Rc<str>, Value)>) -> Vec<Rc<str>> {
        let mut changed = Vec::new();
        for (key, value) in new_props {
            let old = self.inner.get_untracked(&key);
            if old != value {
                changed.push(Rc::clone(&key));
            }
            self.inner.set(&key, value);
        }
        changed
    }
}

impl Clone for ReactiveProps {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observer;
    use std::cell::Cell;

    #[test]
    fn reading_a_prop_subscribes_and_reception_notifies() {
        let props = ReactiveProps::new([(Rc::from("count"), Value::Number(0.0))]);
        let runs = Rc::new(Cell::new(0));
        let runs2 = runs.clone();
        let props2 = props.clone();
        let observer = Observer::new(move || {
            runs2.set(runs2.get() + 1);
            let _ = props2.get_untracked("count");
        });
        {
            let _guard = observer.observe();
            props.get("count");
        }

        let changed = props.receive([(Rc::from("count"), Value::Number(1.0))]);
        assert_eq!(changed, vec![Rc::from("count")]);
        assert_eq!(runs.get(), 1);
        assert_eq!(props.get_untracked("count").as_number(), Some(1.0));
    }

    #[test]
    fn unread_prop_change_does_not_notify_because_no_signal_exists() {
        let props = ReactiveProps::new([
            (Rc::from("count"), Value::Number(0.0)),
            (Rc::from("label"), Value::Str(Rc::from("a"))),
        ]);
        let runs = Rc::new(Cell::new(0));
        let runs2 = runs.clone();
        let props2 = props.clone();
        let observer = Observer::new(move || {
            runs2.set(runs2.get() + 1);
            let _ = props2.get_untracked("count");
        });
        {
            let _guard = observer.observe();
            props.get("count");
        }

        // Only "label" changes; "count" is unchanged. Observer only reads
        // "count" so it must not re-run.
        let changed = props.receive([
            (Rc::from("count"), Value::Number(0.0)),
            (Rc::from("label"), Value::Str(Rc::from("b"))),
        ]);
        assert_eq!(changed, vec![Rc::from("label")]);
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn special_keys_bypass_reactivity() {
        let props = ReactiveProps::new([(Rc::from(REF_KEY), Value::Null)]);
        assert_eq!(props.get(REF_KEY), Value::Null);
    }
}
