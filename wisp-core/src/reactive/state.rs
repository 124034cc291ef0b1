//! Reactive state proxy.
//!
//! A dynamic-language implementation of this idea intercepts arbitrary
//! property reads/writes on plain objects and arrays. Rust has no
//! runtime property interception, so this instead offers an explicit
//! `observable(k)`/`observe(k)` cell API behind an explicit [`Value`]/
//! [`State`] pair: [`Value`] is the dynamic cell type a field or array
//! slot holds, and [`State`] is the container. Every keyed field or array
//! slot is backed by a [`Signal`], so allocating a signal on first
//! observed read and firing it on write falls directly out of
//! `Signal::get`/`Signal::set`'s existing change-detection.
//!
//! Because a nested container is a `State` handle (an `Rc`-backed value)
//! from the moment it is constructed — never a raw struct lazily wrapped
//! on read — identity preservation across repeated reads is just
//! `Rc::clone`; no separate weak-keyed proxy cache is needed the way a
//! dynamic-language implementation requires one.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::signal::Signal;

/// A single dynamic cell: what a state field or array slot holds.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// A nested reactive container. Compared by container identity, not
    /// by structural equality.
    Container(State),
    /// An opaque host value (Date-and-similar built-ins) returned
    /// unwrapped and compared by identity.
    Opaque(Rc<dyn Any>),
    /// A function value, returned unwrapped rather than boxed in
    /// another layer of cell.
    Function(Rc<dyn Fn(&[Value]) -> Value>),
}

impl Value {
    pub fn number(n: impl Into<f64>) -> Self {
        Value::Number(n.into())
    }

    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&State> {
        match self {
            Value::Container(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Container(a), Value::Container(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Container(s) => write!(f, "Container({s:?})"),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
            Value::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<State> for Value {
    fn from(s: State) -> Self {
        Value::Container(s)
    }
}

/// A reactive object: a dynamic, insertion-ordered set of named fields,
/// each backed by its own [`Signal`].
pub struct ObjectState {
    fields: std::cell::RefCell<IndexMap<Rc<str>, Signal<Value>>>,
}

impl ObjectState {
    /// Construct directly from `Rc<str>`-keyed fields. [`State::object`]
    /// is the convenience entry point for literal `&'static str` keys;
    /// this one is for callers (e.g. [`ReactiveProps`](crate::component::ReactiveProps))
    /// that already hold owned, possibly-dynamic key strings.
    pub fn from_fields(initial: impl IntoIterator<Item = (Rc<str>, Value)>) -> Rc<Self> {
        Self::new(initial)
    }

    fn new(initial: impl IntoIterator<Item = (Rc<str>, Value)>) -> Rc<Self> {
        let fields = initial
            .into_iter()
            .map(|(k, v)| (k, Signal::new(v)))
            .collect();
        Rc::new(Self {
            fields: std::cell::RefCell::new(fields),
        })
    }

    /// Read a field, subscribing the current observer if one is active.
    /// A field that does not exist yet still allocates a signal holding
    /// `Value::Null`, so a later write to that key notifies a caller who
    /// read it before it existed.
    pub fn get(&self, key: &str) -> Value {
        let signal = {
            let mut fields = self.fields.borrow_mut();
            fields
                .entry(Rc::from(key))
                .or_insert_with(|| Signal::new(Value::Null))
                .clone()
        };
        signal.get()
    }

    pub fn get_untracked(&self, key: &str) -> Value {
        self.fields
            .borrow()
            .get(key)
            .map(|s| s.get_untracked())
            .unwrap_or(Value::Null)
    }

    /// Write a field. Notifies iff the signal already existed and the new
    /// value differs from the old one.
    pub fn set(&self, key: &str, value: Value) {
        let existing = self.fields.borrow().get(key).cloned();
        match existing {
            Some(signal) => signal.set(value),
            None => {
                self.fields
                    .borrow_mut()
                    .insert(Rc::from(key), Signal::new(value));
            }
        }
    }

    /// Shallow-copy `updates` onto this object, one write per key. Callers
    /// typically wrap this in [`sync_batch`](crate::reactive::scheduler::Scheduler::sync_batch)
    /// so observers see a single deduplicated notification even though
    /// several keys changed.
    pub fn assign(&self, updates: impl IntoIterator<Item = (Rc<str>, Value)>) {
        for (key, value) in updates {
            self.set(&key, value);
        }
    }

    /// Delete a field, notifying any subscribers and dropping the signal.
    pub fn delete(&self, key: &str) {
        if let Some(signal) = self.fields.borrow_mut().shift_remove(key) {
            signal.set_always_notify(Value::Null);
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.fields.borrow().keys().cloned().collect()
    }
}

/// A reactive array. Each slot is its own [`Signal`]; `length` is a
/// separate signal that always notifies on a structural change (push,
/// pop, splice, shift, unshift, or a direct `length` write), matching
/// the carve-out for array `length`, which is always treated as changed.
pub struct ArrayState {
    items: std::cell::RefCell<Vec<Signal<Value>>>,
    length: Signal<f64>,
}

impl ArrayState {
    fn new(initial: impl IntoIterator<Item = Value>) -> Rc<Self> {
        let items: Vec<Signal<Value>> = initial.into_iter().map(Signal::new).collect();
        let len = items.len() as f64;
        Rc::new(Self {
            items: std::cell::RefCell::new(items),
            length: Signal::new(len),
        })
    }

    pub fn get(&self, index: usize) -> Value {
        self.items
            .borrow()
            .get(index)
            .map(|s| s.get())
            .unwrap_or(Value::Null)
    }

    pub fn get_untracked(&self, index: usize) -> Value {
        self.items
            .borrow()
            .get(index)
            .map(|s| s.get_untracked())
            .unwrap_or(Value::Null)
    }

    pub fn set(&self, index: usize, value: Value) {
        if let Some(signal) = self.items.borrow().get(index) {
            signal.set(value);
        }
    }

    /// Reading `length` subscribes to the length signal.
    pub fn len(&self) -> usize {
        self.length.get() as usize
    }

    pub fn len_untracked(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len_untracked() == 0
    }

    /// Direct `length = n` write: truncates or pads with `Value::Null`,
    /// always notifying regardless of whether the new length equals the
    /// old one: a length write is always treated as changed.
    pub fn set_length(&self, new_len: usize) {
        {
            let mut items = self.items.borrow_mut();
            if new_len < items.len() {
                items.truncate(new_len);
            } else {
                items.resize_with(new_len, || Signal::new(Value::Null));
            }
        }
        self.length.set_always_notify(new_len as f64);
    }

    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(Signal::new(value));
        self.bump_length();
    }

    pub fn pop(&self) -> Option<Value> {
        let popped = self.items.borrow_mut().pop().map(|s| s.get_untracked());
        if popped.is_some() {
            self.bump_length();
        }
        popped
    }

    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0).get_untracked())
            }
        };
        if removed.is_some() {
            self.bump_length();
        }
        removed
    }

    pub fn unshift(&self, value: Value) {
        self.items.borrow_mut().insert(0, Signal::new(value));
        self.bump_length();
    }

    /// `Array.prototype.splice` equivalent: remove `delete_count` items
    /// starting at `start`, insert `inserted` in their place, and return
    /// the removed values.
    pub fn splice(&self, start: usize, delete_count: usize, inserted: Vec<Value>) -> Vec<Value> {
        let removed = {
            let mut items = self.items.borrow_mut();
            let start = start.min(items.len());
            let end = (start + delete_count).min(items.len());
            let removed: Vec<Value> = items.drain(start..end).map(|s| s.get_untracked()).collect();
            let mut at = start;
            for value in inserted {
                items.insert(at, Signal::new(value));
                at += 1;
            }
            removed
        };
        self.bump_length();
        removed
    }

    /// Snapshot every current value without tracking (used to build a
    /// derived array via `filter`/`map`, which preserve element identity
    /// by cloning each kept `Value` rather than re-wrapping it).
    pub fn to_vec_untracked(&self) -> Vec<Value> {
        self.items.borrow().iter().map(|s| s.get_untracked()).collect()
    }

    fn bump_length(&self) {
        let new_len = self.items.borrow().len() as f64;
        self.length.set_always_notify(new_len);
    }
}

/// A reactive container: either an object or an array.
#[derive(Clone)]
pub enum State {
    Object(Rc<ObjectState>),
    Array(Rc<ArrayState>),
}

impl State {
    pub fn object(fields: impl IntoIterator<Item = (&'static str, Value)>) -> State {
        State::Object(ObjectState::new(
            fields.into_iter().map(|(k, v)| (Rc::from(k), v)),
        ))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> State {
        State::Array(ArrayState::new(items))
    }

    pub fn as_object(&self) -> Option<&Rc<ObjectState>> {
        match self {
            State::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Rc<ArrayState>> {
        match self {
            State::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Identity comparison: two `State` handles are the same container
    /// iff they share the same underlying allocation.
    pub fn ptr_eq(&self, other: &State) -> bool {
        match (self, other) {
            (State::Object(a), State::Object(b)) => Rc::ptr_eq(a, b),
            (State::Array(a), State::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Object(o) => f.debug_struct("Object").field("keys", &o.keys()).finish(),
            State::Array(a) => f
                .debug_struct("Array")
                .field("len", &a.len_untracked())
                .finish(),
        }
    }
}

/// Build a top-level reactive object. The single dynamic entry point
/// splits into object/array constructors here since the container shape
/// is a type-level choice, not a runtime one.
pub fn create_state(fields: impl IntoIterator<Item = (&'static str, Value)>) -> State {
    State::object(fields)
}
