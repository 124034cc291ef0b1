//! Fine-grained reactivity engine.
//!
//! This module is the core of the runtime: a signal/observer graph with
//! synchronous transactional batching (`scheduler::sync_batch`),
//! microtask-deferred asynchronous batching, cascading propagation, and
//! cycle-safe fixed-point convergence.
//!
//! # Layering
//!
//! - [`signal`] — the observable token every other primitive is built on.
//! - [`context`] — the process-wide "current observer" stack.
//! - [`subscriber`] — opaque subscriber identity used for dedup.
//! - [`scheduler`] — the two-queue batch scheduler.
//! - [`observer`] — reactive scopes that subscribe to signals.
//! - [`state`] — the reactive state proxy realized as `State`/`Value`.
//! - [`derived`] — the derived table.
//! - [`effect`] — standalone effects and the shared cleanup-scope stack.
//!
//! Throughout, `Rc`/`RefCell` stands in for `Arc`/`RwLock` since this is a
//! single-threaded engine, observers own their own disposers instead of
//! registering with a global registry, and the scheduler is a stack of
//! frames plus one async frame rather than a single flat registry.

mod context;
mod derived;
mod effect;
mod observer;
mod scheduler;
mod signal;
mod state;
mod subscriber;

pub use context::ReactiveContext;
pub use derived::{create_derived, Derived, SingleDerived};
pub use effect::{on_cleanup, Effect};
pub use observer::{ObserveGuard, Observer};
pub use scheduler::{batch, Scheduler};
pub use signal::Signal;
pub use state::{create_state, ArrayState, ObjectState, State, Value};
pub use subscriber::SubscriberId;

pub(crate) use effect::{pop_cleanup_scope, push_cleanup_scope, run_cleanups};
