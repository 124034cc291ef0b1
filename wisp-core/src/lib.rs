//! Wisp Core
//!
//! The runtime for Wisp, a fine-grained reactive UI library for the
//! browser. It implements the two tightly coupled subsystems at the core
//! of the library:
//!
//! 1. The reactivity engine ([`reactive`]) — signals, observers, the
//!    reactive state proxy, the derived table, and the batch scheduler.
//! 2. The component reconciliation layer ([`component`]) — component
//!    instances driven by the reactivity engine, reactive props, and
//!    lifecycle (mount, prop reception, cleanup) integrated with the
//!    VDOM host.
//!
//! A thin virtual-DOM diff/patch layer ([`vdom`]) is included because the
//! reactivity engine's guarantees (identity preservation under reorder,
//! destroy hooks for cleanup) are only observable through it.
//!
//! Out of scope: the JSX-equivalent source transform, the hook surface
//! built atop this core, CLI/build plugins, documentation site, demo
//! application. Server rendering, hydration, concurrent
//! rendering, time-slicing, transitions, portals, and streaming are
//! non-goals — rendering is synchronous within a batch.
//!
//! # Example
//!
//! ```
//! use wisp_core::reactive::{Observer, Scheduler, Signal};
//!
//! let count = Signal::new(0);
//! let seen = std::rc::Rc::new(std::cell::Cell::new(0));
//! let seen2 = seen.clone();
//! let count2 = count.clone();
//! let observer = Observer::new(move || seen2.set(count2.get_untracked()));
//! {
//!     let _guard = observer.observe();
//!     count.get();
//! }
//!
//! Scheduler::sync_batch(|| {
//!     count.set(1);
//!     count.set(2);
//!     count.set(3);
//! })
//! .unwrap();
//! assert_eq!(seen.get(), 3);
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod reactive;
pub mod vdom;
