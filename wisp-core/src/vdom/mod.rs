//! The VDOM layer: node types, the host DOM seam, and the reconciler
//! that drives one against the other.

mod dom;
mod node;
mod reconciler;
mod render;

pub use dom::{test_host, DomHost, ListenerHandle};
#[cfg(feature = "dom")]
pub use dom::WebSysHost;
pub use node::{ClassValue, ElementBuilder, ElementProps, EventHandler, Key, RefTarget, VNode};
pub use reconciler::{Mounted, Reconciler};
pub use render::{render, UnmountHandle};
