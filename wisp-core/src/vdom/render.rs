//! The mount entry point: `render(vnode, container)` mounts a tree,
//! returning an unmount handle.

use std::rc::Rc;

use crate::component::ComponentContext;
use crate::error::PatchError;
use crate::vdom::dom::DomHost;
use crate::vdom::node::VNode;
use crate::vdom::reconciler::{Mounted, Reconciler};

/// Handle returned by [`render`]. Dropping it does nothing on its own —
/// unmounting is an explicit action, not a destructor, so a forgotten
/// handle simply leaves the tree mounted.
pub struct UnmountHandle<H: DomHost> {
    reconciler: Rc<Reconciler<H>>,
    container: H::Node,
    mounted: Option<Mounted<H>>,
}

impl<H: DomHost + 'static> UnmountHandle<H> {
    /// Tear down the whole mounted tree: every descendant component's
    /// cleanup runs, in depth-first post-order, before this call returns.
    /// Calling this twice is a no-op the second time.
    pub fn unmount(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            self.reconciler.destroy(&self.container, mounted);
        }
    }
}

/// Mount `vnode` into `container`, wrapping it in a root node that pairs
/// the host container with the single vnode rendered into it.
/// `reconciler` carries the registered component table and the concrete
/// [`DomHost`](crate::vdom::dom::DomHost) this tree is mounted against.
///
/// A component render error that no ancestor error-boundary context
/// claimed propagates out of this call as `Err` rather than being
/// silently swallowed.
pub fn render<H: DomHost + 'static>(
    reconciler: &Rc<Reconciler<H>>,
    container: H::Node,
    vnode: VNode<H::Node, H::Event>,
) -> Result<UnmountHandle<H>, PatchError> {
    let root = VNode::Root {
        container: container.clone(),
        child: Box::new(vnode),
    };
    let mounted = reconciler.mount(&container, None, root, None::<&Rc<ComponentContext>>)?;
    Ok(UnmountHandle {
        reconciler: Rc::clone(reconciler),
        container,
        mounted: Some(mounted),
    })
}
